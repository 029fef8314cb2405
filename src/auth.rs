use crate::config::{AuthConfig, CatalogEntry};
use crate::error::AuthError;

/// Token plus service catalog used to authenticate and route API requests.
#[derive(Clone)]
pub struct AuthProvider {
    token: String,
    catalog: Vec<CatalogEntry>,
}

impl std::fmt::Debug for AuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthProvider")
            .field("token", &"<redacted>")
            .field("catalog", &self.catalog)
            .finish()
    }
}

impl AuthProvider {
    pub fn new(token: impl Into<String>, catalog: Vec<CatalogEntry>) -> Result<Self, AuthError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(AuthError::MissingToken);
        }
        Ok(Self { token, catalog })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let token = config.token.clone().ok_or(AuthError::MissingToken)?;
        Self::new(token, config.catalog.clone())
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn catalog(&self) -> &[CatalogEntry] {
        &self.catalog
    }

    /// Endpoint URL of the first catalog entry for `service_type` in `region`.
    pub fn base_url(&self, service_type: &str, region: Option<&str>) -> Result<&str, AuthError> {
        self.catalog
            .iter()
            .find(|entry| {
                entry.service_type == service_type
                    && match (region, entry.region.as_deref()) {
                        (Some(wanted), Some(have)) => wanted == have,
                        _ => true,
                    }
            })
            .map(|entry| entry.url.as_str())
            .ok_or_else(|| AuthError::EndpointNotFound {
                service: service_type.to_string(),
                region: region.map(str::to_string),
            })
    }
}
