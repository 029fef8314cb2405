use tracing::{debug, info};

use super::client::RestClient;
use super::response::{ApiResponse, QuotaSet, parse_quota_body};
use super::xml::{Document, Element, XMLNS_11};
use crate::auth::AuthProvider;
use crate::config::{ComputeConfig, LoggingConfig};
use crate::error::{Error, Result};

/// Client for quota class sets (`os-quota-class-sets`), the defaults shared by a class of tenants.
#[derive(Debug, Clone)]
pub struct QuotaClassesClient {
    rest: RestClient,
}

impl QuotaClassesClient {
    pub fn new(auth: AuthProvider, compute: &ComputeConfig, logging: &LoggingConfig) -> Result<Self> {
        Ok(Self::from_rest(RestClient::new(auth, compute, logging)?))
    }

    pub fn from_rest(rest: RestClient) -> Self {
        Self { rest }
    }

    pub fn service(&self) -> &str {
        self.rest.service()
    }

    pub async fn get_quota_class_set(&self, quota_class_id: &str) -> Result<ApiResponse<QuotaSet>> {
        debug!(quota_class_id = %quota_class_id, "Fetching quota class set");
        let raw = self
            .rest
            .get(&format!("os-quota-class-sets/{quota_class_id}"))
            .await?;
        Ok(ApiResponse {
            body: parse_quota_body(&raw.body)?,
            status: raw.status,
            request_id: raw.request_id,
        })
    }

    /// Update the limits of a quota class. Every `(name, value)` pair becomes an attribute.
    pub async fn update_quota_class_set<I, K, V>(
        &self,
        quota_class_id: &str,
        limits: I,
    ) -> Result<ApiResponse<QuotaSet>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        let element = quota_class_element(limits)?;
        let fields = element.attrs.len() - 1;
        let body = Document::new(element).to_xml()?;

        info!(quota_class_id = %quota_class_id, fields = fields, "Updating quota class set");
        let raw = self
            .rest
            .put(&format!("os-quota-class-sets/{quota_class_id}"), body)
            .await?;
        Ok(ApiResponse {
            body: parse_quota_body(&raw.body)?,
            status: raw.status,
            request_id: raw.request_id,
        })
    }
}

fn quota_class_element<I, K, V>(limits: I) -> Result<Element>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: ToString,
{
    let mut element = Element::with_namespace("quota_class_set", XMLNS_11);
    for (name, value) in limits {
        let name = name.into();
        validate_limit_name(&name)?;
        element.add_attr(name, value);
    }
    Ok(element)
}

fn validate_limit_name(name: &str) -> Result<()> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    let valid_start = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');

    if !valid_chars || !valid_start || name.starts_with("xmlns") {
        return Err(Error::InvalidInput(format!(
            "'{name}' is not a valid quota name"
        )));
    }
    Ok(())
}
