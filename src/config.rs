use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Error type for configuration loading
#[derive(Debug)]
pub enum ConfigError {
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    InvalidValue {
        path: PathBuf,
        field: String,
        value: String,
        valid_values: Vec<String>,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(
                    f,
                    "Failed to read config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Invalid TOML syntax in {}: {}", path.display(), source)
            }
            ConfigError::InvalidValue {
                path,
                field,
                value,
                valid_values,
            } => {
                write!(
                    f,
                    "Invalid value '{}' for '{}' in {}\n  Valid values: {}",
                    value,
                    field,
                    path.display(),
                    valid_values.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::InvalidValue { .. } => None,
        }
    }
}

/// Configuration loaded from `~/.config/nova-quotas/config.toml`.
///
/// All fields have defaults; the token and compute endpoint can also come from
/// the environment or CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub compute: ComputeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Credentials and service catalog.
///
/// Example in `config.toml`:
/// ```toml
/// [auth]
/// token = "gAAAAAB..."
///
/// [[auth.catalog]]
/// service_type = "compute"
/// url = "https://nova.example.com/v2/3f1c0a"
/// region = "RegionOne"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
}

/// One endpoint of the service catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub service_type: String,
    pub url: String,
    /// Entries without a region match any requested region
    #[serde(default)]
    pub region: Option<String>,
}

/// Compute API client settings.
///
/// Example in `config.toml`:
/// ```toml
/// [compute]
/// catalog_type = "compute"
/// region = "RegionOne"
/// timeout_secs = 30
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeConfig {
    /// Service type used to pick the endpoint from the catalog (default: "compute")
    #[serde(default = "default_catalog_type")]
    pub catalog_type: String,
    #[serde(default)]
    pub region: Option<String>,
    /// Request timeout in seconds (default: 60)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_catalog_type() -> String {
    "compute".to_string()
}

fn default_timeout() -> u64 {
    60
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            catalog_type: default_catalog_type(),
            region: None,
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub debug: bool,
    /// Log full request/response bodies for debugging
    #[serde(default)]
    pub log_requests: bool,
}

impl Config {
    pub fn dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nova-quotas")
    }

    pub fn path() -> PathBuf {
        Self::dir().join("config.toml")
    }

    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path();
        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
                path: path.clone(),
                source: e,
            })?;
            Self::parse(&content, &path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate config file contents. `path` is only used in error messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        if self.compute.catalog_type.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                path: path.to_path_buf(),
                field: "compute.catalog_type".to_string(),
                value: self.compute.catalog_type.clone(),
                valid_values: vec!["a non-empty service type, e.g. compute".to_string()],
            });
        }

        if self.compute.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                path: path.to_path_buf(),
                field: "compute.timeout_secs".to_string(),
                value: "0".to_string(),
                valid_values: vec!["1 or greater".to_string()],
            });
        }

        for entry in &self.auth.catalog {
            if !(entry.url.starts_with("http://") || entry.url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    path: path.to_path_buf(),
                    field: "auth.catalog.url".to_string(),
                    value: entry.url.clone(),
                    valid_values: vec!["http://...".to_string(), "https://...".to_string()],
                });
            }
        }

        Ok(())
    }

    /// Apply `OS_AUTH_TOKEN` and then CLI flags on top of the file config.
    pub fn with_overrides(
        mut self,
        endpoint: Option<String>,
        token: Option<String>,
        debug: bool,
    ) -> Self {
        if let Ok(env_token) = std::env::var("OS_AUTH_TOKEN")
            && !env_token.is_empty()
        {
            self.auth.token = Some(env_token);
        }
        if let Some(t) = token {
            self.auth.token = Some(t);
        }
        if let Some(url) = endpoint {
            self.auth.catalog.insert(
                0,
                CatalogEntry {
                    service_type: self.compute.catalog_type.clone(),
                    url,
                    region: self.compute.region.clone(),
                },
            );
        }
        if debug {
            self.logging.debug = true;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.compute.catalog_type, "compute");
        assert_eq!(config.compute.timeout_secs, 60);
        assert!(config.compute.region.is_none());
        assert!(config.auth.catalog.is_empty());
        assert!(!config.logging.debug);
        assert!(!config.logging.log_requests);
    }

    #[test]
    fn test_parse_full_config() {
        let content = r#"
[auth]
token = "secret"

[[auth.catalog]]
service_type = "compute"
url = "https://nova.example.com/v2/abc"
region = "RegionOne"

[[auth.catalog]]
service_type = "volume"
url = "https://cinder.example.com/v2/abc"

[compute]
catalog_type = "compute"
region = "RegionOne"
timeout_secs = 15

[logging]
log_requests = true
"#;
        let config = Config::parse(content, Path::new("/test/config.toml")).unwrap();
        assert_eq!(config.auth.token.as_deref(), Some("secret"));
        assert_eq!(config.auth.catalog.len(), 2);
        assert_eq!(config.auth.catalog[0].region.as_deref(), Some("RegionOne"));
        assert!(config.auth.catalog[1].region.is_none());
        assert_eq!(config.compute.timeout_secs, 15);
        assert!(config.logging.log_requests);
    }

    #[test]
    fn test_parse_partial_config_keeps_defaults() {
        let config = Config::parse("[logging]\ndebug = true\n", Path::new("c.toml")).unwrap();
        assert!(config.logging.debug);
        assert_eq!(config.compute.catalog_type, "compute");
        assert_eq!(config.compute.timeout_secs, 60);
    }

    #[test]
    fn test_parse_rejects_zero_timeout() {
        let err = Config::parse("[compute]\ntimeout_secs = 0\n", Path::new("c.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "compute.timeout_secs"));
    }

    #[test]
    fn test_parse_rejects_empty_catalog_type() {
        let err =
            Config::parse("[compute]\ncatalog_type = \"\"\n", Path::new("c.toml")).unwrap_err();
        assert!(err.to_string().contains("compute.catalog_type"));
    }

    #[test]
    fn test_parse_rejects_bad_catalog_url() {
        let content = r#"
[[auth.catalog]]
service_type = "compute"
url = "ftp://nova.example.com"
"#;
        let err = Config::parse(content, Path::new("c.toml")).unwrap_err();
        assert!(err.to_string().contains("ftp://nova.example.com"));
    }

    #[test]
    fn test_config_with_overrides() {
        let mut config = Config::default();
        config.compute.region = Some("RegionTwo".to_string());
        config.auth.catalog.push(CatalogEntry {
            service_type: "compute".to_string(),
            url: "https://old.example.com".to_string(),
            region: None,
        });

        let config = config.with_overrides(
            Some("http://localhost:8774/v2/t".to_string()),
            Some("flag-token".to_string()),
            true,
        );

        assert_eq!(config.auth.token.as_deref(), Some("flag-token"));
        assert_eq!(config.auth.catalog.len(), 2);
        assert_eq!(config.auth.catalog[0].url, "http://localhost:8774/v2/t");
        assert_eq!(config.auth.catalog[0].service_type, "compute");
        assert_eq!(config.auth.catalog[0].region.as_deref(), Some("RegionTwo"));
        assert!(config.logging.debug);
    }

    #[test]
    fn test_config_path() {
        let path = Config::path();
        assert!(path.to_string_lossy().contains("nova-quotas"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn test_config_error_display() {
        let parse_error = toml::from_str::<Config>("invalid toml [").unwrap_err();
        let error = ConfigError::ParseError {
            path: PathBuf::from("/test/config.toml"),
            source: parse_error,
        };
        let msg = error.to_string();
        assert!(msg.contains("Invalid TOML syntax"));
        assert!(msg.contains("/test/config.toml"));
    }
}
