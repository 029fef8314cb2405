use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("api error: {0}")]
    Api(#[from] ApiError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("xml error: {0}")]
    Xml(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl Error {
    /// Returns a user-friendly suggestion for how to resolve this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::Auth(AuthError::MissingToken) | Error::Auth(AuthError::Unauthorized(_)) => {
                Some("Set auth.token in config.toml, export OS_AUTH_TOKEN or pass --token")
            }
            Error::Auth(AuthError::EndpointNotFound { .. }) => {
                Some("Add an [[auth.catalog]] entry for the service or pass --endpoint")
            }
            Error::Api(ApiError::Forbidden { .. }) => {
                Some("Quota management usually requires an admin role")
            }
            Error::Api(ApiError::NotFound { .. }) => Some("Check the tenant or quota class id"),
            Error::Api(ApiError::OverLimit { .. }) => Some("Too many requests, slow down"),
            Error::Config(_) => Some("Fix the config file or remove it to use defaults"),
            Error::Timeout(_) => Some("Check your network connection or raise compute.timeout_secs"),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no auth token configured")]
    MissingToken,

    #[error("no '{service}' endpoint in the service catalog{}", region_suffix(.region))]
    EndpointNotFound {
        service: String,
        region: Option<String>,
    },

    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {message}")]
    BadRequest { message: String },

    #[error("forbidden: {message}")]
    Forbidden { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("over limit: {message}")]
    OverLimit { message: String },

    #[error("invalid content type: {message}")]
    InvalidContentType { message: String },

    #[error("unprocessable entity: {message}")]
    UnprocessableEntity { message: String },

    #[error("server fault ({status}): {message}")]
    ServerFault { status: u16, message: String },

    #[error("not implemented: {message}")]
    NotImplemented { message: String },

    #[error("unexpected response ({status}): {message}")]
    UnexpectedStatus { status: u16, message: String },
}

impl ApiError {
    /// Maps a non-success status and its extracted fault message to the matching variant.
    pub fn from_status(status: u16, message: String) -> Error {
        let api = match status {
            401 => return Error::Auth(AuthError::Unauthorized(message)),
            400 => ApiError::BadRequest { message },
            403 => ApiError::Forbidden { message },
            404 => ApiError::NotFound { message },
            409 => ApiError::Conflict { message },
            413 => ApiError::OverLimit { message },
            415 => ApiError::InvalidContentType { message },
            422 => ApiError::UnprocessableEntity { message },
            501 => ApiError::NotImplemented { message },
            500..=599 => ApiError::ServerFault { status, message },
            _ => ApiError::UnexpectedStatus { status, message },
        };
        Error::Api(api)
    }
}

fn region_suffix(region: &Option<String>) -> String {
    region
        .as_deref()
        .map(|r| format!(" for region {r}"))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, Error>;
