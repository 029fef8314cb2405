//! Client for the compute service's tenant quota and quota class XML API.
//!
//! ```no_run
//! # async fn demo() -> nova_quotas::Result<()> {
//! use nova_quotas::{AuthProvider, Config, QuotaSetUpdate, QuotasClient};
//!
//! let config = Config::load()?;
//! let auth = AuthProvider::from_config(&config.auth)?;
//! let quotas = QuotasClient::new(auth, &config.compute, &config.logging)?;
//!
//! let current = quotas.get_quota_set("3f1c0a", None).await?;
//! println!("cores: {:?}", current.body.limit("cores"));
//!
//! let update = QuotaSetUpdate {
//!     cores: Some(40),
//!     ..QuotaSetUpdate::default()
//! };
//! quotas.update_quota_set("3f1c0a", None, &update).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod compute;
pub mod config;
pub mod error;

pub use auth::AuthProvider;
pub use compute::{
    ApiResponse, QuotaClassesClient, QuotaSet, QuotaSetUpdate, QuotasClient, RestClient, Value,
    format_quota,
};
pub use config::Config;
pub use error::{ApiError, AuthError, Error, Result};
