use tracing::{debug, info};

use super::client::RestClient;
use super::response::{ApiResponse, QuotaSet, parse_quota_body};
use super::xml::{Document, Element, XMLNS_11};
use crate::auth::AuthProvider;
use crate::config::{ComputeConfig, LoggingConfig};
use crate::error::{Error, Result};

/// Resource limits that can be changed on a tenant (or tenant user) quota set.
///
/// Only fields set to `Some` are sent. `-1` means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotaSetUpdate {
    /// Apply the new limits even if current usage already exceeds them
    pub force: Option<bool>,
    pub injected_file_content_bytes: Option<i64>,
    pub metadata_items: Option<i64>,
    pub ram: Option<i64>,
    pub floating_ips: Option<i64>,
    pub fixed_ips: Option<i64>,
    pub key_pairs: Option<i64>,
    pub instances: Option<i64>,
    pub security_group_rules: Option<i64>,
    pub injected_files: Option<i64>,
    pub cores: Option<i64>,
    pub injected_file_path_bytes: Option<i64>,
    pub security_groups: Option<i64>,
}

impl QuotaSetUpdate {
    /// Names of the integer limits, in wire order.
    pub const LIMITS: [&'static str; 12] = [
        "injected_file_content_bytes",
        "metadata_items",
        "ram",
        "floating_ips",
        "fixed_ips",
        "key_pairs",
        "instances",
        "security_group_rules",
        "injected_files",
        "cores",
        "injected_file_path_bytes",
        "security_groups",
    ];

    pub fn new() -> Self {
        Self::default()
    }

    fn limit_mut(&mut self, name: &str) -> Option<&mut Option<i64>> {
        let slot = match name {
            "injected_file_content_bytes" => &mut self.injected_file_content_bytes,
            "metadata_items" => &mut self.metadata_items,
            "ram" => &mut self.ram,
            "floating_ips" => &mut self.floating_ips,
            "fixed_ips" => &mut self.fixed_ips,
            "key_pairs" => &mut self.key_pairs,
            "instances" => &mut self.instances,
            "security_group_rules" => &mut self.security_group_rules,
            "injected_files" => &mut self.injected_files,
            "cores" => &mut self.cores,
            "injected_file_path_bytes" => &mut self.injected_file_path_bytes,
            "security_groups" => &mut self.security_groups,
            _ => return None,
        };
        Some(slot)
    }

    fn limit(&self, name: &str) -> Option<i64> {
        match name {
            "injected_file_content_bytes" => self.injected_file_content_bytes,
            "metadata_items" => self.metadata_items,
            "ram" => self.ram,
            "floating_ips" => self.floating_ips,
            "fixed_ips" => self.fixed_ips,
            "key_pairs" => self.key_pairs,
            "instances" => self.instances,
            "security_group_rules" => self.security_group_rules,
            "injected_files" => self.injected_files,
            "cores" => self.cores,
            "injected_file_path_bytes" => self.injected_file_path_bytes,
            "security_groups" => self.security_groups,
            _ => None,
        }
    }

    /// Set a field from textual input such as a `key=value` CLI argument.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        if key == "force" {
            self.force = Some(match value.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => true,
                "false" | "no" | "0" => false,
                _ => {
                    return Err(Error::InvalidInput(format!(
                        "force must be true or false, got '{value}'"
                    )));
                }
            });
            return Ok(());
        }

        let slot = self.limit_mut(key).ok_or_else(|| {
            Error::InvalidInput(format!(
                "unknown quota '{key}', expected force or one of: {}",
                Self::LIMITS.join(", ")
            ))
        })?;
        let limit = value
            .parse::<i64>()
            .map_err(|_| Error::InvalidInput(format!("{key} must be an integer, got '{value}'")))?;
        *slot = Some(limit);
        Ok(())
    }

    /// The fields that are set, as `(name, value)` pairs in wire order.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if let Some(force) = self.force {
            fields.push(("force", force.to_string()));
        }
        for name in Self::LIMITS {
            if let Some(limit) = self.limit(name) {
                fields.push((name, limit.to_string()));
            }
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// `<quota_set>` request element carrying one attribute per set field.
    pub fn to_element(&self) -> Element {
        let mut element = Element::with_namespace("quota_set", XMLNS_11);
        for (name, value) in self.fields() {
            element.add_attr(name, value);
        }
        element
    }
}

/// Client for tenant quota sets (`os-quota-sets`).
#[derive(Debug, Clone)]
pub struct QuotasClient {
    rest: RestClient,
}

impl QuotasClient {
    pub fn new(auth: AuthProvider, compute: &ComputeConfig, logging: &LoggingConfig) -> Result<Self> {
        Ok(Self::from_rest(RestClient::new(auth, compute, logging)?))
    }

    pub fn from_rest(rest: RestClient) -> Self {
        Self { rest }
    }

    pub fn service(&self) -> &str {
        self.rest.service()
    }

    /// Quota set for a tenant, or for one user of the tenant when `user_id` is given.
    pub async fn get_quota_set(
        &self,
        tenant_id: &str,
        user_id: Option<&str>,
    ) -> Result<ApiResponse<QuotaSet>> {
        debug!(tenant_id = %tenant_id, user_id = ?user_id, "Fetching quota set");
        let raw = self.rest.get(&quota_set_path(tenant_id, user_id)).await?;
        Ok(ApiResponse {
            body: parse_quota_body(&raw.body)?,
            status: raw.status,
            request_id: raw.request_id,
        })
    }

    /// Default quota set applied to a tenant.
    pub async fn get_default_quota_set(&self, tenant_id: &str) -> Result<ApiResponse<QuotaSet>> {
        debug!(tenant_id = %tenant_id, "Fetching default quota set");
        let raw = self
            .rest
            .get(&format!("os-quota-sets/{tenant_id}/defaults"))
            .await?;
        Ok(ApiResponse {
            body: parse_quota_body(&raw.body)?,
            status: raw.status,
            request_id: raw.request_id,
        })
    }

    /// Update limits of a tenant (or tenant user) and return the resulting quota set.
    pub async fn update_quota_set(
        &self,
        tenant_id: &str,
        user_id: Option<&str>,
        update: &QuotaSetUpdate,
    ) -> Result<ApiResponse<QuotaSet>> {
        let body = Document::new(update.to_element()).to_xml()?;
        info!(
            tenant_id = %tenant_id,
            user_id = ?user_id,
            fields = update.fields().len(),
            "Updating quota set"
        );
        let raw = self
            .rest
            .put(&quota_set_path(tenant_id, user_id), body)
            .await?;
        Ok(ApiResponse {
            body: parse_quota_body(&raw.body)?,
            status: raw.status,
            request_id: raw.request_id,
        })
    }

    /// Delete a tenant's quota set, reverting it to the defaults.
    pub async fn delete_quota_set(&self, tenant_id: &str) -> Result<ApiResponse<String>> {
        info!(tenant_id = %tenant_id, "Deleting quota set");
        let raw = self.rest.delete(&format!("os-quota-sets/{tenant_id}")).await?;
        Ok(ApiResponse {
            body: String::from_utf8_lossy(&raw.body).into_owned(),
            status: raw.status,
            request_id: raw.request_id,
        })
    }
}

fn quota_set_path(tenant_id: &str, user_id: Option<&str>) -> String {
    match user_id {
        Some(user) if !user.is_empty() => format!("os-quota-sets/{tenant_id}?user_id={user}"),
        _ => format!("os-quota-sets/{tenant_id}"),
    }
}
