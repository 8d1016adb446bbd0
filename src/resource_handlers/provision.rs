//! Batch create-or-update for provisioning clients.
//!
//! Each element of the batch goes through the same [`UserResourceHandler`]
//! paths as the SCIM endpoints. Failures are recorded per user and never stop
//! the batch.

use super::user::UserResourceHandler;
use crate::directory::UserDirectory;
use crate::error::{ScimError, ScimResult};
use crate::multi_tenant::TenantContext;
use crate::schema::USER_SCHEMA_URN;
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisionStatus {
    Created,
    Updated,
    Skipped,
    Failed,
}

/// Outcome for one element of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub status: ProvisionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    pub total: usize,
    /// created + updated
    pub ok: usize,
    pub skipped: usize,
    pub failed: usize,
    pub details: Vec<ProvisionDetail>,
}

impl ProvisionReport {
    fn record(&mut self, detail: ProvisionDetail) {
        match detail.status {
            ProvisionStatus::Created | ProvisionStatus::Updated => self.ok += 1,
            ProvisionStatus::Skipped => self.skipped += 1,
            ProvisionStatus::Failed => self.failed += 1,
        }
        self.details.push(detail);
    }
}

impl UserResourceHandler {
    /// Create or replace every user in `batch`, which must be a JSON array.
    pub async fn provision<D: UserDirectory>(
        &self,
        context: &TenantContext<D>,
        batch: Value,
    ) -> ScimResult<ProvisionReport> {
        let Value::Array(entries) = batch else {
            return Err(ScimError::invalid_request(
                "Provisioning body must be a JSON array of users",
            ));
        };

        let mut report = ProvisionReport {
            total: entries.len(),
            ..Default::default()
        };
        for entry in entries {
            let detail = self.provision_one(context, entry).await;
            report.record(detail);
        }

        log::info!(
            "Provisioned {} of {} users ({} skipped, {} failed) for tenant '{}' (request: '{}')",
            report.ok,
            report.total,
            report.skipped,
            report.failed,
            context.tenant_id,
            context.request_id
        );
        Ok(report)
    }

    async fn provision_one<D: UserDirectory>(
        &self,
        context: &TenantContext<D>,
        mut entry: Value,
    ) -> ProvisionDetail {
        let user_name = entry
            .get("userName")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        let (Some(user_name), Some(obj)) = (user_name, entry.as_object_mut()) else {
            return ProvisionDetail {
                user_name: None,
                status: ProvisionStatus::Skipped,
                id: None,
                detail: Some("Entry is not an object with a userName".to_string()),
            };
        };
        obj.entry("schemas").or_insert_with(|| json!([USER_SCHEMA_URN]));

        let existing = match self.existing_managed_user(context, &user_name).await {
            Ok(existing) => existing,
            Err(e) => return failed(user_name, e),
        };
        let (status, result) = match existing {
            Some(id) => (
                ProvisionStatus::Updated,
                self.replace(context, &id, &entry).await,
            ),
            None => (ProvisionStatus::Created, self.create(context, &entry).await),
        };

        match result {
            Ok(document) => ProvisionDetail {
                user_name: Some(user_name),
                status,
                id: document.get("id").and_then(Value::as_str).map(str::to_string),
                detail: None,
            },
            Err(e) => failed(user_name, e),
        }
    }

    /// Id of a managed member of the tenant named `user_name`.
    async fn existing_managed_user<D: UserDirectory>(
        &self,
        context: &TenantContext<D>,
        user_name: &str,
    ) -> ScimResult<Option<String>> {
        let found = context
            .directory
            .find_by_username(user_name)
            .await
            .map_err(|e| {
                log::error!(
                    "Directory lookup of '{}' failed for tenant '{}' (request: '{}'): {}",
                    user_name,
                    context.tenant_id,
                    context.request_id,
                    e
                );
                ScimError::internal("Directory lookup failed")
            })?;
        let Some(user) = found else {
            return Ok(None);
        };
        Ok(self
            .lookup_mutable(context, &user.id)
            .await
            .ok()
            .map(|user| user.id))
    }
}

fn failed(user_name: String, error: ScimError) -> ProvisionDetail {
    if error.status_code() >= 500 {
        log::error!("Provisioning '{}' failed: {}", user_name, error);
    }
    ProvisionDetail {
        user_name: Some(user_name),
        status: ProvisionStatus::Failed,
        id: None,
        detail: Some(error.detail()),
    }
}
