//! Tenant resolution for multi-tenant SCIM operations.
//!
//! Tenants are addressed by the `{tenantId}` path segment. A resolver maps
//! that id to a validated [`TenantContext`]; unknown tenants are `NotFound` and
//! misconfigured ones are `ConfigurationError`, never a silently defaulted
//! context.

use super::config::TenantSettings;
use super::context::TenantContext;
use crate::directory::UserDirectory;
use crate::error::{ConfigurationError, ConfigurationResult, ScimError, ScimResult};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Resolves tenant ids to request-scoped contexts.
///
/// # Example Implementation
///
/// ```rust,no_run
/// use scim_provisioner::directory::InMemoryDirectory;
/// use scim_provisioner::error::{ScimError, ScimResult};
/// use scim_provisioner::multi_tenant::{TenantContext, TenantResolver, TenantSettings};
/// use std::sync::Arc;
///
/// struct SingleTenant {
///     settings: TenantSettings,
///     directory: Arc<InMemoryDirectory>,
/// }
///
/// impl TenantResolver for SingleTenant {
///     type Directory = InMemoryDirectory;
///
///     async fn resolve(
///         &self,
///         tenant_id: &str,
///         request_id: &str,
///     ) -> ScimResult<TenantContext<InMemoryDirectory>> {
///         if tenant_id != self.settings.id {
///             return Err(ScimError::not_found(format!("Tenant '{}' not found", tenant_id)));
///         }
///         Ok(TenantContext::from_settings(&self.settings, self.directory.clone(), request_id)?)
///     }
///
///     async fn tenant_ids(&self) -> Vec<String> {
///         vec![self.settings.id.clone()]
///     }
/// }
/// ```
pub trait TenantResolver: Send + Sync + 'static {
    type Directory: UserDirectory;

    /// Build the context for `tenant_id`, validating its settings.
    fn resolve(
        &self,
        tenant_id: &str,
        request_id: &str,
    ) -> impl Future<Output = ScimResult<TenantContext<Self::Directory>>> + Send;

    /// Ids of every configured tenant.
    fn tenant_ids(&self) -> impl Future<Output = Vec<String>> + Send;
}

/// In-memory tenant table over a single shared directory.
///
/// Every tenant is validated when added, so a bad configuration fails at
/// startup rather than on the first request.
///
/// ```rust
/// use scim_provisioner::directory::InMemoryDirectory;
/// use scim_provisioner::multi_tenant::{StaticTenantResolver, TenantResolver, TenantSettings};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let resolver = StaticTenantResolver::new(
///     vec![TenantSettings::external("acme", "https://idp", "https://idp/keys", "scim")],
///     Arc::new(InMemoryDirectory::new()),
/// )?;
/// let context = resolver.resolve("acme", "req-1").await?;
/// assert_eq!(context.tenant_id, "acme");
/// assert!(resolver.resolve("globex", "req-2").await.is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct StaticTenantResolver<D> {
    tenants: RwLock<HashMap<String, TenantSettings>>,
    directory: Arc<D>,
}

impl<D: UserDirectory> StaticTenantResolver<D> {
    pub fn new(tenants: Vec<TenantSettings>, directory: Arc<D>) -> ConfigurationResult<Self> {
        let mut table = HashMap::new();
        for settings in tenants {
            settings.resolve_auth()?;
            if table.contains_key(&settings.id) {
                return Err(ConfigurationError::DuplicateTenant {
                    tenant_id: settings.id,
                });
            }
            table.insert(settings.id.clone(), settings);
        }
        Ok(Self {
            tenants: RwLock::new(table),
            directory,
        })
    }

    /// Add or replace a tenant's settings.
    pub async fn upsert_tenant(&self, settings: TenantSettings) -> ConfigurationResult<()> {
        settings.resolve_auth()?;
        log::info!("Updating configuration for tenant '{}'", settings.id);
        self.tenants
            .write()
            .await
            .insert(settings.id.clone(), settings);
        Ok(())
    }

    pub fn directory(&self) -> &Arc<D> {
        &self.directory
    }
}

impl<D: UserDirectory> TenantResolver for StaticTenantResolver<D> {
    type Directory = D;

    async fn resolve(&self, tenant_id: &str, request_id: &str) -> ScimResult<TenantContext<D>> {
        let tenants = self.tenants.read().await;
        let settings = tenants
            .get(tenant_id)
            .ok_or_else(|| ScimError::not_found(format!("Tenant '{}' not found", tenant_id)))?;
        TenantContext::from_settings(settings, Arc::clone(&self.directory), request_id).map_err(
            |e| {
                log::error!("Tenant '{}' is misconfigured: {}", tenant_id, e);
                ScimError::from(e)
            },
        )
    }

    async fn tenant_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tenants.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}
