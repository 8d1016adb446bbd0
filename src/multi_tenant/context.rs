//! Request-scoped tenant context.

use super::config::{TenantAuth, TenantSettings};
use crate::error::ConfigurationResult;
use std::sync::Arc;

/// Everything a request needs to know about its tenant.
///
/// Built per request from validated [`TenantSettings`]; never shared across
/// requests.
#[derive(Debug)]
pub struct TenantContext<D> {
    pub tenant_id: String,
    pub auth: TenantAuth,
    pub link_idp: bool,
    pub email_as_username: bool,
    pub managed_role: String,
    pub directory: Arc<D>,
    /// Correlates log lines for one request
    pub request_id: String,
}

impl<D> TenantContext<D> {
    /// Validate `settings` and build a context around `directory`.
    pub fn from_settings(
        settings: &TenantSettings,
        directory: Arc<D>,
        request_id: impl Into<String>,
    ) -> ConfigurationResult<Self> {
        Ok(Self {
            tenant_id: settings.id.clone(),
            auth: settings.resolve_auth()?,
            link_idp: settings.link_idp,
            email_as_username: settings.email_as_username,
            managed_role: settings.managed_role.clone(),
            directory,
            request_id: request_id.into(),
        })
    }
}

impl<D> Clone for TenantContext<D> {
    fn clone(&self) -> Self {
        Self {
            tenant_id: self.tenant_id.clone(),
            auth: self.auth.clone(),
            link_idp: self.link_idp,
            email_as_username: self.email_as_username,
            managed_role: self.managed_role.clone(),
            directory: Arc::clone(&self.directory),
            request_id: self.request_id.clone(),
        }
    }
}
