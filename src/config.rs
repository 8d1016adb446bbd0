//! Server configuration file.
//!
//! A JSON document; every field has a default so an empty object is a valid
//! (tenantless) configuration.
//!
//! ```json
//! {
//!   "listen": "0.0.0.0:8080",
//!   "baseUrl": "https://scim.example.com",
//!   "tenants": [{
//!     "id": "acme",
//!     "auth": {
//!       "mode": "external-issuer",
//!       "issuer": "https://login.example.com",
//!       "jwksUri": "https://login.example.com/discovery/v2.0/keys",
//!       "audience": "scim"
//!     }
//!   }],
//!   "identityProviders": [{"alias": "okta", "tenantId": "acme", "domain": "acme.com"}],
//!   "issuer": {"issuer": "https://login.example.com", "audience": "scim"}
//! }
//! ```

use crate::auth::DEFAULT_VALIDATOR_CAPACITY;
use crate::directory::IdentityProviderConfig;
use crate::error::{ConfigurationError, ConfigurationResult};
use crate::issuer::IssuerSettings;
use crate::multi_tenant::TenantSettings;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Externally visible root used for `meta.location` and `Location`
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_validator_capacity")]
    pub validator_cache_capacity: u64,
    #[serde(default)]
    pub tenants: Vec<TenantSettings>,
    #[serde(default)]
    pub identity_providers: Vec<IdentityProviderConfig>,
    #[serde(default)]
    pub issuer: Option<IssuerSettings>,
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_validator_capacity() -> u64 {
    DEFAULT_VALIDATOR_CAPACITY
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            base_url: default_base_url(),
            validator_cache_capacity: default_validator_capacity(),
            tenants: Vec::new(),
            identity_providers: Vec::new(),
            issuer: None,
        }
    }
}

impl ServerConfig {
    /// Read and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> ConfigurationResult<Self> {
        let path = path.as_ref();
        let load_error = |message: String| ConfigurationError::Load {
            path: path.display().to_string(),
            message,
        };

        let content = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        let config: ServerConfig =
            serde_json::from_str(&content).map_err(|e| load_error(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every tenant eagerly so a bad entry stops startup.
    pub fn validate(&self) -> ConfigurationResult<()> {
        let mut seen = HashSet::new();
        for tenant in &self.tenants {
            tenant.resolve_auth()?;
            if !seen.insert(tenant.id.as_str()) {
                return Err(ConfigurationError::DuplicateTenant {
                    tenant_id: tenant.id.clone(),
                });
            }
        }
        for provider in &self.identity_providers {
            if !seen.contains(provider.tenant_id.as_str()) {
                log::warn!(
                    "Identity provider '{}' belongs to unknown tenant '{}'",
                    provider.alias,
                    provider.tenant_id
                );
            }
        }
        if self.validator_cache_capacity == 0 {
            return Err(ConfigurationError::InvalidSetting {
                field: "validatorCacheCapacity",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
