//! Bounded, per-tenant cache of [`JwtValidator`]s.

use super::validator::JwtValidator;
use crate::multi_tenant::ExternalAuthConfig;
use moka::future::Cache;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const DEFAULT_VALIDATOR_CAPACITY: u64 = 256;

/// The configuration a validator was built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatorKey {
    pub tenant_id: String,
    pub jwks_uri: String,
    pub issuer: String,
    pub audience: String,
}

impl ValidatorKey {
    pub fn new(tenant_id: &str, config: &ExternalAuthConfig) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            jwks_uri: config.jwks_uri.clone(),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
        }
    }
}

/// A cached validator with the key it was built for. Replaced, never mutated.
#[derive(Debug)]
pub struct ValidatorEntry {
    pub key: ValidatorKey,
    pub validator: Arc<JwtValidator>,
}

/// Process-local validator cache, keyed by tenant id.
///
/// An entry is reused only while its [`ValidatorKey`] still equals the
/// tenant's current configuration; otherwise a new validator is built and
/// replaces it. Capacity is bounded and eviction is size based.
pub struct ValidatorRegistry {
    cache: Cache<String, Arc<ValidatorEntry>>,
    client: reqwest::Client,
    builds: AtomicUsize,
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("entries", &self.cache.entry_count())
            .field("builds", &self.build_count())
            .finish()
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_VALIDATOR_CAPACITY)
    }
}

impl ValidatorRegistry {
    pub fn new(capacity: u64) -> Self {
        Self::with_client(capacity, reqwest::Client::new())
    }

    pub fn with_client(capacity: u64, client: reqwest::Client) -> Self {
        Self {
            cache: Cache::builder().max_capacity(capacity).build(),
            client,
            builds: AtomicUsize::new(0),
        }
    }

    /// Validator for `tenant_id` under `config`, building one if the cached
    /// entry is missing or stale.
    ///
    /// Concurrent first lookups for a tenant share one build.
    pub async fn validator_for(
        &self,
        tenant_id: &str,
        config: &ExternalAuthConfig,
    ) -> Arc<JwtValidator> {
        let key = ValidatorKey::new(tenant_id, config);

        let entry = self
            .cache
            .get_with(tenant_id.to_string(), async { self.build(&key, config) })
            .await;
        if entry.key == key {
            return Arc::clone(&entry.validator);
        }

        log::info!(
            "Authentication settings for tenant '{}' changed, rebuilding validator",
            tenant_id
        );
        let fresh = self.build(&key, config);
        self.cache
            .insert(tenant_id.to_string(), Arc::clone(&fresh))
            .await;
        Arc::clone(&fresh.validator)
    }

    /// Number of validators built so far.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Drop a tenant's validator.
    pub async fn invalidate(&self, tenant_id: &str) {
        self.cache.invalidate(tenant_id).await;
    }

    fn build(&self, key: &ValidatorKey, config: &ExternalAuthConfig) -> Arc<ValidatorEntry> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        log::debug!(
            "Building validator for tenant '{}' (jwks: {})",
            key.tenant_id,
            key.jwks_uri
        );
        Arc::new(ValidatorEntry {
            key: key.clone(),
            validator: Arc::new(JwtValidator::new(
                &key.tenant_id,
                config,
                self.client.clone(),
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(jwks_uri: &str) -> ExternalAuthConfig {
        ExternalAuthConfig {
            issuer: "https://idp".to_string(),
            jwks_uri: jwks_uri.to_string(),
            audience: "scim".to_string(),
        }
    }

    #[tokio::test]
    async fn test_unchanged_config_reuses_validator() {
        let registry = ValidatorRegistry::new(8);
        let first = registry.validator_for("acme", &config("https://idp/keys")).await;
        let second = registry.validator_for("acme", &config("https://idp/keys")).await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.build_count(), 1);
    }

    #[tokio::test]
    async fn test_changed_jwks_uri_rebuilds() {
        let registry = ValidatorRegistry::new(8);
        let first = registry.validator_for("acme", &config("https://idp/keys")).await;
        let second = registry.validator_for("acme", &config("https://idp/keys2")).await;

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.jwks_uri(), "https://idp/keys2");

        let third = registry.validator_for("acme", &config("https://idp/keys2")).await;
        assert!(Arc::ptr_eq(&second, &third));
        assert_eq!(registry.build_count(), 2);
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let registry = ValidatorRegistry::new(8);
        let a = registry.validator_for("a", &config("https://idp/keys")).await;
        let b = registry.validator_for("b", &config("https://idp/keys")).await;
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_concurrent_first_lookups_share_one_build() {
        let registry = ValidatorRegistry::new(8);
        let cfg = config("https://idp/keys");
        let lookups = (0..16).map(|_| registry.validator_for("acme", &cfg));
        let validators = futures::future::join_all(lookups).await;

        assert!(validators.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(registry.build_count(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_rebuild() {
        let registry = ValidatorRegistry::new(8);
        registry.validator_for("acme", &config("https://idp/keys")).await;
        registry.invalidate("acme").await;
        registry.validator_for("acme", &config("https://idp/keys")).await;
        assert_eq!(registry.build_count(), 2);
    }
}
