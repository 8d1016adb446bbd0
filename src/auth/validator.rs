//! Bearer token verification for one tenant configuration.

use super::AuthError;
use super::jwks::{KeyFamily, decoding_key, fetch_jwks, select_key};
use crate::multi_tenant::ExternalAuthConfig;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, Validation, decode, decode_header};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Configured value a claim must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    Exact(String),
    /// `"*"`: the claim is not checked
    Any,
}

impl Expectation {
    pub fn from_config(value: &str) -> Self {
        if value.trim() == "*" {
            Expectation::Any
        } else {
            Expectation::Exact(value.to_string())
        }
    }
}

/// Audience claim, a single string or a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    #[default]
    None,
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    pub fn contains(&self, aud: &str) -> bool {
        match self {
            Audience::None => false,
            Audience::Single(s) => s == aud,
            Audience::Multiple(v) => v.iter().any(|s| s == aud),
        }
    }
}

/// Claims of a verified token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub aud: Audience,
    pub exp: u64,
    #[serde(default)]
    pub iat: Option<u64>,
    #[serde(default)]
    pub nbf: Option<u64>,
    #[serde(default)]
    pub jti: Option<String>,
    /// Object id of the calling principal
    #[serde(default)]
    pub oid: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Default)]
struct KeyCache {
    set: Option<Arc<JwkSet>>,
    generation: u64,
}

/// Verifies tokens against one issuer / JWKS / audience combination.
///
/// The key set is fetched on first use and kept for the validator's lifetime.
/// A token naming an unknown `kid` triggers one refetch.
pub struct JwtValidator {
    tenant_id: String,
    jwks_uri: String,
    issuer: Expectation,
    audience: Expectation,
    client: reqwest::Client,
    keys: RwLock<KeyCache>,
    fetches: AtomicUsize,
}

impl std::fmt::Debug for JwtValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtValidator")
            .field("tenant_id", &self.tenant_id)
            .field("jwks_uri", &self.jwks_uri)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl JwtValidator {
    pub fn new(tenant_id: &str, config: &ExternalAuthConfig, client: reqwest::Client) -> Self {
        let issuer = Expectation::from_config(&config.issuer);
        let audience = Expectation::from_config(&config.audience);

        if issuer == Expectation::Any {
            log::warn!(
                "INSECURE: tenant '{}' accepts tokens from any issuer (issuer = \"*\")",
                tenant_id
            );
        }
        if audience == Expectation::Any {
            log::warn!(
                "INSECURE: tenant '{}' accepts tokens for any audience (audience = \"*\")",
                tenant_id
            );
        }

        Self {
            tenant_id: tenant_id.to_string(),
            jwks_uri: config.jwks_uri.clone(),
            issuer,
            audience,
            client,
            keys: RwLock::new(KeyCache::default()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Verify signature, issuer, audience and time window.
    pub async fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let header =
            decode_header(token).map_err(|e| AuthError::InvalidToken(format!("header: {}", e)))?;
        let family = KeyFamily::for_algorithm(header.alg)
            .ok_or_else(|| AuthError::UnsupportedAlgorithm(format!("{:?}", header.alg)))?;
        let kid = header.kid.as_deref();

        let (set, generation) = self.key_set().await?;
        let jwk = match select_key(&set, kid, family) {
            Some(jwk) => jwk.clone(),
            None => {
                let (set, _) = self.refresh(Some(generation)).await?;
                select_key(&set, kid, family)
                    .cloned()
                    .ok_or_else(|| AuthError::UnknownKey {
                        kid: kid.unwrap_or("<none>").to_string(),
                    })?
            }
        };
        let key = decoding_key(&jwk)?;

        let data = decode::<TokenClaims>(token, &key, &self.validation(header.alg))
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        Ok(data.claims)
    }

    /// Checks applied to a signed token. A claim with an exact expectation
    /// must be present, not merely match when it happens to be sent.
    fn validation(&self, alg: Algorithm) -> Validation {
        let mut validation = Validation::new(alg);
        validation.validate_nbf = true;
        let mut required = vec!["exp"];
        match &self.issuer {
            Expectation::Exact(issuer) => {
                validation.set_issuer(&[issuer]);
                required.push("iss");
            }
            Expectation::Any => {}
        }
        match &self.audience {
            Expectation::Exact(audience) => {
                validation.set_audience(&[audience]);
                required.push("aud");
            }
            Expectation::Any => validation.validate_aud = false,
        }
        validation.set_required_spec_claims(&required);
        validation
    }

    /// Number of JWKS downloads this validator has made.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn jwks_uri(&self) -> &str {
        &self.jwks_uri
    }

    async fn key_set(&self) -> Result<(Arc<JwkSet>, u64), AuthError> {
        {
            let cache = self.keys.read().await;
            if let Some(set) = &cache.set {
                return Ok((Arc::clone(set), cache.generation));
            }
        }
        self.refresh(None).await
    }

    /// Fetch the key set unless another task already refreshed it past `seen`.
    async fn refresh(&self, seen: Option<u64>) -> Result<(Arc<JwkSet>, u64), AuthError> {
        let mut cache = self.keys.write().await;
        if let Some(set) = &cache.set {
            let already_refreshed = match seen {
                Some(generation) => cache.generation != generation,
                None => true,
            };
            if already_refreshed {
                return Ok((Arc::clone(set), cache.generation));
            }
        }

        let set = Arc::new(fetch_jwks(&self.client, &self.jwks_uri).await?);
        self.fetches.fetch_add(1, Ordering::SeqCst);
        cache.generation += 1;
        cache.set = Some(Arc::clone(&set));
        Ok((set, cache.generation))
    }
}
