//! Per-tenant bearer token authentication.
//!
//! [`Authenticator::verify`] is the single entry point. It extracts the bearer
//! token, checks the tenant's authentication mode and verifies the token with
//! the tenant's cached [`JwtValidator`]. Every failure reason is logged and
//! then collapsed into [`ScimError::Unauthorized`]; clients never see why.
//!
//! # Key Types
//!
//! - [`ValidatorRegistry`] - bounded cache of validators, one per tenant configuration
//! - [`JwtValidator`] - verifies tokens against one issuer / JWKS / audience
//! - [`TokenClaims`] - claims of an accepted token

pub mod jwks;
pub mod registry;
pub mod validator;

pub use jwks::{KeyFamily, decoding_key, fetch_jwks, select_key};
pub use registry::{DEFAULT_VALIDATOR_CAPACITY, ValidatorEntry, ValidatorKey, ValidatorRegistry};
pub use validator::{Audience, Expectation, JwtValidator, TokenClaims};

use crate::error::{ConfigurationError, ScimError, ScimResult};
use crate::multi_tenant::{AuthMode, TenantAuth, TenantContext};
use std::sync::Arc;

/// Internal authentication failure reasons. Logged, never returned to clients.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingToken,

    #[error("Authorization header is not a bearer token")]
    MalformedHeader,

    #[error("unsupported signing algorithm {0}")]
    UnsupportedAlgorithm(String),

    #[error("no key '{kid}' in the tenant's key set")]
    UnknownKey { kid: String },

    #[error("JWKS fetch failed: {0}")]
    JwksFetch(String),

    #[error("unusable key: {0}")]
    InvalidKey(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),
}

/// Extract the token from an `Authorization` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingToken)?.trim();
    let (scheme, token) = header.split_once(' ').ok_or(AuthError::MalformedHeader)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }
    Ok(token)
}

/// Verifies requests against their tenant's authentication settings.
#[derive(Debug, Clone)]
pub struct Authenticator {
    registry: Arc<ValidatorRegistry>,
}

impl Authenticator {
    pub fn new(registry: Arc<ValidatorRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ValidatorRegistry> {
        &self.registry
    }

    /// Verify the request's `Authorization` header for `context`'s tenant.
    pub async fn verify<D>(
        &self,
        context: &TenantContext<D>,
        authorization: Option<&str>,
    ) -> ScimResult<TokenClaims> {
        let token = bearer_token(authorization).map_err(|e| self.reject(context, e))?;

        let config = match &context.auth {
            TenantAuth::ExternalIssuer(config) => config,
            TenantAuth::DirectoryNative => {
                log::error!(
                    "Tenant '{}' uses directory-native authentication, which this server does not support (request: '{}')",
                    context.tenant_id,
                    context.request_id
                );
                return Err(ConfigurationError::UnsupportedAuthMode {
                    tenant_id: context.tenant_id.clone(),
                    mode: AuthMode::DirectoryNative.as_str().to_string(),
                }
                .into());
            }
        };

        let validator = self.registry.validator_for(&context.tenant_id, config).await;
        let claims = validator
            .verify(token)
            .await
            .map_err(|e| self.reject(context, e))?;

        log::debug!(
            "Authenticated subject '{}' for tenant '{}' (request: '{}')",
            claims.sub.as_deref().unwrap_or("-"),
            context.tenant_id,
            context.request_id
        );
        Ok(claims)
    }

    fn reject<D>(&self, context: &TenantContext<D>, reason: AuthError) -> ScimError {
        log::warn!(
            "Rejected request for tenant '{}' (request: '{}'): {}",
            context.tenant_id,
            context.request_id,
            reason
        );
        ScimError::Unauthorized
    }
}
