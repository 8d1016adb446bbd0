//! Companion token issuer.
//!
//! Holds an RSA keypair generated at startup, publishes the public half as a
//! JWKS document and mints RS256 bearer tokens. Provisioning clients and tests
//! use it to obtain tokens a tenant configured with this issuer will accept.
//!
//! ```rust,no_run
//! use scim_provisioner::issuer::{IssuerSettings, MintRequest, TokenIssuer};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let issuer = TokenIssuer::generate(IssuerSettings::new("https://issuer.local", "scim"))?;
//! let token = issuer.mint(MintRequest::default())?;
//! assert_eq!(token.token_type, "Bearer");
//! assert_eq!(issuer.jwks().keys.len(), 1);
//! # Ok(())
//! # }
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::jwk::{
    AlgorithmParameters, CommonParameters, Jwk, JwkSet, KeyAlgorithm, PublicKeyUse,
    RSAKeyParameters, RSAKeyType,
};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use serde::{Deserialize, Serialize};

const KEY_BITS: usize = 2048;
pub const MAX_TTL_SECONDS: u64 = 86_400;

/// Issuer defaults, overridable per mint request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerSettings {
    pub issuer: String,
    pub audience: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub object_id: Option<String>,
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

fn default_ttl() -> u64 {
    3600
}

impl IssuerSettings {
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            subject: None,
            object_id: None,
            ttl_seconds: default_ttl(),
        }
    }
}

/// Body of `POST /token`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MintRequest {
    #[serde(default)]
    pub oid: Option<String>,
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default, rename = "ttlSec")]
    pub ttl_sec: Option<u64>,
    #[serde(default)]
    pub sub: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintedToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub oid: String,
    pub iss: String,
    pub aud: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct IssuedClaims {
    iss: String,
    aud: String,
    sub: String,
    iat: u64,
    nbf: u64,
    exp: u64,
    jti: String,
    oid: String,
}

#[derive(Debug, thiserror::Error)]
pub enum IssuerError {
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("ttlSec must be between 1 and {max}, got {ttl}")]
    InvalidTtl { ttl: u64, max: u64 },

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// RSA signing service whose public key verifiers fetch as JWKS.
pub struct TokenIssuer {
    settings: IssuerSettings,
    kid: String,
    encoding_key: EncodingKey,
    jwk: Jwk,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("settings", &self.settings)
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Generate a fresh 2048-bit keypair with a random key id.
    ///
    /// This is CPU heavy; async callers should run it on a blocking thread.
    pub fn generate(settings: IssuerSettings) -> Result<Self, IssuerError> {
        let private_key = RsaPrivateKey::new(&mut OsRng, KEY_BITS)
            .map_err(|e| IssuerError::KeyGeneration(e.to_string()))?;
        Self::with_key(settings, &private_key)
    }

    /// Build an issuer around an existing private key.
    pub fn with_key(settings: IssuerSettings, private_key: &RsaPrivateKey) -> Result<Self, IssuerError> {
        let pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| IssuerError::KeyGeneration(e.to_string()))?;
        let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| IssuerError::KeyGeneration(e.to_string()))?;

        let kid = uuid::Uuid::new_v4().simple().to_string();
        let public_key = private_key.to_public_key();
        let jwk = Jwk {
            common: CommonParameters {
                public_key_use: Some(PublicKeyUse::Signature),
                key_algorithm: Some(KeyAlgorithm::RS256),
                key_id: Some(kid.clone()),
                ..Default::default()
            },
            algorithm: AlgorithmParameters::RSA(RSAKeyParameters {
                key_type: RSAKeyType::RSA,
                n: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
                e: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
            }),
        };

        log::info!("Token issuer '{}' ready with key '{}'", settings.issuer, kid);
        Ok(Self {
            settings,
            kid,
            encoding_key,
            jwk,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn settings(&self) -> &IssuerSettings {
        &self.settings
    }

    /// The public key set verifiers fetch.
    pub fn jwks(&self) -> JwkSet {
        JwkSet {
            keys: vec![self.jwk.clone()],
        }
    }

    /// Mint a signed token, falling back to the configured defaults for every
    /// field the request leaves out.
    pub fn mint(&self, request: MintRequest) -> Result<MintedToken, IssuerError> {
        let ttl = request.ttl_sec.unwrap_or(self.settings.ttl_seconds);
        if ttl == 0 || ttl > MAX_TTL_SECONDS {
            return Err(IssuerError::InvalidTtl {
                ttl,
                max: MAX_TTL_SECONDS,
            });
        }

        let iss = request.iss.unwrap_or_else(|| self.settings.issuer.clone());
        let aud = request.aud.unwrap_or_else(|| self.settings.audience.clone());
        let oid = request
            .oid
            .or_else(|| self.settings.object_id.clone())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let sub = request
            .sub
            .or_else(|| self.settings.subject.clone())
            .unwrap_or_else(|| oid.clone());

        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let claims = IssuedClaims {
            iss: iss.clone(),
            aud: aud.clone(),
            sub,
            iat: now,
            nbf: now,
            exp: now + ttl,
            jti: uuid::Uuid::new_v4().to_string(),
            oid: oid.clone(),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());
        let access_token = jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .map_err(|e| IssuerError::Signing(e.to_string()))?;

        log::debug!("Minted token for oid '{}' (aud '{}', ttl {}s)", oid, aud, ttl);
        Ok(MintedToken {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: ttl,
            oid,
            iss,
            aud,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::decoding_key;
    use jsonwebtoken::{Validation, decode, decode_header};
    use std::sync::OnceLock;

    fn issuer() -> &'static TokenIssuer {
        static ISSUER: OnceLock<TokenIssuer> = OnceLock::new();
        ISSUER.get_or_init(|| {
            let mut settings = IssuerSettings::new("https://issuer.test", "scim-api");
            settings.object_id = Some("fixed-oid".to_string());
            TokenIssuer::generate(settings).unwrap()
        })
    }

    fn claims_of(token: &str, audience: &str) -> IssuedClaims {
        let jwks = issuer().jwks();
        let key = decoding_key(&jwks.keys[0]).unwrap();
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[audience]);
        decode::<IssuedClaims>(token, &key, &validation).unwrap().claims
    }

    #[test]
    fn test_defaults() {
        let minted = issuer().mint(MintRequest::default()).unwrap();
        assert_eq!(minted.token_type, "Bearer");
        assert_eq!(minted.expires_in, 3600);
        assert_eq!(minted.oid, "fixed-oid");
        assert_eq!(minted.iss, "https://issuer.test");

        let claims = claims_of(&minted.access_token, "scim-api");
        assert_eq!(claims.sub, "fixed-oid");
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn test_overrides() {
        let minted = issuer()
            .mint(MintRequest {
                oid: Some("o-1".to_string()),
                aud: Some("other".to_string()),
                iss: Some("https://elsewhere".to_string()),
                ttl_sec: Some(60),
                sub: Some("svc".to_string()),
            })
            .unwrap();
        let claims = claims_of(&minted.access_token, "other");
        assert_eq!(claims.iss, "https://elsewhere");
        assert_eq!(claims.sub, "svc");
        assert_eq!(claims.oid, "o-1");
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn test_header_names_published_key() {
        let minted = issuer().mint(MintRequest::default()).unwrap();
        let header = decode_header(&minted.access_token).unwrap();
        assert_eq!(header.kid.as_deref(), Some(issuer().kid()));
        assert_eq!(
            issuer().jwks().keys[0].common.key_id.as_deref(),
            Some(issuer().kid())
        );
    }

    #[test]
    fn test_ttl_bounds() {
        for ttl in [0, MAX_TTL_SECONDS + 1] {
            let result = issuer().mint(MintRequest {
                ttl_sec: Some(ttl),
                ..Default::default()
            });
            assert!(matches!(result, Err(IssuerError::InvalidTtl { .. })));
        }
    }

    #[test]
    fn test_mint_request_field_names() {
        let request: MintRequest = serde_json::from_value(serde_json::json!({"ttlSec": 5})).unwrap();
        assert_eq!(request.ttl_sec, Some(5));
    }
}
