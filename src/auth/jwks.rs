//! JSON Web Key Set retrieval and key selection.

use super::AuthError;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet};

/// Key type a signing algorithm needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    Rsa,
    Ec,
}

impl KeyFamily {
    /// `None` for algorithms that are never accepted (HMAC).
    pub fn for_algorithm(alg: Algorithm) -> Option<Self> {
        match alg {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => Some(KeyFamily::Rsa),
            Algorithm::ES256 | Algorithm::ES384 => Some(KeyFamily::Ec),
            _ => None,
        }
    }

    fn of(jwk: &Jwk) -> Option<Self> {
        match jwk.algorithm {
            AlgorithmParameters::RSA(_) => Some(KeyFamily::Rsa),
            AlgorithmParameters::EllipticCurve(_) => Some(KeyFamily::Ec),
            _ => None,
        }
    }
}

/// Pick the verification key for a token.
///
/// With a `kid` the key must carry that id; without one the first key of the
/// right family is used.
pub fn select_key<'a>(set: &'a JwkSet, kid: Option<&str>, family: KeyFamily) -> Option<&'a Jwk> {
    set.keys.iter().find(|jwk| {
        KeyFamily::of(jwk) == Some(family)
            && match kid {
                Some(kid) => jwk.common.key_id.as_deref() == Some(kid),
                None => true,
            }
    })
}

/// Convert a public JWK to a [`DecodingKey`].
pub fn decoding_key(jwk: &Jwk) -> Result<DecodingKey, AuthError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
            .map_err(|e| AuthError::InvalidKey(format!("RSA key: {}", e))),
        AlgorithmParameters::EllipticCurve(ec) => DecodingKey::from_ec_components(&ec.x, &ec.y)
            .map_err(|e| AuthError::InvalidKey(format!("EC key: {}", e))),
        _ => Err(AuthError::InvalidKey("unsupported key type".to_string())),
    }
}

/// Download a key set.
///
/// Any transport failure, non-2xx status or unparseable body is an error;
/// there is no fallback to previously fetched keys.
pub async fn fetch_jwks(client: &reqwest::Client, url: &str) -> Result<JwkSet, AuthError> {
    log::debug!("Fetching JWKS from {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AuthError::JwksFetch(format!("{}: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(AuthError::JwksFetch(format!(
            "{} returned {}",
            url,
            response.status()
        )));
    }

    let set: JwkSet = response
        .json()
        .await
        .map_err(|e| AuthError::JwksFetch(format!("{}: invalid key set: {}", url, e)))?;

    log::info!("Fetched {} keys from {}", set.keys.len(), url);
    Ok(set)
}
