//! Companion issuer endpoints: the public key set and token minting.
//!
//! Only mounted when the server is configured with an issuer.

use super::AppState;
use super::response::parse_json;
use crate::error::{ScimError, ScimResult};
use crate::issuer::{IssuerError, MintRequest, MintedToken, TokenIssuer};
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use jsonwebtoken::jwk::JwkSet;
use std::sync::Arc;

fn issuer_of<R>(state: &AppState<R>) -> ScimResult<&Arc<TokenIssuer>> {
    state
        .issuer
        .as_ref()
        .ok_or_else(|| ScimError::not_found("Token issuer is not enabled"))
}

/// `GET /discovery/v2.0/keys`
pub async fn keys<R>(State(state): State<AppState<R>>) -> ScimResult<Json<JwkSet>> {
    Ok(Json(issuer_of(&state)?.jwks()))
}

/// `POST /token`. An empty body mints with the configured defaults.
pub async fn mint_token<R>(
    State(state): State<AppState<R>>,
    body: Bytes,
) -> ScimResult<Json<MintedToken>> {
    let issuer = issuer_of(&state)?;
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        MintRequest::default()
    } else {
        serde_json::from_value(parse_json(&body)?)
            .map_err(|e| ScimError::invalid_request(format!("Invalid token request: {}", e)))?
    };

    let minted = issuer.mint(request).map_err(|e| match e {
        IssuerError::InvalidTtl { .. } => ScimError::InvalidValue(e.to_string()),
        other => ScimError::internal(other.to_string()),
    })?;
    Ok(Json(minted))
}
