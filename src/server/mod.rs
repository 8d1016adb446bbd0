//! HTTP surface.
//!
//! ## Endpoint Structure
//!
//! Tenant-scoped SCIM root `/scim/v2/{tenantId}`:
//! - `GET/POST /Users`, `GET/PUT/PATCH/DELETE /Users/{id}`
//! - `GET /Schemas`, `GET /Schemas/{idOrName}`
//! - `GET /ResourceTypes`, `GET /ResourceTypes/{idOrName}`
//! - `GET /ServiceProviderConfig`
//!
//! Outside the SCIM root:
//! - `POST /provision/{tenantId}` - batch create-or-update
//! - `GET /discovery/v2.0/keys`, `POST /token` - companion issuer, when configured
//! - `GET /health`
//!
//! Each handler resolves the tenant from the path and authenticates the
//! request explicitly through [`AppState::authorize`]; there is no hidden
//! per-request injection.

pub mod discovery;
pub mod issuer;
pub mod response;
pub mod users;

pub use response::{SCIM_CONTENT_TYPE, ScimJson, parse_json};

use crate::auth::{Authenticator, ValidatorRegistry};
use crate::error::ScimResult;
use crate::issuer::TokenIssuer;
use crate::multi_tenant::{TenantContext, TenantResolver};
use crate::resource_handlers::UserResourceHandler;
use crate::schema::SchemaRegistry;
use crate::schema_discovery::SchemaDiscovery;
use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, header};
use axum::routing::{get, post};
use serde_json::{Value, json};
use std::sync::Arc;

/// Shared state behind every route.
pub struct AppState<R> {
    pub resolver: Arc<R>,
    pub authenticator: Authenticator,
    pub users: UserResourceHandler,
    pub discovery: SchemaDiscovery,
    pub issuer: Option<Arc<TokenIssuer>>,
}

impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            authenticator: self.authenticator.clone(),
            users: self.users.clone(),
            discovery: self.discovery.clone(),
            issuer: self.issuer.clone(),
        }
    }
}

impl<R: TenantResolver> AppState<R> {
    pub fn new(
        resolver: Arc<R>,
        registry: Arc<SchemaRegistry>,
        validators: Arc<ValidatorRegistry>,
        base_url: &str,
    ) -> Self {
        Self {
            resolver,
            authenticator: Authenticator::new(validators),
            users: UserResourceHandler::new(Arc::clone(&registry), base_url),
            discovery: SchemaDiscovery::new(registry),
            issuer: None,
        }
    }

    /// Mount the companion issuer routes.
    pub fn with_issuer(mut self, issuer: Arc<TokenIssuer>) -> Self {
        self.issuer = Some(issuer);
        self
    }

    /// Resolve `tenant_id` and verify the request's bearer token for it.
    pub async fn authorize(
        &self,
        tenant_id: &str,
        headers: &HeaderMap,
    ) -> ScimResult<TenantContext<R::Directory>> {
        let request_id = request_id(headers);
        let context = self.resolver.resolve(tenant_id, &request_id).await?;
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        self.authenticator.verify(&context, authorization).await?;
        Ok(context)
    }
}

/// The caller's `X-Request-Id` if it sent one, otherwise a fresh uuid.
fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Build the application router.
pub fn router<R: TenantResolver>(state: AppState<R>) -> Router {
    let mut router = Router::new()
        .route(
            "/scim/v2/:tenant/Users",
            get(users::list_users::<R>).post(users::create_user::<R>),
        )
        .route(
            "/scim/v2/:tenant/Users/:id",
            get(users::get_user::<R>)
                .put(users::replace_user::<R>)
                .patch(users::patch_user::<R>)
                .delete(users::delete_user::<R>),
        )
        .route("/scim/v2/:tenant/Schemas", get(discovery::schemas::<R>))
        .route("/scim/v2/:tenant/Schemas/:id", get(discovery::schema::<R>))
        .route(
            "/scim/v2/:tenant/ResourceTypes",
            get(discovery::resource_types::<R>),
        )
        .route(
            "/scim/v2/:tenant/ResourceTypes/:id",
            get(discovery::resource_type::<R>),
        )
        .route(
            "/scim/v2/:tenant/ServiceProviderConfig",
            get(discovery::service_provider_config::<R>),
        )
        .route("/provision/:tenant", post(users::provision_users::<R>))
        .route("/health", get(health));

    if state.issuer.is_some() {
        router = router
            .route("/discovery/v2.0/keys", get(issuer::keys::<R>))
            .route("/token", post(issuer::mint_token::<R>));
    }
    router.with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}
