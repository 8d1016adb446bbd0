//! `/Users` endpoints and the provisioning batch.

use super::AppState;
use super::response::{ScimJson, parse_json};
use crate::error::ScimResult;
use crate::multi_tenant::TenantResolver;
use crate::resource_handlers::ProvisionReport;
use crate::schema::AttributeSelection;
use crate::search::{SearchParams, SearchResult};
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use serde_json::Value;

/// `GET /scim/v2/{tenant}/Users`
pub async fn list_users<R: TenantResolver>(
    State(state): State<AppState<R>>,
    Path(tenant): Path<String>,
    Query(params): Query<SearchParams>,
    headers: HeaderMap,
) -> ScimResult<ScimJson<SearchResult<Value>>> {
    let context = state.authorize(&tenant, &headers).await?;
    let result = state.users.list(&context, &params).await?;
    Ok(ScimJson::ok(result))
}

/// `GET /scim/v2/{tenant}/Users/{id}`
pub async fn get_user<R: TenantResolver>(
    State(state): State<AppState<R>>,
    Path((tenant, id)): Path<(String, String)>,
    Query(params): Query<SearchParams>,
    headers: HeaderMap,
) -> ScimResult<ScimJson<Value>> {
    let context = state.authorize(&tenant, &headers).await?;
    let selection = AttributeSelection::from_query(
        params.attributes.as_deref(),
        params.excluded_attributes.as_deref(),
    );
    let user = state.users.get(&context, &id, &selection).await?;
    Ok(ScimJson::resource(user))
}

/// `POST /scim/v2/{tenant}/Users`
pub async fn create_user<R: TenantResolver>(
    State(state): State<AppState<R>>,
    Path(tenant): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ScimResult<ScimJson<Value>> {
    let context = state.authorize(&tenant, &headers).await?;
    let body = parse_json(&body)?;
    let user = state.users.create(&context, &body).await?;
    Ok(ScimJson::created(user))
}

/// `PUT /scim/v2/{tenant}/Users/{id}`
pub async fn replace_user<R: TenantResolver>(
    State(state): State<AppState<R>>,
    Path((tenant, id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> ScimResult<ScimJson<Value>> {
    let context = state.authorize(&tenant, &headers).await?;
    let body = parse_json(&body)?;
    let user = state.users.replace(&context, &id, &body).await?;
    Ok(ScimJson::resource(user))
}

/// `PATCH /scim/v2/{tenant}/Users/{id}`
pub async fn patch_user<R: TenantResolver>(
    State(state): State<AppState<R>>,
    Path((tenant, id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> ScimResult<ScimJson<Value>> {
    let context = state.authorize(&tenant, &headers).await?;
    let body = parse_json(&body)?;
    let user = state.users.patch(&context, &id, body).await?;
    Ok(ScimJson::resource(user))
}

/// `DELETE /scim/v2/{tenant}/Users/{id}`
pub async fn delete_user<R: TenantResolver>(
    State(state): State<AppState<R>>,
    Path((tenant, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ScimResult<StatusCode> {
    let context = state.authorize(&tenant, &headers).await?;
    state.users.delete(&context, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /provision/{tenant}`
pub async fn provision_users<R: TenantResolver>(
    State(state): State<AppState<R>>,
    Path(tenant): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ScimResult<Json<ProvisionReport>> {
    let context = state.authorize(&tenant, &headers).await?;
    let batch = parse_json(&body)?;
    let report = state.users.provision(&context, batch).await?;
    Ok(Json(report))
}
