//! Discovery endpoints. Authenticated like every other tenant route.

use super::AppState;
use super::response::ScimJson;
use crate::error::ScimResult;
use crate::multi_tenant::TenantResolver;
use crate::search::{SearchParams, SearchResult};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use serde_json::Value;

/// `GET /scim/v2/{tenant}/Schemas`
pub async fn schemas<R: TenantResolver>(
    State(state): State<AppState<R>>,
    Path(tenant): Path<String>,
    Query(params): Query<SearchParams>,
    headers: HeaderMap,
) -> ScimResult<ScimJson<SearchResult<Value>>> {
    state.authorize(&tenant, &headers).await?;
    let root = state.users.tenant_root(&tenant);
    let list = state
        .discovery
        .list_schemas(params.filter.as_deref(), &root)?;
    Ok(ScimJson::ok(list))
}

/// `GET /scim/v2/{tenant}/Schemas/{idOrName}`
pub async fn schema<R: TenantResolver>(
    State(state): State<AppState<R>>,
    Path((tenant, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ScimResult<ScimJson<Value>> {
    state.authorize(&tenant, &headers).await?;
    let root = state.users.tenant_root(&tenant);
    Ok(ScimJson::ok(state.discovery.get_schema(&id, &root)?))
}

/// `GET /scim/v2/{tenant}/ResourceTypes`
pub async fn resource_types<R: TenantResolver>(
    State(state): State<AppState<R>>,
    Path(tenant): Path<String>,
    Query(params): Query<SearchParams>,
    headers: HeaderMap,
) -> ScimResult<ScimJson<SearchResult<Value>>> {
    state.authorize(&tenant, &headers).await?;
    let root = state.users.tenant_root(&tenant);
    let list = state
        .discovery
        .list_resource_types(params.filter.as_deref(), &root)?;
    Ok(ScimJson::ok(list))
}

/// `GET /scim/v2/{tenant}/ResourceTypes/{idOrName}`
pub async fn resource_type<R: TenantResolver>(
    State(state): State<AppState<R>>,
    Path((tenant, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ScimResult<ScimJson<Value>> {
    state.authorize(&tenant, &headers).await?;
    let root = state.users.tenant_root(&tenant);
    Ok(ScimJson::ok(state.discovery.get_resource_type(&id, &root)?))
}

/// `GET /scim/v2/{tenant}/ServiceProviderConfig`
pub async fn service_provider_config<R: TenantResolver>(
    State(state): State<AppState<R>>,
    Path(tenant): Path<String>,
    headers: HeaderMap,
) -> ScimResult<ScimJson<Value>> {
    state.authorize(&tenant, &headers).await?;
    let root = state.users.tenant_root(&tenant);
    Ok(ScimJson::ok(state.discovery.service_provider_config(&root)?))
}
