//! User resource handler.
//!
//! Every operation is request scoped: it receives the tenant context, talks to
//! the tenant's directory and returns a rendered SCIM document. Only users that
//! carry the tenant's managed marker role are visible to list and may be
//! mutated.

use super::idp_link::link_identity_providers;
use crate::directory::{DirectoryError, DirectoryUser, UserDirectory};
use crate::error::{ScimError, ScimResult, ValidationError};
use crate::multi_tenant::TenantContext;
use crate::resource::{PatchRequest, ResourceTranslator, ScimUserDocument, apply_operations};
use crate::schema::{
    AttributeSelection, ResourceKind, ResourceTypeDefinition, Schema, SchemaRegistry,
    trim_for_response,
};
use crate::search::{SearchEngine, SearchParams, SearchRequest, SearchResult};
use serde_json::Value;
use std::sync::Arc;

/// SCIM CRUD over directory users.
#[derive(Debug, Clone)]
pub struct UserResourceHandler {
    registry: Arc<SchemaRegistry>,
    search: SearchEngine,
    base_url: String,
}

impl UserResourceHandler {
    /// `base_url` is the externally visible server root, e.g. `https://scim.example.com`.
    pub fn new(registry: Arc<SchemaRegistry>, base_url: impl Into<String>) -> Self {
        Self {
            search: SearchEngine::new(Arc::clone(&registry)),
            registry,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// `{base_url}/scim/v2/{tenant}`, the root every `meta.location` hangs off.
    pub fn tenant_root(&self, tenant_id: &str) -> String {
        format!("{}/scim/v2/{}", self.base_url, tenant_id)
    }

    /// List the tenant's managed users.
    pub async fn list<D: UserDirectory>(
        &self,
        context: &TenantContext<D>,
        params: &SearchParams,
    ) -> ScimResult<SearchResult<Value>> {
        let request = SearchRequest::from_params(params)?;
        let selection = AttributeSelection::from_query(
            params.attributes.as_deref(),
            params.excluded_attributes.as_deref(),
        );

        let members = context
            .directory
            .list_members(&context.tenant_id)
            .await
            .map_err(|e| {
                log::error!(
                    "Failed to list members for tenant '{}' (request: '{}'): {}",
                    context.tenant_id,
                    context.request_id,
                    e
                );
                ScimError::internal("Failed to list users")
            })?;

        let candidates = members
            .iter()
            .filter(|user| user.has_role(&context.managed_role))
            .map(ResourceTranslator::to_document);

        let root = self.tenant_root(&context.tenant_id);
        let (_, schema) = self.user_types()?;
        let result = self
            .search
            .execute(ResourceKind::User, &request, candidates, &root)?;

        log::debug!(
            "SCIM list returned {} of {} users for tenant '{}' (request: '{}')",
            result.items_per_page,
            result.total_results,
            context.tenant_id,
            context.request_id
        );
        Ok(result.map(|mut document| {
            trim_for_response(schema, &mut document, &selection);
            document
        }))
    }

    /// Fetch one managed user of the tenant.
    pub async fn get<D: UserDirectory>(
        &self,
        context: &TenantContext<D>,
        id: &str,
        selection: &AttributeSelection,
    ) -> ScimResult<Value> {
        let user = self.lookup(context, id).await?;
        if !self.is_member(context, &user).await? {
            return Err(ScimError::resource_not_found("User", id));
        }
        self.assert_managed(context, &user)?;
        self.render(context, &user, selection)
    }

    /// Create a user, mark it managed and add it to the tenant.
    pub async fn create<D: UserDirectory>(
        &self,
        context: &TenantContext<D>,
        body: &Value,
    ) -> ScimResult<Value> {
        let (definition, schema) = self.user_types()?;
        let body = self.registry.canonicalize(schema, body);
        self.registry.validate_create(definition, schema, &body)?;
        let document = parse_document(body)?;

        let existing = context
            .directory
            .find_by_username(&document.user_name)
            .await
            .map_err(|e| directory_failure(context, "look up userName", e))?;
        if existing.is_some() {
            log::info!(
                "SCIM create rejected, userName '{}' exists for tenant '{}' (request: '{}')",
                document.user_name,
                context.tenant_id,
                context.request_id
            );
            return Err(ScimError::conflict("userName", &document.user_name));
        }

        let mut user = DirectoryUser::new(&document.user_name);
        ResourceTranslator::apply(&document, &mut user, context.email_as_username)?;
        user.roles.insert(context.managed_role.clone());

        let user = context
            .directory
            .create_user(user)
            .await
            .map_err(|e| store_failure(context, e))?;
        let id = user.id.clone();
        let user = match self.admit(context, user).await {
            Ok(user) => user,
            Err(error) => {
                discard(context, &id).await;
                return Err(error);
            }
        };

        log::info!(
            "SCIM created user '{}' ({}) for tenant '{}' (request: '{}')",
            user.id,
            user.username,
            context.tenant_id,
            context.request_id
        );
        self.render(context, &user, &AttributeSelection::default())
    }

    /// Replace a managed user with `body`.
    pub async fn replace<D: UserDirectory>(
        &self,
        context: &TenantContext<D>,
        id: &str,
        body: &Value,
    ) -> ScimResult<Value> {
        let user = self.lookup_mutable(context, id).await?;
        let (definition, schema) = self.user_types()?;

        let current = ResourceTranslator::to_value(&user, &self.tenant_root(&context.tenant_id))?;
        let body = self.registry.canonicalize(schema, body);
        let prepared = self
            .registry
            .prepare_replace(definition, schema, &body, &current)?;
        let document = parse_document(prepared)?;

        let user = self.store(context, user, &document).await?;
        log::info!(
            "SCIM replaced user '{}' for tenant '{}' (request: '{}')",
            user.id,
            context.tenant_id,
            context.request_id
        );
        self.render(context, &user, &AttributeSelection::default())
    }

    /// Apply a PATCH request to a managed user.
    pub async fn patch<D: UserDirectory>(
        &self,
        context: &TenantContext<D>,
        id: &str,
        body: Value,
    ) -> ScimResult<Value> {
        let user = self.lookup_mutable(context, id).await?;
        let (_, schema) = self.user_types()?;
        let request = PatchRequest::from_value(body)?;

        let current = ResourceTranslator::to_value(&user, &self.tenant_root(&context.tenant_id))?;
        let operations = request.prepare(&self.registry, schema, &current)?;
        let mut tree = current;
        apply_operations(&mut tree, &operations)?;
        self.registry.validate_required(schema, &tree)?;

        let document: ScimUserDocument = serde_json::from_value(tree).map_err(|e| {
            log::error!(
                "PATCH produced an unreadable User '{}' for tenant '{}' (request: '{}'): {}",
                id,
                context.tenant_id,
                context.request_id,
                e
            );
            ScimError::internal(format!("Patched resource is not a valid User: {}", e))
        })?;

        let user = self.store(context, user, &document).await?;
        log::info!(
            "SCIM patched user '{}' with {} operation(s) for tenant '{}' (request: '{}')",
            user.id,
            operations.len(),
            context.tenant_id,
            context.request_id
        );
        self.render(context, &user, &AttributeSelection::default())
    }

    /// Join a freshly stored user to the tenant and link its providers.
    async fn admit<D: UserDirectory>(
        &self,
        context: &TenantContext<D>,
        user: DirectoryUser,
    ) -> ScimResult<DirectoryUser> {
        context
            .directory
            .add_member(&context.tenant_id, &user.id)
            .await
            .map_err(|e| directory_failure(context, "add membership", e))?;
        link_identity_providers(context, user).await
    }

    /// Remove a managed user from the tenant. The directory record stays.
    pub async fn delete<D: UserDirectory>(
        &self,
        context: &TenantContext<D>,
        id: &str,
    ) -> ScimResult<()> {
        let user = self.lookup_mutable(context, id).await?;
        context
            .directory
            .remove_member(&context.tenant_id, &user.id)
            .await
            .map_err(|e| directory_failure(context, "remove membership", e))?;
        log::info!(
            "SCIM removed user '{}' from tenant '{}' (request: '{}')",
            user.id,
            context.tenant_id,
            context.request_id
        );
        Ok(())
    }

    /// A managed member of the tenant, as the mutating operations require.
    pub(crate) async fn lookup_mutable<D: UserDirectory>(
        &self,
        context: &TenantContext<D>,
        id: &str,
    ) -> ScimResult<DirectoryUser> {
        let user = self.lookup(context, id).await?;
        self.assert_managed(context, &user)?;
        if !self.is_member(context, &user).await? {
            return Err(ScimError::not_found("User is not part of organization"));
        }
        Ok(user)
    }

    async fn lookup<D: UserDirectory>(
        &self,
        context: &TenantContext<D>,
        id: &str,
    ) -> ScimResult<DirectoryUser> {
        match context.directory.get_user(id).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(ScimError::resource_not_found("User", id)),
            Err(e) => {
                log::warn!(
                    "Directory lookup of user '{}' failed for tenant '{}' (request: '{}'): {}",
                    id,
                    context.tenant_id,
                    context.request_id,
                    e
                );
                Err(ScimError::resource_not_found("User", id))
            }
        }
    }

    async fn is_member<D: UserDirectory>(
        &self,
        context: &TenantContext<D>,
        user: &DirectoryUser,
    ) -> ScimResult<bool> {
        context
            .directory
            .is_member(&context.tenant_id, &user.id)
            .await
            .map_err(|e| {
                log::warn!(
                    "Membership check of user '{}' failed for tenant '{}' (request: '{}'): {}",
                    user.id,
                    context.tenant_id,
                    context.request_id,
                    e
                );
                ScimError::resource_not_found("User", &user.id)
            })
    }

    fn assert_managed<D>(&self, context: &TenantContext<D>, user: &DirectoryUser) -> ScimResult<()> {
        if user.has_role(&context.managed_role) {
            return Ok(());
        }
        log::warn!(
            "User '{}' is not managed by SCIM for tenant '{}' (request: '{}')",
            user.id,
            context.tenant_id,
            context.request_id
        );
        Err(ScimError::forbidden("User is not managed by SCIM"))
    }

    async fn store<D: UserDirectory>(
        &self,
        context: &TenantContext<D>,
        mut user: DirectoryUser,
        document: &ScimUserDocument,
    ) -> ScimResult<DirectoryUser> {
        ResourceTranslator::apply(document, &mut user, context.email_as_username)?;
        let user = context
            .directory
            .update_user(user)
            .await
            .map_err(|e| store_failure(context, e))?;
        link_identity_providers(context, user).await
    }

    fn render<D>(
        &self,
        context: &TenantContext<D>,
        user: &DirectoryUser,
        selection: &AttributeSelection,
    ) -> ScimResult<Value> {
        let (_, schema) = self.user_types()?;
        let mut document =
            ResourceTranslator::to_value(user, &self.tenant_root(&context.tenant_id))?;
        trim_for_response(schema, &mut document, selection);
        Ok(document)
    }

    fn user_types(&self) -> ScimResult<(&ResourceTypeDefinition, &Schema)> {
        let definition = self.registry.definition_for(ResourceKind::User)?;
        let schema = self.registry.schema_for(ResourceKind::User)?;
        Ok((definition, schema))
    }
}

fn parse_document(body: Value) -> ScimResult<ScimUserDocument> {
    serde_json::from_value(body).map_err(|e| {
        ValidationError::custom(format!("Request body is not a valid User: {}", e)).into()
    })
}

fn store_failure<D>(context: &TenantContext<D>, error: DirectoryError) -> ScimError {
    match error {
        DirectoryError::DuplicateUsername { username } => ScimError::conflict("userName", username),
        DirectoryError::UserNotFound { id } => ScimError::resource_not_found("User", id),
        other => directory_failure(context, "store user", other),
    }
}

/// Undo a half-finished create so the userName can be provisioned again.
async fn discard<D: UserDirectory>(context: &TenantContext<D>, id: &str) {
    match context.directory.delete_user(id).await {
        Ok(()) => log::warn!(
            "Rolled back user '{}' after a failed create for tenant '{}' (request: '{}')",
            id,
            context.tenant_id,
            context.request_id
        ),
        Err(e) => log::error!(
            "Failed to roll back user '{}' for tenant '{}' (request: '{}'): {}",
            id,
            context.tenant_id,
            context.request_id,
            e
        ),
    }
}

fn directory_failure<D>(context: &TenantContext<D>, action: &str, error: DirectoryError) -> ScimError {
    log::error!(
        "Directory failed to {} for tenant '{}' (request: '{}'): {}",
        action,
        context.tenant_id,
        context.request_id,
        error
    );
    ScimError::internal(format!("Directory failed to {}", action))
}
