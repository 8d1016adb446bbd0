//! Identity-provider linking.
//!
//! After every create, replace and patch the user's federated links are
//! brought in line with their email domain: each enabled tenant provider whose
//! domain matches gets a link, and every other link is dropped, including links
//! to providers the tenant does not know about.

use crate::directory::{DirectoryUser, FederatedIdentity, UserDirectory};
use crate::error::{ScimError, ScimResult};
use crate::multi_tenant::TenantContext;
use crate::resource::EXTERNAL_ID_ATTRIBUTE;
use std::collections::HashSet;

/// Lowercased domain part of the user's email, if any.
pub fn email_domain(user: &DirectoryUser) -> Option<String> {
    user.email
        .as_deref()
        .and_then(|email| email.rsplit_once('@'))
        .map(|(_, domain)| domain.trim().to_ascii_lowercase())
        .filter(|domain| !domain.is_empty())
}

/// Reconcile `user`'s federated links with the tenant's providers and persist
/// the result if anything changed.
pub async fn link_identity_providers<D: UserDirectory>(
    context: &TenantContext<D>,
    mut user: DirectoryUser,
) -> ScimResult<DirectoryUser> {
    if !context.link_idp {
        return Ok(user);
    }
    let Some(domain) = email_domain(&user) else {
        return Ok(user);
    };

    let providers = context
        .directory
        .identity_providers(&context.tenant_id)
        .await
        .map_err(|e| {
            log::error!(
                "Failed to read identity providers for tenant '{}' (request: '{}'): {}",
                context.tenant_id,
                context.request_id,
                e
            );
            ScimError::internal("Failed to read identity providers")
        })?;

    let matched: HashSet<&str> = providers
        .iter()
        .filter(|p| p.matches_domain(&domain))
        .map(|p| p.alias.as_str())
        .collect();

    let external_id = user
        .first_attribute(EXTERNAL_ID_ATTRIBUTE)
        .unwrap_or(&user.username)
        .to_string();

    let mut changed = false;
    for alias in &matched {
        if user.federated_identity(alias).is_none() {
            log::info!(
                "Linking user '{}' to identity provider '{}' for tenant '{}' (request: '{}')",
                user.id,
                alias,
                context.tenant_id,
                context.request_id
            );
            user.federated_identities.push(FederatedIdentity {
                provider_alias: alias.to_string(),
                user_id: external_id.clone(),
                user_name: user.username.clone(),
            });
            changed = true;
        }
    }

    let before = user.federated_identities.len();
    user.federated_identities
        .retain(|link| matched.contains(link.provider_alias.as_str()));
    if user.federated_identities.len() != before {
        log::info!(
            "Removed {} stale identity provider link(s) from user '{}' for tenant '{}' (request: '{}')",
            before - user.federated_identities.len(),
            user.id,
            context.tenant_id,
            context.request_id
        );
        changed = true;
    }

    if !changed {
        return Ok(user);
    }
    context.directory.update_user(user).await.map_err(|e| {
        log::error!(
            "Failed to store identity provider links for tenant '{}' (request: '{}'): {}",
            context.tenant_id,
            context.request_id,
            e
        );
        ScimError::internal("Failed to store identity provider links")
    })
}
