//! The user directory capability the provisioning surface fronts.
//!
//! The directory owns user records, tenant membership and the tenant's
//! external identity providers. This crate only needs the narrow set of
//! operations in [`UserDirectory`]; [`InMemoryDirectory`] is the bundled
//! implementation used by the server binary and the tests.
//!
//! The directory layer knows nothing about SCIM. Translating records into SCIM
//! documents is [`ResourceTranslator`](crate::resource::ResourceTranslator)'s job.

pub mod in_memory;

pub use in_memory::{InMemoryDirectory, InMemoryDirectoryStats};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

/// A user record as the directory stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub enabled: bool,
    /// Directory-side role grants, including the tenant's managed marker
    pub roles: BTreeSet<String>,
    /// Free-form multi-valued attributes
    pub attributes: BTreeMap<String, Vec<String>>,
    pub federated_identities: Vec<FederatedIdentity>,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl DirectoryUser {
    /// A fresh, enabled user with a generated id.
    pub fn new(username: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.into(),
            email: None,
            first_name: None,
            last_name: None,
            enabled: true,
            roles: BTreeSet::new(),
            attributes: BTreeMap::new(),
            federated_identities: Vec::new(),
            created: now,
            last_modified: now,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn attribute(&self, name: &str) -> Option<&[String]> {
        self.attributes.get(name).map(Vec::as_slice)
    }

    pub fn first_attribute(&self, name: &str) -> Option<&str> {
        self.attribute(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Replace an attribute's values; an empty list removes it.
    pub fn set_attribute(&mut self, name: &str, values: Vec<String>) {
        if values.is_empty() {
            self.attributes.remove(name);
        } else {
            self.attributes.insert(name.to_string(), values);
        }
    }

    pub fn federated_identity(&self, provider_alias: &str) -> Option<&FederatedIdentity> {
        self.federated_identities
            .iter()
            .find(|link| link.provider_alias == provider_alias)
    }
}

/// Link between a directory user and an account at an external identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedIdentity {
    pub provider_alias: String,
    /// The user's id at the provider
    pub user_id: String,
    pub user_name: String,
}

/// An external identity provider configured for a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProviderConfig {
    pub alias: String,
    pub tenant_id: String,
    /// Email domain routed to this provider
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl IdentityProviderConfig {
    /// Whether this provider claims `email_domain`.
    pub fn matches_domain(&self, email_domain: &str) -> bool {
        self.enabled
            && self
                .domain
                .as_deref()
                .map(|d| !d.is_empty() && d.eq_ignore_ascii_case(email_domain))
                .unwrap_or(false)
    }
}

/// Directory operation errors.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("User '{id}' not found")]
    UserNotFound { id: String },

    #[error("Username '{username}' is already taken")]
    DuplicateUsername { username: String },

    #[error("Directory backend failure: {message}")]
    Backend { message: String },
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Operations the provisioning surface needs from the user directory.
///
/// Implementations must be safe to share across request tasks; each request
/// sees whatever the directory returns at the time of the call.
pub trait UserDirectory: Send + Sync + 'static {
    /// Look up a user by id.
    fn get_user(
        &self,
        id: &str,
    ) -> impl Future<Output = DirectoryResult<Option<DirectoryUser>>> + Send;

    /// Look up a user by username (case-insensitive).
    fn find_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = DirectoryResult<Option<DirectoryUser>>> + Send;

    /// Persist a new user. Fails with [`DirectoryError::DuplicateUsername`] when
    /// the username is taken.
    fn create_user(
        &self,
        user: DirectoryUser,
    ) -> impl Future<Output = DirectoryResult<DirectoryUser>> + Send;

    /// Overwrite an existing user.
    fn update_user(
        &self,
        user: DirectoryUser,
    ) -> impl Future<Output = DirectoryResult<DirectoryUser>> + Send;

    /// Remove a user and all of its memberships.
    fn delete_user(&self, id: &str) -> impl Future<Output = DirectoryResult<()>> + Send;

    /// Snapshot of the tenant's members, in membership order.
    fn list_members(
        &self,
        tenant_id: &str,
    ) -> impl Future<Output = DirectoryResult<Vec<DirectoryUser>>> + Send;

    fn is_member(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> impl Future<Output = DirectoryResult<bool>> + Send;

    fn add_member(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> impl Future<Output = DirectoryResult<()>> + Send;

    fn remove_member(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> impl Future<Output = DirectoryResult<()>> + Send;

    /// External identity providers scoped to the tenant.
    fn identity_providers(
        &self,
        tenant_id: &str,
    ) -> impl Future<Output = DirectoryResult<Vec<IdentityProviderConfig>>> + Send;
}
