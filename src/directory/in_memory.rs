//! In-memory directory implementation.
//!
//! Thread-safe via a tokio `RwLock` over plain maps. Intended for development
//! servers and tests; nothing is persisted.
//!
//! ```rust
//! use scim_provisioner::directory::{DirectoryUser, InMemoryDirectory, UserDirectory};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let directory = InMemoryDirectory::new();
//! let user = directory.create_user(DirectoryUser::new("alice")).await?;
//! directory.add_member("acme", &user.id).await?;
//!
//! assert!(directory.is_member("acme", &user.id).await?);
//! assert_eq!(directory.list_members("acme").await?.len(), 1);
//! # Ok(())
//! # }
//! ```

use super::{
    DirectoryError, DirectoryResult, DirectoryUser, IdentityProviderConfig, UserDirectory,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe in-memory directory.
#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    data: Arc<RwLock<DirectoryData>>,
}

#[derive(Default)]
struct DirectoryData {
    users: HashMap<String, DirectoryUser>,
    // tenant_id -> member user ids, in the order they joined
    members: HashMap<String, Vec<String>>,
    identity_providers: Vec<IdentityProviderConfig>,
    revision: u64,
}

/// Counters for debugging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InMemoryDirectoryStats {
    pub user_count: usize,
    pub membership_count: usize,
    /// Incremented by every successful mutation
    pub revision: u64,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an identity provider.
    pub async fn add_identity_provider(&self, provider: IdentityProviderConfig) {
        let mut data = self.data.write().await;
        data.identity_providers
            .retain(|p| !(p.alias == provider.alias && p.tenant_id == provider.tenant_id));
        data.identity_providers.push(provider);
        data.revision += 1;
    }

    pub async fn stats(&self) -> InMemoryDirectoryStats {
        let data = self.data.read().await;
        InMemoryDirectoryStats {
            user_count: data.users.len(),
            membership_count: data.members.values().map(Vec::len).sum(),
            revision: data.revision,
        }
    }
}

impl std::fmt::Debug for InMemoryDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDirectory").finish_non_exhaustive()
    }
}

fn username_taken(data: &DirectoryData, username: &str, except_id: Option<&str>) -> bool {
    data.users.values().any(|u| {
        u.username.eq_ignore_ascii_case(username) && Some(u.id.as_str()) != except_id
    })
}

impl UserDirectory for InMemoryDirectory {
    async fn get_user(&self, id: &str) -> DirectoryResult<Option<DirectoryUser>> {
        let data = self.data.read().await;
        Ok(data.users.get(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> DirectoryResult<Option<DirectoryUser>> {
        let data = self.data.read().await;
        Ok(data
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn create_user(&self, mut user: DirectoryUser) -> DirectoryResult<DirectoryUser> {
        let mut data = self.data.write().await;
        if username_taken(&data, &user.username, None) {
            return Err(DirectoryError::DuplicateUsername {
                username: user.username,
            });
        }
        let now = Utc::now();
        user.created = now;
        user.last_modified = now;
        data.users.insert(user.id.clone(), user.clone());
        data.revision += 1;
        Ok(user)
    }

    async fn update_user(&self, mut user: DirectoryUser) -> DirectoryResult<DirectoryUser> {
        let mut data = self.data.write().await;
        if !data.users.contains_key(&user.id) {
            return Err(DirectoryError::UserNotFound { id: user.id });
        }
        if username_taken(&data, &user.username, Some(&user.id)) {
            return Err(DirectoryError::DuplicateUsername {
                username: user.username,
            });
        }
        user.last_modified = Utc::now();
        data.users.insert(user.id.clone(), user.clone());
        data.revision += 1;
        Ok(user)
    }

    async fn delete_user(&self, id: &str) -> DirectoryResult<()> {
        let mut data = self.data.write().await;
        if data.users.remove(id).is_none() {
            return Err(DirectoryError::UserNotFound { id: id.to_string() });
        }
        for members in data.members.values_mut() {
            members.retain(|member| member != id);
        }
        data.revision += 1;
        Ok(())
    }

    async fn list_members(&self, tenant_id: &str) -> DirectoryResult<Vec<DirectoryUser>> {
        let data = self.data.read().await;
        Ok(data
            .members
            .get(tenant_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| data.users.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn is_member(&self, tenant_id: &str, user_id: &str) -> DirectoryResult<bool> {
        let data = self.data.read().await;
        Ok(data
            .members
            .get(tenant_id)
            .map(|ids| ids.iter().any(|id| id == user_id))
            .unwrap_or(false))
    }

    async fn add_member(&self, tenant_id: &str, user_id: &str) -> DirectoryResult<()> {
        let mut data = self.data.write().await;
        if !data.users.contains_key(user_id) {
            return Err(DirectoryError::UserNotFound {
                id: user_id.to_string(),
            });
        }
        let members = data.members.entry(tenant_id.to_string()).or_default();
        if !members.iter().any(|id| id == user_id) {
            members.push(user_id.to_string());
            data.revision += 1;
        }
        Ok(())
    }

    async fn remove_member(&self, tenant_id: &str, user_id: &str) -> DirectoryResult<()> {
        let mut data = self.data.write().await;
        let removed = match data.members.get_mut(tenant_id) {
            Some(members) => {
                let before = members.len();
                members.retain(|id| id != user_id);
                members.len() != before
            }
            None => false,
        };
        if removed {
            data.revision += 1;
        }
        Ok(())
    }

    async fn identity_providers(&self, tenant_id: &str) -> DirectoryResult<Vec<IdentityProviderConfig>> {
        let data = self.data.read().await;
        Ok(data
            .identity_providers
            .iter()
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .collect())
    }
}
