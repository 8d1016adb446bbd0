//! Mapping between directory user records and SCIM User documents.
//!
//! | SCIM | directory |
//! |---|---|
//! | `userName` | `username` |
//! | `active` | `enabled` |
//! | `name.givenName` / `name.familyName` | `first_name` / `last_name` |
//! | primary (or first) `emails` value | `email` |
//! | `externalId` | attribute `scim.externalId` |
//! | `roles` | attributes `scim.roles.raw` (JSON) and `scim.roles` (values) |
//!
//! Roles are written twice on every mutation. The raw attribute keeps the
//! exact list the client sent so it can be returned unchanged; the flattened
//! one holds only the `value` fields for directory-side lookups.

use super::user::{Email, Meta, Name, Role, ScimUserDocument};
use crate::directory::DirectoryUser;
use crate::error::{ScimError, ScimResult};
use crate::schema::USER_SCHEMA_URN;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::SecondsFormat;
use serde_json::Value;
use sha2::{Digest, Sha256};

pub const EXTERNAL_ID_ATTRIBUTE: &str = "scim.externalId";
pub const ROLES_RAW_ATTRIBUTE: &str = "scim.roles.raw";
pub const ROLES_ATTRIBUTE: &str = "scim.roles";

const USERS_ENDPOINT: &str = "/Users";

/// Converts between [`DirectoryUser`] and [`ScimUserDocument`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceTranslator;

impl ResourceTranslator {
    /// Render a directory user, including `meta` but without `meta.location`.
    pub fn to_document(user: &DirectoryUser) -> ScimUserDocument {
        let name = if user.first_name.is_some() || user.last_name.is_some() {
            Some(Name {
                given_name: user.first_name.clone(),
                family_name: user.last_name.clone(),
            })
        } else {
            None
        };

        let emails = user
            .email
            .iter()
            .map(|value| Email {
                value: value.clone(),
                display: None,
                email_type: None,
                primary: Some(true),
            })
            .collect();

        let mut document = ScimUserDocument {
            schemas: vec![USER_SCHEMA_URN.to_string()],
            id: Some(user.id.clone()),
            external_id: user.first_attribute(EXTERNAL_ID_ATTRIBUTE).map(str::to_string),
            user_name: user.username.clone(),
            name,
            active: Some(user.enabled),
            emails,
            roles: Self::roles_of(user),
            meta: None,
        };

        let version = Self::version_of(&document);
        document.meta = Some(Meta {
            resource_type: Some("User".to_string()),
            created: Some(user.created.to_rfc3339_opts(SecondsFormat::Millis, true)),
            last_modified: Some(user.last_modified.to_rfc3339_opts(SecondsFormat::Millis, true)),
            location: None,
            version: Some(version),
        });
        document
    }

    /// Render a directory user as JSON with `meta.location` under `base_location`.
    pub fn to_value(user: &DirectoryUser, base_location: &str) -> ScimResult<Value> {
        let mut document = Self::to_document(user);
        if let Some(meta) = document.meta.as_mut() {
            meta.location = Some(Self::location(base_location, &user.id));
        }
        serde_json::to_value(&document)
            .map_err(|e| ScimError::internal(format!("Failed to render user {}: {}", user.id, e)))
    }

    /// `{base}/Users/{id}`
    pub fn location(base_location: &str, id: &str) -> String {
        format!("{}{}/{}", base_location.trim_end_matches('/'), USERS_ENDPOINT, id)
    }

    /// Apply a validated document to a directory user.
    ///
    /// Directory roles (including the managed marker) are left alone; only the
    /// SCIM role attributes are rewritten.
    pub fn apply(
        document: &ScimUserDocument,
        user: &mut DirectoryUser,
        email_as_username: bool,
    ) -> ScimResult<()> {
        user.username = document.user_name.clone();
        user.enabled = document.active.unwrap_or(true);
        user.first_name = document.name.as_ref().and_then(|n| n.given_name.clone());
        user.last_name = document.name.as_ref().and_then(|n| n.family_name.clone());

        user.email = match document.primary_email() {
            Some(email) => Some(email.to_string()),
            None if email_as_username && document.user_name.contains('@') => {
                Some(document.user_name.clone())
            }
            None => None,
        };

        user.set_attribute(
            EXTERNAL_ID_ATTRIBUTE,
            document.external_id.iter().cloned().collect(),
        );

        let (raw, flattened) = if document.roles.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            let raw = serde_json::to_string(&document.roles)
                .map_err(|e| ScimError::internal(format!("Failed to encode roles: {}", e)))?;
            let flattened = document.roles.iter().map(|r| r.value.clone()).collect();
            (vec![raw], flattened)
        };
        user.set_attribute(ROLES_RAW_ATTRIBUTE, raw);
        user.set_attribute(ROLES_ATTRIBUTE, flattened);
        Ok(())
    }

    fn roles_of(user: &DirectoryUser) -> Vec<Role> {
        if let Some(raw) = user.first_attribute(ROLES_RAW_ATTRIBUTE) {
            match serde_json::from_str::<Vec<Role>>(raw) {
                Ok(roles) => return roles,
                Err(e) => log::warn!(
                    "Ignoring unreadable role shadow on user '{}': {}",
                    user.id,
                    e
                ),
            }
        }
        user.attribute(ROLES_ATTRIBUTE)
            .unwrap_or_default()
            .iter()
            .map(Role::new)
            .collect()
    }

    /// Weak ETag over the document body, excluding `meta`.
    fn version_of(document: &ScimUserDocument) -> String {
        let content = serde_json::to_vec(document).unwrap_or_default();
        let hash = Sha256::digest(&content);
        format!("W/\"{}\"", BASE64.encode(&hash[..8]))
    }
}
