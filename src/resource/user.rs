//! Typed SCIM User document.
//!
//! This is the shape every User request body and response is parsed into
//! after schema validation. Parsing into it is the second pass of PATCH, so
//! a document that fails here after mutation is a server-side fault.

use crate::schema::USER_SCHEMA_URN;
use serde::{Deserialize, Deserializer, Serialize};

/// A SCIM 2.0 User resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimUserDocument {
    #[serde(default = "default_schemas")]
    pub schemas: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Name>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub emails: Vec<Email>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub roles: Vec<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

fn default_schemas() -> Vec<String> {
    vec![USER_SCHEMA_URN.to_string()]
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ScimUserDocument {
    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            schemas: default_schemas(),
            id: None,
            external_id: None,
            user_name: user_name.into(),
            name: None,
            active: None,
            emails: Vec::new(),
            roles: Vec::new(),
            meta: None,
        }
    }

    /// The primary email, or the first one listed.
    pub fn primary_email(&self) -> Option<&str> {
        self.emails
            .iter()
            .find(|e| e.primary == Some(true))
            .or_else(|| self.emails.first())
            .map(|e| e.value.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Domain part of [`primary_email`](Self::primary_email), lowercased.
    pub fn email_domain(&self) -> Option<String> {
        self.primary_email()
            .and_then(|email| email.rsplit_once('@'))
            .map(|(_, domain)| domain.trim().to_ascii_lowercase())
            .filter(|domain| !domain.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Name {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub email_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
}

/// A role entry. Stored losslessly, so every field the client sent comes back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub role_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
}

impl Role {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            display: None,
            role_type: None,
            primary: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_document() {
        let doc: ScimUserDocument = serde_json::from_value(json!({"userName": "alice"})).unwrap();
        assert_eq!(doc.schemas, vec![USER_SCHEMA_URN.to_string()]);
        assert!(doc.emails.is_empty());
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({"schemas": [USER_SCHEMA_URN], "userName": "alice"})
        );
    }

    #[test]
    fn test_null_lists_read_as_empty() {
        let doc: ScimUserDocument =
            serde_json::from_value(json!({"userName": "a", "emails": null, "roles": null}))
                .unwrap();
        assert!(doc.emails.is_empty());
        assert!(doc.roles.is_empty());
    }

    #[test]
    fn test_role_without_value_is_rejected() {
        let result: Result<ScimUserDocument, _> =
            serde_json::from_value(json!({"userName": "a", "roles": [{"display": "Admin"}]}));
        assert!(result.is_err());
    }

    #[test]
    fn test_primary_email_and_domain() {
        let doc: ScimUserDocument = serde_json::from_value(json!({
            "userName": "a",
            "emails": [
                {"value": "a@home.example"},
                {"value": "a@Corp.Example", "primary": true}
            ]
        }))
        .unwrap();
        assert_eq!(doc.primary_email(), Some("a@Corp.Example"));
        assert_eq!(doc.email_domain().as_deref(), Some("corp.example"));

        assert_eq!(ScimUserDocument::new("b").email_domain(), None);
    }
}
