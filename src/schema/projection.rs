//! Response shaping per the `returned` characteristic.
//!
//! Attributes marked `never` are always removed. `attributes` and
//! `excludedAttributes` narrow the remaining set at top-level granularity;
//! a dotted name like `name.givenName` selects its parent attribute.

use super::types::{Returned, Schema};
use serde_json::Value;

/// Client-requested attribute selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSelection {
    attributes: Vec<String>,
    excluded: Vec<String>,
}

impl AttributeSelection {
    /// Build from the raw `attributes` / `excludedAttributes` query values.
    ///
    /// When both are given, `attributes` wins, as RFC 7644 says they are
    /// mutually exclusive.
    pub fn from_query(attributes: Option<&str>, excluded: Option<&str>) -> Self {
        let attributes = split_names(attributes);
        let excluded = if attributes.is_empty() {
            split_names(excluded)
        } else {
            Vec::new()
        };
        Self {
            attributes,
            excluded,
        }
    }

    fn requests(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    fn excludes(&self, name: &str) -> bool {
        self.excluded.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

fn split_names(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                // strip a schema URN prefix, keep only the top-level name
                let name = name.rsplit(':').next().unwrap_or(name);
                name.split('.').next().unwrap_or(name).to_string()
            })
            .collect()
    })
    .unwrap_or_default()
}

/// Remove attributes the response must not carry.
pub fn trim_for_response(schema: &Schema, document: &mut Value, selection: &AttributeSelection) {
    let Some(obj) = document.as_object_mut() else {
        return;
    };

    obj.retain(|key, value| {
        if key == "schemas" {
            return true;
        }
        let Some(attr_def) = schema.attribute(key) else {
            return true;
        };

        if let Some(sub_attrs) = value.as_object_mut() {
            sub_attrs.retain(|sub_key, _| {
                attr_def
                    .sub_attribute(sub_key)
                    .map(|sub| sub.returned != Returned::Never)
                    .unwrap_or(true)
            });
        }

        match attr_def.returned {
            Returned::Always => true,
            Returned::Never => false,
            Returned::Request => selection.requests(&attr_def.name),
            Returned::Default => {
                if !selection.attributes.is_empty() {
                    selection.requests(&attr_def.name)
                } else {
                    !selection.excludes(&attr_def.name)
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::AttributeDefinition;
    use serde_json::json;

    fn schema() -> Schema {
        Schema {
            id: "urn:test".to_string(),
            name: "Test".to_string(),
            description: String::new(),
            attributes: vec![
                AttributeDefinition {
                    name: "id".to_string(),
                    returned: Returned::Always,
                    ..Default::default()
                },
                AttributeDefinition {
                    name: "userName".to_string(),
                    ..Default::default()
                },
                AttributeDefinition {
                    name: "password".to_string(),
                    returned: Returned::Never,
                    ..Default::default()
                },
                AttributeDefinition {
                    name: "nickName".to_string(),
                    returned: Returned::Request,
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn test_never_attributes_are_removed() {
        let mut doc = json!({"id": "1", "userName": "a", "password": "secret"});
        trim_for_response(&schema(), &mut doc, &AttributeSelection::default());
        assert_eq!(doc, json!({"id": "1", "userName": "a"}));
    }

    #[test]
    fn test_request_attributes_need_explicit_selection() {
        let mut doc = json!({"id": "1", "userName": "a", "nickName": "n"});
        trim_for_response(&schema(), &mut doc, &AttributeSelection::default());
        assert!(doc.get("nickName").is_none());

        let mut doc = json!({"id": "1", "userName": "a", "nickName": "n"});
        let selection = AttributeSelection::from_query(Some("nickName"), None);
        trim_for_response(&schema(), &mut doc, &selection);
        assert_eq!(doc, json!({"id": "1", "nickName": "n"}));
    }

    #[test]
    fn test_always_attributes_survive_exclusion() {
        let mut doc = json!({"schemas": ["urn:test"], "id": "1", "userName": "a"});
        let selection = AttributeSelection::from_query(None, Some("id, userName"));
        trim_for_response(&schema(), &mut doc, &selection);
        assert_eq!(doc, json!({"schemas": ["urn:test"], "id": "1"}));
    }

    #[test]
    fn test_urn_qualified_selection() {
        let selection =
            AttributeSelection::from_query(Some("urn:ietf:params:scim:schemas:core:2.0:User:userName"), None);
        assert!(selection.requests("userName"));
    }
}
