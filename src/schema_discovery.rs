//! Discovery documents: `/Schemas`, `/ResourceTypes` and `/ServiceProviderConfig`.
//!
//! Discovery is read-only and deliberately unfilterable; any `filter`
//! parameter is refused by the registry with `403 Forbidden`.

use crate::error::{ScimError, ScimResult};
use crate::schema::{
    RESOURCE_TYPE_SCHEMA_URN, ResourceKind, ResourceTypeDefinition, SCHEMA_SCHEMA_URN,
    SERVICE_PROVIDER_CONFIG_SCHEMA_URN, Schema, SchemaRegistry,
};
use crate::search::SearchResult;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

/// Service provider configuration as defined in RFC 7643 Section 5.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_uri: Option<String>,
    pub patch: Supported,
    pub bulk: BulkCapability,
    pub filter: FilterCapability,
    pub change_password: Supported,
    pub sort: Supported,
    pub etag: Supported,
    pub authentication_schemes: Vec<AuthenticationScheme>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Supported {
    pub supported: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BulkCapability {
    pub supported: bool,
    pub max_operations: u32,
    pub max_payload_size: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FilterCapability {
    pub supported: bool,
    pub max_results: u32,
}

/// Authentication scheme definition for service provider config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationScheme {
    #[serde(rename = "type")]
    pub auth_type: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_uri: Option<String>,
    pub primary: bool,
}

impl Default for ServiceProviderConfig {
    fn default() -> Self {
        Self {
            documentation_uri: None,
            patch: Supported { supported: true },
            // advertised but unused
            bulk: BulkCapability {
                supported: false,
                max_operations: 1000,
                max_payload_size: 1_048_567,
            },
            filter: FilterCapability {
                supported: true,
                max_results: 200,
            },
            change_password: Supported { supported: false },
            sort: Supported { supported: true },
            etag: Supported { supported: true },
            authentication_schemes: vec![AuthenticationScheme {
                auth_type: "oauthbearertoken".to_string(),
                name: "OAuth Bearer Token".to_string(),
                description: "Authentication scheme using the OAuth Bearer Token Standard"
                    .to_string(),
                spec_uri: Some("http://www.rfc-editor.org/info/rfc6750".to_string()),
                documentation_uri: None,
                primary: true,
            }],
        }
    }
}

/// Renders discovery resources for one tenant root.
#[derive(Debug, Clone)]
pub struct SchemaDiscovery {
    registry: Arc<SchemaRegistry>,
    config: ServiceProviderConfig,
}

impl SchemaDiscovery {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self::with_config(registry, ServiceProviderConfig::default())
    }

    pub fn with_config(registry: Arc<SchemaRegistry>, config: ServiceProviderConfig) -> Self {
        Self { registry, config }
    }

    pub fn service_config(&self) -> &ServiceProviderConfig {
        &self.config
    }

    pub fn list_schemas(
        &self,
        filter: Option<&str>,
        base_location: &str,
    ) -> ScimResult<SearchResult<Value>> {
        let schemas = self.registry.list_schemas(filter)?;
        let rendered = schemas
            .into_iter()
            .map(|schema| self.render_schema(schema, base_location))
            .collect::<ScimResult<Vec<_>>>()?;
        Ok(SearchResult::unpaged(rendered))
    }

    pub fn get_schema(&self, key: &str, base_location: &str) -> ScimResult<Value> {
        let schema = self.registry.schema_by_id_or_name(key)?;
        self.render_schema(schema, base_location)
    }

    pub fn list_resource_types(
        &self,
        filter: Option<&str>,
        base_location: &str,
    ) -> ScimResult<SearchResult<Value>> {
        let types = self.registry.list_resource_types(filter)?;
        let rendered = types
            .into_iter()
            .map(|rt| self.render_resource_type(rt, base_location))
            .collect::<ScimResult<Vec<_>>>()?;
        Ok(SearchResult::unpaged(rendered))
    }

    pub fn get_resource_type(&self, key: &str, base_location: &str) -> ScimResult<Value> {
        let resource_type = self.registry.resource_type_by_id_or_name(key)?;
        self.render_resource_type(resource_type, base_location)
    }

    pub fn service_provider_config(&self, base_location: &str) -> ScimResult<Value> {
        let mut document = serde_json::to_value(&self.config)
            .map_err(|e| ScimError::internal(format!("Failed to render configuration: {}", e)))?;
        if let Some(obj) = document.as_object_mut() {
            obj.insert(
                "schemas".to_string(),
                json!([SERVICE_PROVIDER_CONFIG_SCHEMA_URN]),
            );
            obj.insert(
                "meta".to_string(),
                self.meta(ResourceKind::ServiceProviderConfig, None, base_location)?,
            );
        }
        Ok(document)
    }

    fn render_schema(&self, schema: &Schema, base_location: &str) -> ScimResult<Value> {
        let mut document = serde_json::to_value(schema)
            .map_err(|e| ScimError::internal(format!("Failed to render schema: {}", e)))?;
        if let Some(obj) = document.as_object_mut() {
            obj.insert("schemas".to_string(), json!([SCHEMA_SCHEMA_URN]));
            obj.insert(
                "meta".to_string(),
                self.meta(ResourceKind::Schema, Some(&schema.id), base_location)?,
            );
        }
        Ok(document)
    }

    fn render_resource_type(
        &self,
        resource_type: &ResourceTypeDefinition,
        base_location: &str,
    ) -> ScimResult<Value> {
        Ok(json!({
            "schemas": [RESOURCE_TYPE_SCHEMA_URN],
            "id": resource_type.name,
            "name": resource_type.name,
            "endpoint": resource_type.endpoint,
            "description": resource_type.description,
            "schema": resource_type.schema,
            "schemaExtensions": resource_type.schema_extensions,
            "meta": self.meta(ResourceKind::ResourceType, Some(&resource_type.name), base_location)?,
        }))
    }

    fn meta(&self, kind: ResourceKind, id: Option<&str>, base_location: &str) -> ScimResult<Value> {
        let definition = self.registry.definition_for(kind)?;
        let mut location = format!(
            "{}{}",
            base_location.trim_end_matches('/'),
            definition.endpoint
        );
        if let Some(id) = id {
            location.push('/');
            location.push_str(id);
        }
        Ok(json!({
            "resourceType": definition.name,
            "location": location,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::USER_SCHEMA_URN;

    const BASE: &str = "https://scim.example.com/scim/v2/acme";

    fn discovery() -> SchemaDiscovery {
        SchemaDiscovery::new(Arc::new(SchemaRegistry::with_embedded_schemas().unwrap()))
    }

    #[test]
    fn test_service_provider_config_capabilities() {
        let document = discovery().service_provider_config(BASE).unwrap();
        assert_eq!(document["patch"]["supported"], true);
        assert_eq!(document["bulk"]["supported"], false);
        assert_eq!(document["bulk"]["maxOperations"], 1000);
        assert_eq!(document["bulk"]["maxPayloadSize"], 1_048_567);
        assert_eq!(document["filter"]["maxResults"], 200);
        assert_eq!(document["changePassword"]["supported"], false);
        assert_eq!(document["sort"]["supported"], true);
        assert_eq!(document["etag"]["supported"], true);

        let schemes = document["authenticationSchemes"].as_array().unwrap();
        assert_eq!(schemes.len(), 1);
        assert_eq!(schemes[0]["type"], "oauthbearertoken");
        assert_eq!(schemes[0]["primary"], true);

        assert_eq!(
            document["meta"]["location"],
            format!("{}/ServiceProviderConfig", BASE)
        );
    }

    #[test]
    fn test_schema_lookup_by_id_or_name() {
        let by_id = discovery().get_schema(USER_SCHEMA_URN, BASE).unwrap();
        let by_name = discovery().get_schema("User", BASE).unwrap();
        assert_eq!(by_id, by_name);
        assert_eq!(by_id["meta"]["resourceType"], "Schema");
        assert_eq!(
            by_id["meta"]["location"],
            format!("{}/Schemas/{}", BASE, USER_SCHEMA_URN)
        );

        let err = discovery().get_schema("Group", BASE).unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_resource_types_list_only_discoverable() {
        let list = discovery().list_resource_types(None, BASE).unwrap();
        assert_eq!(list.total_results, 1);
        assert_eq!(list.resources[0]["endpoint"], "/Users");
        assert_eq!(list.resources[0]["meta"]["resourceType"], "ResourceType");
    }

    #[test]
    fn test_filters_are_forbidden() {
        for filter in ["id eq \"x\"", "garbage ((", "name pr"] {
            let err = discovery().list_schemas(Some(filter), BASE).unwrap_err();
            assert_eq!(err.status_code(), 403);
            let err = discovery().list_resource_types(Some(filter), BASE).unwrap_err();
            assert_eq!(err.status_code(), 403);
        }
    }
}
