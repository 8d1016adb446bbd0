//! Static declaration tables: embedded core schemas and the resource types
//! that expose them.
//!
//! Schemas are embedded as RFC 7643 JSON and parsed once by the registry;
//! resource types are a plain Rust table.

use super::types::ResourceKind;
use super::{
    RESOURCE_TYPE_SCHEMA_URN, SCHEMA_SCHEMA_URN, SERVICE_PROVIDER_CONFIG_SCHEMA_URN,
    USER_SCHEMA_URN,
};

/// Static resource-type declaration, validated when the registry is built.
#[derive(Debug, Clone, Copy)]
pub struct ResourceTypeDeclaration {
    pub kind: ResourceKind,
    pub name: &'static str,
    pub endpoint: &'static str,
    pub description: &'static str,
    pub schema: &'static str,
    /// `(schema URN, required)` pairs
    pub extensions: &'static [(&'static str, bool)],
    pub discoverable: bool,
}

/// Every resource type the server knows about. Fixed for the process lifetime.
pub const RESOURCE_TYPES: &[ResourceTypeDeclaration] = &[
    ResourceTypeDeclaration {
        kind: ResourceKind::User,
        name: "User",
        endpoint: "/Users",
        description: "User Account",
        schema: USER_SCHEMA_URN,
        extensions: &[],
        discoverable: true,
    },
    ResourceTypeDeclaration {
        kind: ResourceKind::Schema,
        name: "Schema",
        endpoint: "/Schemas",
        description: "Schema definitions supported by this service provider",
        schema: SCHEMA_SCHEMA_URN,
        extensions: &[],
        discoverable: false,
    },
    ResourceTypeDeclaration {
        kind: ResourceKind::ResourceType,
        name: "ResourceType",
        endpoint: "/ResourceTypes",
        description: "Resource types supported by this service provider",
        schema: RESOURCE_TYPE_SCHEMA_URN,
        extensions: &[],
        discoverable: false,
    },
    ResourceTypeDeclaration {
        kind: ResourceKind::ServiceProviderConfig,
        name: "ServiceProviderConfig",
        endpoint: "/ServiceProviderConfig",
        description: "Service provider configuration",
        schema: SERVICE_PROVIDER_CONFIG_SCHEMA_URN,
        extensions: &[],
        discoverable: false,
    },
];

/// All embedded schemas, in the order `/Schemas` lists them.
pub fn all_schemas() -> [&'static str; 4] {
    [
        core_user_schema(),
        service_provider_config_schema(),
        resource_type_schema(),
        schema_schema(),
    ]
}

/// The core User schema, restricted to the attributes this server maps onto
/// directory users.
pub fn core_user_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:core:2.0:User",
  "name": "User",
  "description": "User Account",
  "attributes": [
    {
      "name": "id",
      "type": "string",
      "description": "Unique identifier for the user, assigned by the service provider.",
      "caseExact": true,
      "mutability": "readOnly",
      "returned": "always",
      "uniqueness": "server"
    },
    {
      "name": "externalId",
      "type": "string",
      "description": "Identifier for the user as defined by the provisioning client.",
      "caseExact": true,
      "mutability": "readWrite",
      "returned": "default",
      "uniqueness": "none"
    },
    {
      "name": "userName",
      "type": "string",
      "description": "Unique identifier for the user, typically used to authenticate.",
      "required": true,
      "mutability": "readWrite",
      "returned": "default",
      "uniqueness": "server"
    },
    {
      "name": "name",
      "type": "complex",
      "description": "The components of the user's real name.",
      "mutability": "readWrite",
      "returned": "default",
      "subAttributes": [
        {
          "name": "givenName",
          "type": "string",
          "description": "The given name of the user.",
          "mutability": "readWrite",
          "returned": "default"
        },
        {
          "name": "familyName",
          "type": "string",
          "description": "The family name of the user.",
          "mutability": "readWrite",
          "returned": "default"
        }
      ]
    },
    {
      "name": "active",
      "type": "boolean",
      "description": "The user's administrative status.",
      "mutability": "readWrite",
      "returned": "default"
    },
    {
      "name": "emails",
      "type": "complex",
      "multiValued": true,
      "description": "Email addresses for the user.",
      "mutability": "readWrite",
      "returned": "default",
      "subAttributes": [
        {
          "name": "value",
          "type": "string",
          "description": "Email address for the user.",
          "mutability": "readWrite",
          "returned": "default"
        },
        {
          "name": "display",
          "type": "string",
          "mutability": "readWrite",
          "returned": "default"
        },
        {
          "name": "type",
          "type": "string",
          "canonicalValues": ["work", "home", "other"],
          "mutability": "readWrite",
          "returned": "default"
        },
        {
          "name": "primary",
          "type": "boolean",
          "mutability": "readWrite",
          "returned": "default"
        }
      ]
    },
    {
      "name": "roles",
      "type": "complex",
      "multiValued": true,
      "description": "A list of roles for the user.",
      "mutability": "readWrite",
      "returned": "default",
      "subAttributes": [
        {
          "name": "value",
          "type": "string",
          "description": "The value of a role.",
          "mutability": "readWrite",
          "returned": "default"
        },
        {
          "name": "display",
          "type": "string",
          "mutability": "readWrite",
          "returned": "default"
        },
        {
          "name": "type",
          "type": "string",
          "mutability": "readWrite",
          "returned": "default"
        },
        {
          "name": "primary",
          "type": "boolean",
          "mutability": "readWrite",
          "returned": "default"
        }
      ]
    },
    {
      "name": "meta",
      "type": "complex",
      "description": "Resource metadata maintained by the service provider.",
      "mutability": "readOnly",
      "returned": "default",
      "subAttributes": [
        { "name": "resourceType", "type": "string", "caseExact": true, "mutability": "readOnly" },
        { "name": "created", "type": "dateTime", "mutability": "readOnly" },
        { "name": "lastModified", "type": "dateTime", "mutability": "readOnly" },
        { "name": "location", "type": "reference", "caseExact": true, "mutability": "readOnly" },
        { "name": "version", "type": "string", "caseExact": true, "mutability": "readOnly" }
      ]
    }
  ]
}"#
}

pub fn service_provider_config_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:core:2.0:ServiceProviderConfig",
  "name": "Service Provider Configuration",
  "description": "Schema for representing the service provider's configuration",
  "attributes": [
    { "name": "documentationUri", "type": "reference", "mutability": "readOnly" },
    {
      "name": "patch", "type": "complex", "required": true, "mutability": "readOnly",
      "subAttributes": [
        { "name": "supported", "type": "boolean", "required": true, "mutability": "readOnly" }
      ]
    },
    {
      "name": "bulk", "type": "complex", "required": true, "mutability": "readOnly",
      "subAttributes": [
        { "name": "supported", "type": "boolean", "required": true, "mutability": "readOnly" },
        { "name": "maxOperations", "type": "integer", "required": true, "mutability": "readOnly" },
        { "name": "maxPayloadSize", "type": "integer", "required": true, "mutability": "readOnly" }
      ]
    },
    {
      "name": "filter", "type": "complex", "required": true, "mutability": "readOnly",
      "subAttributes": [
        { "name": "supported", "type": "boolean", "required": true, "mutability": "readOnly" },
        { "name": "maxResults", "type": "integer", "required": true, "mutability": "readOnly" }
      ]
    },
    {
      "name": "changePassword", "type": "complex", "required": true, "mutability": "readOnly",
      "subAttributes": [
        { "name": "supported", "type": "boolean", "required": true, "mutability": "readOnly" }
      ]
    },
    {
      "name": "sort", "type": "complex", "required": true, "mutability": "readOnly",
      "subAttributes": [
        { "name": "supported", "type": "boolean", "required": true, "mutability": "readOnly" }
      ]
    },
    {
      "name": "etag", "type": "complex", "required": true, "mutability": "readOnly",
      "subAttributes": [
        { "name": "supported", "type": "boolean", "required": true, "mutability": "readOnly" }
      ]
    },
    {
      "name": "authenticationSchemes", "type": "complex", "multiValued": true, "required": true,
      "mutability": "readOnly",
      "subAttributes": [
        { "name": "type", "type": "string", "required": true, "mutability": "readOnly" },
        { "name": "name", "type": "string", "required": true, "mutability": "readOnly" },
        { "name": "description", "type": "string", "required": true, "mutability": "readOnly" },
        { "name": "specUri", "type": "reference", "mutability": "readOnly" },
        { "name": "documentationUri", "type": "reference", "mutability": "readOnly" },
        { "name": "primary", "type": "boolean", "mutability": "readOnly" }
      ]
    }
  ]
}"#
}

pub fn resource_type_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:core:2.0:ResourceType",
  "name": "ResourceType",
  "description": "Specifies the schema that describes a SCIM resource type",
  "attributes": [
    { "name": "id", "type": "string", "caseExact": true, "mutability": "readOnly" },
    { "name": "name", "type": "string", "required": true, "mutability": "readOnly" },
    { "name": "description", "type": "string", "mutability": "readOnly" },
    { "name": "endpoint", "type": "reference", "required": true, "caseExact": true, "mutability": "readOnly" },
    { "name": "schema", "type": "reference", "required": true, "caseExact": true, "mutability": "readOnly" },
    {
      "name": "schemaExtensions", "type": "complex", "multiValued": true, "mutability": "readOnly",
      "subAttributes": [
        { "name": "schema", "type": "reference", "required": true, "caseExact": true, "mutability": "readOnly" },
        { "name": "required", "type": "boolean", "required": true, "mutability": "readOnly" }
      ]
    }
  ]
}"#
}

pub fn schema_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:core:2.0:Schema",
  "name": "Schema",
  "description": "Specifies the schema attribute structure of a SCIM resource",
  "attributes": [
    { "name": "id", "type": "reference", "required": true, "caseExact": true, "mutability": "readOnly" },
    { "name": "name", "type": "string", "mutability": "readOnly" },
    { "name": "description", "type": "string", "mutability": "readOnly" },
    {
      "name": "attributes", "type": "complex", "multiValued": true, "required": true,
      "mutability": "readOnly",
      "subAttributes": [
        { "name": "name", "type": "string", "required": true, "caseExact": true, "mutability": "readOnly" },
        { "name": "type", "type": "string", "required": true, "mutability": "readOnly" },
        { "name": "multiValued", "type": "boolean", "required": true, "mutability": "readOnly" },
        { "name": "description", "type": "string", "mutability": "readOnly" },
        { "name": "required", "type": "boolean", "mutability": "readOnly" },
        { "name": "canonicalValues", "type": "string", "multiValued": true, "mutability": "readOnly" },
        { "name": "caseExact", "type": "boolean", "mutability": "readOnly" },
        { "name": "mutability", "type": "string", "mutability": "readOnly" },
        { "name": "returned", "type": "string", "mutability": "readOnly" },
        { "name": "uniqueness", "type": "string", "mutability": "readOnly" },
        { "name": "subAttributes", "type": "complex", "multiValued": true, "mutability": "readOnly" }
      ]
    }
  ]
}"#
}
