//! Schema definitions, resource-type metadata and document validation.
//!
//! # Key Types
//!
//! - [`SchemaRegistry`] - the static schema and resource-type tables, built once
//! - [`ResourceTypeDefinition`] - immutable metadata for one resource type
//! - [`AttributeDefinition`] - attribute characteristics (mutability, returned, ...)
//!
//! # Examples
//!
//! ```rust
//! use scim_provisioner::schema::{ResourceKind, SchemaRegistry};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SchemaRegistry::with_embedded_schemas()?;
//! let users = registry.definition_for(ResourceKind::User)?;
//! assert_eq!(users.endpoint, "/Users");
//! # Ok(())
//! # }
//! ```

pub mod embedded;
pub mod projection;
pub mod registry;
pub mod types;
pub mod validation;


pub use projection::{AttributeSelection, trim_for_response};
pub use registry::SchemaRegistry;
pub use types::{
    AttributeDefinition, AttributeType, Mutability, ResourceKind, ResourceTypeDefinition, Returned,
    Schema, SchemaExtension, Uniqueness,
};

pub const USER_SCHEMA_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
pub const SCHEMA_SCHEMA_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:Schema";
pub const RESOURCE_TYPE_SCHEMA_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:ResourceType";
pub const SERVICE_PROVIDER_CONFIG_SCHEMA_URN: &str =
    "urn:ietf:params:scim:schemas:core:2.0:ServiceProviderConfig";
pub const LIST_RESPONSE_URN: &str = "urn:ietf:params:scim:api:messages:2.0:ListResponse";
pub const ERROR_URN: &str = "urn:ietf:params:scim:api:messages:2.0:Error";
pub const PATCH_OP_URN: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";
