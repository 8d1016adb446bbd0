//! Schema registry for the static schema and resource-type tables.
//!
//! The registry is built once at startup and shared by reference. Building it
//! validates every resource-type declaration so that a broken table fails the
//! process instead of a request.

use super::embedded::{self, ResourceTypeDeclaration};
use super::types::{ResourceKind, ResourceTypeDefinition, Schema, SchemaExtension};
use crate::error::{ConfigurationError, ConfigurationResult, ScimError, ScimResult};

/// Registry of SCIM schemas and resource types.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: Vec<Schema>,
    resource_types: Vec<ResourceTypeDefinition>,
}

impl SchemaRegistry {
    /// Create a registry from the embedded schemas and resource-type table.
    pub fn with_embedded_schemas() -> ConfigurationResult<Self> {
        let schemas = embedded::all_schemas()
            .into_iter()
            .map(Self::load_schema_from_str)
            .collect::<ConfigurationResult<Vec<_>>>()?;

        Self::from_declarations(schemas, embedded::RESOURCE_TYPES)
    }

    /// Create a registry from explicit tables.
    ///
    /// Fails if a declaration lacks a name, endpoint or schema, or references a
    /// schema that is not in `schemas`.
    pub fn from_declarations(
        schemas: Vec<Schema>,
        declarations: &[ResourceTypeDeclaration],
    ) -> ConfigurationResult<Self> {
        let mut resource_types = Vec::with_capacity(declarations.len());

        for declaration in declarations {
            let label = if declaration.name.is_empty() {
                declaration.kind.to_string()
            } else {
                declaration.name.to_string()
            };

            for (field, value) in [
                ("name", declaration.name),
                ("endpoint", declaration.endpoint),
                ("schema", declaration.schema),
            ] {
                if value.trim().is_empty() {
                    return Err(ConfigurationError::IncompleteResourceType {
                        name: label,
                        field,
                    });
                }
            }

            let referenced = std::iter::once(declaration.schema)
                .chain(declaration.extensions.iter().map(|(uri, _)| *uri));
            for schema_id in referenced {
                if !schemas.iter().any(|s| s.id == schema_id) {
                    return Err(ConfigurationError::UnknownSchema {
                        resource_type: label,
                        schema_id: schema_id.to_string(),
                    });
                }
            }

            resource_types.push(ResourceTypeDefinition {
                kind: declaration.kind,
                name: declaration.name.to_string(),
                endpoint: declaration.endpoint.to_string(),
                description: declaration.description.to_string(),
                schema: declaration.schema.to_string(),
                schema_extensions: declaration
                    .extensions
                    .iter()
                    .map(|(schema, required)| SchemaExtension {
                        schema: schema.to_string(),
                        required: *required,
                    })
                    .collect(),
                discoverable: declaration.discoverable,
            });
        }

        log::debug!(
            "Schema registry built with {} schemas and {} resource types",
            schemas.len(),
            resource_types.len()
        );

        Ok(Self {
            schemas,
            resource_types,
        })
    }

    fn load_schema_from_str(content: &str) -> ConfigurationResult<Schema> {
        serde_json::from_str(content).map_err(|e| ConfigurationError::InvalidSchema {
            message: e.to_string(),
        })
    }

    /// Resource-type definition for `kind`.
    pub fn definition_for(&self, kind: ResourceKind) -> ConfigurationResult<&ResourceTypeDefinition> {
        self.resource_types
            .iter()
            .find(|rt| rt.kind == kind)
            .ok_or_else(|| ConfigurationError::MissingResourceType {
                kind: kind.to_string(),
            })
    }

    /// Core schema of the resource type declared for `kind`.
    pub fn schema_for(&self, kind: ResourceKind) -> ConfigurationResult<&Schema> {
        let definition = self.definition_for(kind)?;
        self.get_schema(&definition.schema)
            .ok_or_else(|| ConfigurationError::UnknownSchema {
                resource_type: definition.name.clone(),
                schema_id: definition.schema.clone(),
            })
    }

    /// Get a specific schema by URN.
    pub fn get_schema(&self, id: &str) -> Option<&Schema> {
        self.schemas.iter().find(|s| s.id == id)
    }

    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    pub fn resource_types(&self) -> &[ResourceTypeDefinition] {
        &self.resource_types
    }

    /// Schemas served by `/Schemas`.
    ///
    /// Discovery does not support filtering: any non-empty filter is refused.
    pub fn list_schemas(&self, filter: Option<&str>) -> ScimResult<Vec<&Schema>> {
        reject_filter(filter, "Schemas")?;
        Ok(self.schemas.iter().collect())
    }

    /// Discoverable resource types served by `/ResourceTypes`.
    pub fn list_resource_types(
        &self,
        filter: Option<&str>,
    ) -> ScimResult<Vec<&ResourceTypeDefinition>> {
        reject_filter(filter, "ResourceTypes")?;
        Ok(self
            .resource_types
            .iter()
            .filter(|rt| rt.discoverable)
            .collect())
    }

    /// Find a schema by URN or by its human-readable name.
    pub fn schema_by_id_or_name(&self, key: &str) -> ScimResult<&Schema> {
        self.schemas
            .iter()
            .find(|s| s.id == key)
            .or_else(|| self.schemas.iter().find(|s| s.name.eq_ignore_ascii_case(key)))
            .ok_or_else(|| ScimError::resource_not_found("Schema", key))
    }

    /// Find a discoverable resource type by id or name.
    pub fn resource_type_by_id_or_name(&self, key: &str) -> ScimResult<&ResourceTypeDefinition> {
        self.resource_types
            .iter()
            .filter(|rt| rt.discoverable)
            .find(|rt| rt.name == key || rt.name.eq_ignore_ascii_case(key))
            .ok_or_else(|| ScimError::resource_not_found("ResourceType", key))
    }
}

fn reject_filter(filter: Option<&str>, endpoint: &str) -> ScimResult<()> {
    match filter {
        Some(f) if !f.is_empty() => {
            log::warn!("Refusing filtered discovery request on /{}", endpoint);
            Err(ScimError::forbidden(format!(
                "Filtering is not supported on /{}",
                endpoint
            )))
        }
        _ => Ok(()),
    }
}
