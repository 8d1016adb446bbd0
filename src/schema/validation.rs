//! Schema validation for incoming SCIM documents.
//!
//! Create and replace bodies are checked as whole documents; PATCH operations
//! are checked one attribute at a time through [`SchemaRegistry::validate_attribute_value`].

use super::registry::SchemaRegistry;
use super::types::{AttributeDefinition, AttributeType, Mutability, ResourceTypeDefinition, Schema};
use crate::error::{ValidationError, ValidationResult};
use serde_json::{Map, Value};

impl SchemaRegistry {
    /// Validate a document supplied to a create operation.
    ///
    /// Caller-supplied read-only attributes (`id`, `meta`) are rejected.
    pub fn validate_create(
        &self,
        definition: &ResourceTypeDefinition,
        schema: &Schema,
        document: &Value,
    ) -> ValidationResult<()> {
        let obj = as_resource_object(document)?;
        validate_schemas_attribute(definition, obj)?;

        for (field_name, value) in obj {
            if field_name == "schemas" {
                continue;
            }
            let attr_def = lookup_attribute(schema, field_name)?;
            if attr_def.is_read_only() {
                return Err(ValidationError::ReadOnlyMutabilityViolation {
                    attribute: attr_def.name.clone(),
                });
            }
            self.validate_attribute_value(attr_def, value)?;
        }

        check_required(schema, obj)
    }

    /// Validate a document supplied to a full replace and return it with
    /// read-only attributes removed.
    ///
    /// `current` is the server's rendering of the resource. Read-only attributes
    /// are stripped from both sides before comparing, so a client echoing back
    /// `id` or `meta` is accepted; immutable attributes must match the baseline.
    pub fn prepare_replace(
        &self,
        definition: &ResourceTypeDefinition,
        schema: &Schema,
        document: &Value,
        current: &Value,
    ) -> ValidationResult<Value> {
        let obj = as_resource_object(document)?;
        validate_schemas_attribute(definition, obj)?;

        let baseline = strip_read_only(schema, current);
        let mut prepared = Map::new();

        for (field_name, value) in obj {
            if field_name == "schemas" {
                prepared.insert(field_name.clone(), value.clone());
                continue;
            }
            let attr_def = lookup_attribute(schema, field_name)?;
            if attr_def.is_read_only() {
                continue;
            }
            self.validate_attribute_value(attr_def, value)?;

            if attr_def.mutability == Mutability::Immutable {
                if let Some(existing) = baseline.get(&attr_def.name) {
                    if !existing.is_null() && existing != value {
                        return Err(ValidationError::ImmutableMutabilityViolation {
                            attribute: attr_def.name.clone(),
                        });
                    }
                }
            }
            prepared.insert(attr_def.name.clone(), value.clone());
        }

        check_required(schema, &prepared)?;
        Ok(Value::Object(prepared))
    }

    /// Validate a value against one attribute definition.
    ///
    /// `null` clears an attribute and is accepted unless the attribute is required.
    pub fn validate_attribute_value(
        &self,
        attr_def: &AttributeDefinition,
        value: &Value,
    ) -> ValidationResult<()> {
        if value.is_null() {
            if attr_def.required {
                return Err(ValidationError::missing_required(&attr_def.name));
            }
            return Ok(());
        }

        if attr_def.multi_valued {
            let items = value
                .as_array()
                .ok_or_else(|| ValidationError::ExpectedMultiValue {
                    attribute: attr_def.name.clone(),
                })?;
            for item in items {
                validate_single_value(attr_def, item)?;
            }
            Ok(())
        } else {
            if value.is_array() {
                return Err(ValidationError::ExpectedSingleValue {
                    attribute: attr_def.name.clone(),
                });
            }
            validate_single_value(attr_def, value)
        }
    }

    /// Validate one element of a multi-valued attribute, as supplied by a PATCH
    /// `add` that appends a single value.
    pub fn validate_element(
        &self,
        attr_def: &AttributeDefinition,
        value: &Value,
    ) -> ValidationResult<()> {
        validate_single_value(attr_def, value)
    }

    /// Rewrite attribute names to the schema's spelling.
    ///
    /// Attribute names are case-insensitive on the wire; typed parsing is not.
    /// Unknown names are left alone for validation to report.
    pub fn canonicalize(&self, schema: &Schema, document: &Value) -> Value {
        let Some(obj) = document.as_object() else {
            return document.clone();
        };
        let canonical = obj
            .iter()
            .map(|(key, value)| match schema.attribute(key) {
                Some(attr_def) => (attr_def.name.clone(), canonicalize_value(attr_def, value)),
                None => (key.clone(), value.clone()),
            })
            .collect();
        Value::Object(canonical)
    }

    /// Check that every required attribute is present after a mutation.
    pub fn validate_required(&self, schema: &Schema, document: &Value) -> ValidationResult<()> {
        check_required(schema, as_resource_object(document)?)
    }
}

fn as_resource_object(document: &Value) -> ValidationResult<&Map<String, Value>> {
    document
        .as_object()
        .ok_or_else(|| ValidationError::custom("Resource must be a JSON object"))
}

fn lookup_attribute<'a>(schema: &'a Schema, field_name: &str) -> ValidationResult<&'a AttributeDefinition> {
    schema
        .attribute(field_name)
        .ok_or_else(|| ValidationError::UnknownAttribute {
            attribute: field_name.to_string(),
            schema_id: schema.id.clone(),
        })
}

fn validate_schemas_attribute(
    definition: &ResourceTypeDefinition,
    obj: &Map<String, Value>,
) -> ValidationResult<()> {
    let schemas = obj
        .get("schemas")
        .and_then(Value::as_array)
        .ok_or(ValidationError::MissingSchemas)?;

    let mut has_core = false;
    for uri in schemas {
        let uri = uri
            .as_str()
            .ok_or_else(|| ValidationError::invalid_type("schemas", "string", json_type_name(uri)))?;
        if !definition.accepts_schema(uri) {
            return Err(ValidationError::UnknownSchemaUri {
                uri: uri.to_string(),
            });
        }
        has_core |= uri == definition.schema;
    }

    if !has_core {
        return Err(ValidationError::MissingBaseSchema {
            uri: definition.schema.clone(),
        });
    }
    Ok(())
}

fn check_required(schema: &Schema, obj: &Map<String, Value>) -> ValidationResult<()> {
    for attr_def in schema.attributes.iter().filter(|a| a.required) {
        let present = obj
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(&attr_def.name))
            .map(|(_, v)| !v.is_null())
            .unwrap_or(false);
        if !present {
            return Err(ValidationError::missing_required(&attr_def.name));
        }
    }
    Ok(())
}

fn validate_single_value(attr_def: &AttributeDefinition, value: &Value) -> ValidationResult<()> {
    if value.is_null() {
        return Ok(());
    }

    let type_ok = match attr_def.data_type {
        AttributeType::String | AttributeType::Reference | AttributeType::Binary => {
            value.is_string()
        }
        AttributeType::DateTime => match value.as_str() {
            Some(s) => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
            None => false,
        },
        AttributeType::Boolean => value.is_boolean(),
        AttributeType::Integer => value.is_i64() || value.is_u64(),
        AttributeType::Decimal => value.is_number(),
        AttributeType::Complex => value.is_object(),
    };

    if !type_ok {
        return Err(ValidationError::invalid_type(
            &attr_def.name,
            attr_def.data_type.as_str(),
            json_type_name(value),
        ));
    }

    if let (AttributeType::Complex, Some(obj)) = (attr_def.data_type, value.as_object()) {
        for (sub_name, sub_value) in obj {
            let sub_def = attr_def.sub_attribute(sub_name).ok_or_else(|| {
                ValidationError::UnknownSubAttribute {
                    attribute: attr_def.name.clone(),
                    sub_attribute: sub_name.clone(),
                }
            })?;
            if sub_def.multi_valued {
                let items = sub_value
                    .as_array()
                    .ok_or_else(|| ValidationError::ExpectedMultiValue {
                        attribute: format!("{}.{}", attr_def.name, sub_def.name),
                    })?;
                for item in items {
                    validate_single_value(sub_def, item)?;
                }
            } else {
                validate_single_value(sub_def, sub_value)?;
            }
        }
    }

    Ok(())
}

fn canonicalize_value(attr_def: &AttributeDefinition, value: &Value) -> Value {
    if attr_def.data_type != AttributeType::Complex {
        return value.clone();
    }
    let rename = |element: &Value| match element.as_object() {
        Some(obj) => Value::Object(
            obj.iter()
                .map(|(key, sub_value)| match attr_def.sub_attribute(key) {
                    Some(sub_def) => (sub_def.name.clone(), sub_value.clone()),
                    None => (key.clone(), sub_value.clone()),
                })
                .collect(),
        ),
        None => element.clone(),
    };
    match value {
        Value::Array(items) => Value::Array(items.iter().map(rename).collect()),
        other => rename(other),
    }
}

/// Copy of `document` without read-only top-level attributes, keyed by the
/// schema's canonical attribute names.
pub(crate) fn strip_read_only(schema: &Schema, document: &Value) -> Map<String, Value> {
    let mut stripped = Map::new();
    if let Some(obj) = document.as_object() {
        for (key, value) in obj {
            match schema.attribute(key) {
                Some(attr) if attr.is_read_only() => {}
                Some(attr) => {
                    stripped.insert(attr.name.clone(), value.clone());
                }
                None => {
                    stripped.insert(key.clone(), value.clone());
                }
            }
        }
    }
    stripped
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "decimal",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
