//! SCIM PATCH (RFC 7644 Section 3.5.2).
//!
//! PATCH runs in two passes that are kept apart on purpose:
//!
//! 1. [`PatchRequest::prepare`] checks every operation against the schema and
//!    the current document, then [`apply_operations`] mutates an untyped JSON
//!    tree in order.
//! 2. The caller re-parses the tree into a
//!    [`ScimUserDocument`](super::ScimUserDocument). A failure there means the
//!    operations produced something the server can't store.
//!
//! Supported paths: `attr`, `attr.sub`, `attr[filter]`, `attr[filter].sub`,
//! each optionally prefixed with the resource's schema URN.

use crate::error::{ScimError, ScimResult, ValidationError};
use crate::schema::{
    AttributeDefinition, AttributeType, Mutability, PATCH_OP_URN, Schema, SchemaRegistry,
};
use crate::search::{AttributePath, FilterExpr};
use serde::Deserialize;
use serde_json::{Map, Value};

/// A PATCH request body.
#[derive(Debug, Clone, Deserialize)]
pub struct PatchRequest {
    #[serde(default)]
    pub schemas: Vec<String>,
    #[serde(rename = "Operations", alias = "operations")]
    pub operations: Vec<PatchOperation>,
}

/// One `{op, path, value}` instruction.
#[derive(Debug, Clone, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
}

/// PATCH operation kind; matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
}

impl TryFrom<String> for PatchOp {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_ascii_lowercase().as_str() {
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            "replace" => Ok(Self::Replace),
            _ => Err(format!("Unsupported PATCH operation: {}", value)),
        }
    }
}

/// Parsed PATCH path.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchPath {
    pub attribute: String,
    pub value_filter: Option<FilterExpr>,
    pub sub_attribute: Option<String>,
}

impl PatchPath {
    /// Parse a PATCH path. A schema URN prefix must be `schema_urn`.
    pub fn parse(raw: &str, schema_urn: &str) -> ScimResult<Self> {
        let raw = raw.trim();
        let invalid = |reason: &str| ScimError::InvalidPath(format!("'{}': {}", raw, reason));

        let (head, bracket) = match raw.find('[') {
            Some(open) => {
                let close = raw
                    .rfind(']')
                    .filter(|close| *close > open)
                    .ok_or_else(|| invalid("unterminated value filter"))?;
                (&raw[..open], Some((&raw[open + 1..close], &raw[close + 1..])))
            }
            None => (raw, None),
        };

        let path = AttributePath::parse(head).map_err(|e| match e {
            ScimError::InvalidFilter(message) => ScimError::InvalidPath(message),
            other => other,
        })?;
        if let Some(urn) = &path.schema_urn {
            if !urn.eq_ignore_ascii_case(schema_urn) {
                return Err(invalid("schema URN does not belong to this resource"));
            }
        }

        match bracket {
            None => Ok(Self {
                attribute: path.attribute,
                value_filter: None,
                sub_attribute: path.sub_attribute,
            }),
            Some((filter, rest)) => {
                if path.sub_attribute.is_some() {
                    return Err(invalid("value filter must follow a top-level attribute"));
                }
                let value_filter = FilterExpr::parse(filter).map_err(|e| match e {
                    ScimError::InvalidFilter(message) => ScimError::InvalidPath(message),
                    other => other,
                })?;
                let sub_attribute = match rest {
                    "" => None,
                    rest => {
                        let sub = rest
                            .strip_prefix('.')
                            .filter(|s| !s.is_empty() && !s.contains(['.', '[', ']']))
                            .ok_or_else(|| invalid("unexpected text after value filter"))?;
                        Some(sub.to_string())
                    }
                };
                Ok(Self {
                    attribute: path.attribute,
                    value_filter: Some(value_filter),
                    sub_attribute,
                })
            }
        }
    }
}

/// An operation that passed schema checks, with names in canonical spelling.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedOperation {
    pub op: PatchOp,
    pub path: PatchPath,
    pub value: Option<Value>,
    pub multi_valued: bool,
}

impl PatchRequest {
    /// Parse a request body.
    pub fn from_value(body: Value) -> ScimResult<Self> {
        let request: PatchRequest = serde_json::from_value(body)
            .map_err(|e| ScimError::invalid_request(format!("Invalid PATCH request: {}", e)))?;
        if !request.schemas.iter().any(|s| s == PATCH_OP_URN) {
            return Err(ValidationError::MissingBaseSchema {
                uri: PATCH_OP_URN.to_string(),
            }
            .into());
        }
        if request.operations.is_empty() {
            return Err(ScimError::invalid_request(
                "PATCH request must contain at least one operation",
            ));
        }
        Ok(request)
    }

    /// Check every operation against `schema` and the `current` document.
    ///
    /// Path-less `add`/`replace` operations are expanded into one operation per
    /// attribute in their value.
    pub fn prepare(
        &self,
        registry: &SchemaRegistry,
        schema: &Schema,
        current: &Value,
    ) -> ScimResult<Vec<PreparedOperation>> {
        let mut prepared = Vec::new();
        for operation in &self.operations {
            match (&operation.path, operation.op) {
                (None, PatchOp::Remove) => {
                    return Err(ScimError::InvalidPath(
                        "remove operation requires a path".to_string(),
                    ));
                }
                (None, op) => {
                    let value = require_value(operation)?;
                    let obj = value.as_object().ok_or_else(|| {
                        ScimError::invalid_request(
                            "Operation without a path must carry an object value",
                        )
                    })?;
                    for (name, attr_value) in obj {
                        if name == "schemas" {
                            continue;
                        }
                        let path = PatchPath {
                            attribute: name.clone(),
                            value_filter: None,
                            sub_attribute: None,
                        };
                        prepared.push(prepare_one(
                            registry,
                            schema,
                            current,
                            op,
                            path,
                            Some(attr_value),
                        )?);
                    }
                }
                (Some(raw), op) => {
                    let path = PatchPath::parse(raw, &schema.id)?;
                    prepared.push(prepare_one(
                        registry,
                        schema,
                        current,
                        op,
                        path,
                        operation.value.as_ref(),
                    )?);
                }
            }
        }
        Ok(prepared)
    }
}

fn require_value(operation: &PatchOperation) -> ScimResult<&Value> {
    operation.value.as_ref().ok_or_else(|| {
        ScimError::invalid_request(format!(
            "{:?} operation requires a value",
            operation.op
        ))
    })
}

fn prepare_one(
    registry: &SchemaRegistry,
    schema: &Schema,
    current: &Value,
    op: PatchOp,
    mut path: PatchPath,
    value: Option<&Value>,
) -> ScimResult<PreparedOperation> {
    let attr_def = schema
        .attribute(&path.attribute)
        .ok_or_else(|| ScimError::InvalidPath(format!("Unknown attribute '{}'", path.attribute)))?;
    path.attribute = attr_def.name.clone();

    let sub_def = match &path.sub_attribute {
        Some(sub) => {
            let sub_def = attr_def.sub_attribute(sub).ok_or_else(|| {
                ScimError::InvalidPath(format!(
                    "Unknown sub-attribute '{}.{}'",
                    attr_def.name, sub
                ))
            })?;
            path.sub_attribute = Some(sub_def.name.clone());
            Some(sub_def)
        }
        None => None,
    };

    if path.value_filter.is_some()
        && !(attr_def.multi_valued && attr_def.data_type == AttributeType::Complex)
    {
        return Err(ScimError::InvalidPath(format!(
            "Value filters apply only to multi-valued complex attributes, not '{}'",
            attr_def.name
        )));
    }

    let target = sub_def.unwrap_or(attr_def);
    if attr_def.is_read_only() || target.is_read_only() {
        return Err(ValidationError::ReadOnlyMutabilityViolation {
            attribute: attr_def.name.clone(),
        }
        .into());
    }
    if attr_def.mutability == Mutability::Immutable
        && op != PatchOp::Add
        && current.get(&attr_def.name).is_some_and(|v| !v.is_null())
    {
        return Err(ValidationError::ImmutableMutabilityViolation {
            attribute: attr_def.name.clone(),
        }
        .into());
    }

    let value = match op {
        PatchOp::Remove => {
            if attr_def.required && sub_def.is_none() && path.value_filter.is_none() {
                return Err(ValidationError::missing_required(&attr_def.name).into());
            }
            None
        }
        PatchOp::Add | PatchOp::Replace => {
            let value = value.ok_or_else(|| {
                ScimError::invalid_request(format!("{:?} operation requires a value", op))
            })?;
            let value = canonicalize_value(registry, schema, attr_def, value);
            check_value(registry, attr_def, sub_def, &path, &value)?;
            Some(value)
        }
    };

    Ok(PreparedOperation {
        op,
        multi_valued: attr_def.multi_valued && sub_def.is_none() && path.value_filter.is_none(),
        path,
        value,
    })
}

fn canonicalize_value(
    registry: &SchemaRegistry,
    schema: &Schema,
    attr_def: &AttributeDefinition,
    value: &Value,
) -> Value {
    let mut wrapper = Map::new();
    wrapper.insert(attr_def.name.clone(), value.clone());
    registry
        .canonicalize(schema, &Value::Object(wrapper))
        .get(&attr_def.name)
        .cloned()
        .unwrap_or_else(|| value.clone())
}

fn check_value(
    registry: &SchemaRegistry,
    attr_def: &AttributeDefinition,
    sub_def: Option<&AttributeDefinition>,
    path: &PatchPath,
    value: &Value,
) -> ScimResult<()> {
    if let Some(sub_def) = sub_def {
        registry.validate_attribute_value(sub_def, value)?;
    } else if path.value_filter.is_some() || (attr_def.multi_valued && !value.is_array()) {
        registry.validate_element(attr_def, value)?;
    } else {
        registry.validate_attribute_value(attr_def, value)?;
    }
    Ok(())
}

/// Apply prepared operations to `document` in order.
pub fn apply_operations(document: &mut Value, operations: &[PreparedOperation]) -> ScimResult<()> {
    let obj = document
        .as_object_mut()
        .ok_or_else(|| ScimError::internal("PATCH target is not a JSON object"))?;

    for operation in operations {
        apply_one(obj, operation)?;
    }
    Ok(())
}

fn apply_one(obj: &mut Map<String, Value>, operation: &PreparedOperation) -> ScimResult<()> {
    let path = &operation.path;
    let attribute = path.attribute.as_str();

    match (&path.value_filter, &path.sub_attribute) {
        (Some(filter), sub) => {
            let elements = obj
                .get_mut(attribute)
                .and_then(Value::as_array_mut)
                .ok_or_else(|| no_target(attribute))?;
            let matched: Vec<usize> = elements
                .iter()
                .enumerate()
                .filter(|(_, element)| filter.matches(element, None))
                .map(|(i, _)| i)
                .collect();
            if matched.is_empty() {
                return Err(no_target(attribute));
            }

            match (operation.op, sub) {
                (PatchOp::Remove, None) => {
                    let mut index = 0;
                    elements.retain(|_| {
                        let keep = !matched.contains(&index);
                        index += 1;
                        keep
                    });
                }
                (PatchOp::Remove, Some(sub)) => {
                    for i in &matched {
                        if let Some(element) = elements[*i].as_object_mut() {
                            element.remove(sub);
                        }
                    }
                }
                (_, Some(sub)) => {
                    let value = operation.value.clone().unwrap_or(Value::Null);
                    for i in &matched {
                        if let Some(element) = elements[*i].as_object_mut() {
                            element.insert(sub.clone(), value.clone());
                        }
                    }
                    if sub == "primary" && value == Value::Bool(true) {
                        clear_other_primaries(elements, &matched);
                    }
                }
                (_, None) => {
                    let value = operation.value.clone().unwrap_or(Value::Null);
                    for i in &matched {
                        let merge = operation.op == PatchOp::Add && elements[*i].is_object();
                        match (merge, value.as_object()) {
                            (true, Some(patch)) => merge_into(&mut elements[*i], patch),
                            _ => elements[*i] = value.clone(),
                        }
                    }
                    if is_primary(&value) {
                        clear_other_primaries(elements, &matched);
                    }
                }
            }
            drop_if_empty(obj, attribute);
        }

        (None, Some(sub)) => match operation.op {
            PatchOp::Remove => {
                match obj.get_mut(attribute) {
                    Some(Value::Object(complex)) => {
                        complex.remove(sub);
                    }
                    Some(Value::Array(elements)) => {
                        for element in elements.iter_mut().filter_map(Value::as_object_mut) {
                            element.remove(sub);
                        }
                    }
                    _ => {}
                }
                drop_if_empty(obj, attribute);
            }
            PatchOp::Add | PatchOp::Replace => {
                let value = operation.value.clone().unwrap_or(Value::Null);
                let entry = obj
                    .entry(attribute.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                match entry {
                    Value::Array(elements) => {
                        for element in elements.iter_mut().filter_map(Value::as_object_mut) {
                            element.insert(sub.clone(), value.clone());
                        }
                    }
                    Value::Object(complex) => {
                        complex.insert(sub.clone(), value);
                    }
                    other => {
                        let mut complex = Map::new();
                        complex.insert(sub.clone(), value);
                        *other = Value::Object(complex);
                    }
                }
            }
        },

        (None, None) => match operation.op {
            PatchOp::Remove => {
                obj.remove(attribute);
            }
            PatchOp::Add if operation.multi_valued => {
                let additions = into_elements(operation.value.clone());
                let entry = obj
                    .entry(attribute.to_string())
                    .or_insert_with(|| Value::Array(Vec::new()));
                if !entry.is_array() {
                    *entry = Value::Array(Vec::new());
                }
                if let Value::Array(elements) = entry {
                    let start = elements.len();
                    for element in additions {
                        if !elements.contains(&element) {
                            elements.push(element);
                        }
                    }
                    let added: Vec<usize> = (start..elements.len())
                        .filter(|i| is_primary(&elements[*i]))
                        .collect();
                    if !added.is_empty() {
                        clear_other_primaries(elements, &added);
                    }
                }
            }
            PatchOp::Replace if operation.multi_valued => {
                obj.insert(
                    attribute.to_string(),
                    Value::Array(into_elements(operation.value.clone())),
                );
            }
            PatchOp::Add | PatchOp::Replace => {
                let value = operation.value.clone().unwrap_or(Value::Null);
                let merge = obj.get(attribute).is_some_and(Value::is_object);
                match (merge, value.as_object()) {
                    (true, Some(patch)) => {
                        if let Some(existing) = obj.get_mut(attribute) {
                            merge_into(existing, patch);
                        }
                    }
                    _ => {
                        obj.insert(attribute.to_string(), value);
                    }
                }
            }
        },
    }
    Ok(())
}

fn no_target(attribute: &str) -> ScimError {
    ScimError::NoTarget(format!("No values of '{}' match the value filter", attribute))
}

fn merge_into(target: &mut Value, patch: &Map<String, Value>) {
    if let Some(target) = target.as_object_mut() {
        for (k, v) in patch {
            target.insert(k.clone(), v.clone());
        }
    }
}

fn into_elements(value: Option<Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => Vec::new(),
        Some(single) => vec![single],
    }
}

fn is_primary(value: &Value) -> bool {
    value.get("primary").and_then(Value::as_bool).unwrap_or(false)
}

fn clear_other_primaries(elements: &mut [Value], keep: &[usize]) {
    let keep_index = keep.last().copied();
    for (i, element) in elements.iter_mut().enumerate() {
        if Some(i) == keep_index {
            continue;
        }
        if let Some(element) = element.as_object_mut() {
            if element.get("primary").and_then(Value::as_bool) == Some(true) {
                element.insert("primary".to_string(), Value::Bool(false));
            }
        }
    }
}

fn drop_if_empty(obj: &mut Map<String, Value>, attribute: &str) {
    let empty = match obj.get(attribute) {
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(complex)) => complex.is_empty(),
        _ => false,
    };
    if empty {
        obj.remove(attribute);
    }
}
