//! Filter, sort and paginate over an in-memory snapshot of resources.
//!
//! The engine never talks to the directory. Callers hand it the candidates
//! they are allowed to see; the engine stamps resource metadata, filters,
//! counts, sorts and finally slices the page:
//!
//! ```rust
//! use scim_provisioner::schema::{ResourceKind, SchemaRegistry};
//! use scim_provisioner::search::{SearchEngine, SearchRequest};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = SearchEngine::new(Arc::new(SchemaRegistry::with_embedded_schemas()?));
//! let request = SearchRequest { start_index: 10, count: Some(5), ..Default::default() };
//! let candidates = vec![json!({"id": "1"}), json!({"id": "2"}), json!({"id": "3"})];
//!
//! let page = engine.execute(ResourceKind::User, &request, candidates, "https://scim.example.com/scim/v2/acme")?;
//! assert_eq!(page.total_results, 3);
//! assert!(page.resources.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod filter;
pub mod request;

pub use filter::{AttributePath, CompareOp, FilterExpr, LogicalOp};
pub use request::{SearchParams, SearchRequest, SortOrder};

use crate::error::{ScimError, ScimResult};
use crate::schema::{LIST_RESPONSE_URN, ResourceKind, SchemaRegistry};
use serde::Serialize;
use serde::ser::SerializeStruct;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::Arc;

/// One page of search results.
///
/// Serializes as a SCIM `ListResponse`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult<T> {
    pub resources: Vec<T>,
    /// Match count before pagination
    pub total_results: usize,
    pub items_per_page: usize,
    /// The requested start index, echoed back
    pub start_index: usize,
}

impl<T> SearchResult<T> {
    /// A complete, unpaged listing.
    pub fn unpaged(resources: Vec<T>) -> Self {
        let total = resources.len();
        Self {
            resources,
            total_results: total,
            items_per_page: total,
            start_index: 1,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> SearchResult<U> {
        SearchResult {
            resources: self.resources.into_iter().map(f).collect(),
            total_results: self.total_results,
            items_per_page: self.items_per_page,
            start_index: self.start_index,
        }
    }
}

impl<T: Serialize> Serialize for SearchResult<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ListResponse", 5)?;
        state.serialize_field("schemas", &[LIST_RESPONSE_URN])?;
        state.serialize_field("totalResults", &self.total_results)?;
        state.serialize_field("itemsPerPage", &self.items_per_page)?;
        state.serialize_field("startIndex", &self.start_index)?;
        state.serialize_field("Resources", &self.resources)?;
        state.end()
    }
}

/// Applies [`SearchRequest`]s to candidate resources.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    registry: Arc<SchemaRegistry>,
}

impl SearchEngine {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }

    /// Run `request` over `candidates`.
    ///
    /// `base_location` is the tenant root URL used to stamp `meta.location`.
    pub fn execute<T, I>(
        &self,
        kind: ResourceKind,
        request: &SearchRequest,
        candidates: I,
        base_location: &str,
    ) -> ScimResult<SearchResult<Value>>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        let definition = self.registry.definition_for(kind)?;
        let schema = self.registry.get_schema(&definition.schema);

        let mut matched = Vec::new();
        for candidate in candidates {
            let mut document = serde_json::to_value(candidate).map_err(|e| {
                ScimError::internal(format!("Failed to render {} resource: {}", kind, e))
            })?;
            stamp_meta(&mut document, &definition.name, base_location, &definition.endpoint);

            let keep = request
                .filter
                .as_ref()
                .map(|filter| filter.matches(&document, schema))
                .unwrap_or(true);
            if keep {
                matched.push(document);
            }
        }

        let total_results = matched.len();

        if let Some(path) = &request.sort_by {
            let case_exact = path.case_exact(schema);
            matched.sort_by(|a, b| {
                let ordering = compare_sort_values(
                    path.sort_value(a),
                    path.sort_value(b),
                    case_exact,
                );
                match (request.sort_order, ordering) {
                    // missing values stay last in both directions
                    (_, SortKeyOrdering::MissingLast(o)) => o,
                    (SortOrder::Ascending, SortKeyOrdering::Values(o)) => o,
                    (SortOrder::Descending, SortKeyOrdering::Values(o)) => o.reverse(),
                }
            });
        }

        let (from, to) = request.window(total_results);
        let resources: Vec<Value> = if from >= to {
            Vec::new()
        } else {
            matched.drain(from..to).collect()
        };

        log::debug!(
            "Search over {} resources matched {} and returned {} (startIndex {})",
            kind,
            total_results,
            resources.len(),
            request.start_index
        );

        Ok(SearchResult {
            items_per_page: resources.len(),
            resources,
            total_results,
            start_index: request.start_index,
        })
    }
}

fn stamp_meta(document: &mut Value, resource_type: &str, base_location: &str, endpoint: &str) {
    let Some(obj) = document.as_object_mut() else {
        return;
    };
    let location = obj
        .get("id")
        .and_then(Value::as_str)
        .map(|id| format!("{}{}/{}", base_location.trim_end_matches('/'), endpoint, id));

    let meta = obj
        .entry("meta")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Some(meta) = meta.as_object_mut() {
        meta.insert(
            "resourceType".to_string(),
            Value::String(resource_type.to_string()),
        );
        if let Some(location) = location {
            meta.insert("location".to_string(), Value::String(location));
        }
    }
}

enum SortKeyOrdering {
    Values(Ordering),
    MissingLast(Ordering),
}

fn compare_sort_values(a: Option<&Value>, b: Option<&Value>, case_exact: bool) -> SortKeyOrdering {
    match (a, b) {
        (None, None) => SortKeyOrdering::MissingLast(Ordering::Equal),
        (None, Some(_)) => SortKeyOrdering::MissingLast(Ordering::Greater),
        (Some(_), None) => SortKeyOrdering::MissingLast(Ordering::Less),
        (Some(a), Some(b)) => SortKeyOrdering::Values(match (a, b) {
            (Value::String(a), Value::String(b)) => filter::compare_strings(a, b, case_exact),
            (Value::Number(a), Value::Number(b)) => a
                .as_f64()
                .partial_cmp(&b.as_f64())
                .unwrap_or(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }),
    }
}
