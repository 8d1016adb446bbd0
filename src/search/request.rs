//! Search requests derived from SCIM query parameters.

use super::filter::{AttributePath, FilterExpr};
use crate::error::{ScimError, ScimResult};
use serde::Deserialize;

/// Raw list query parameters, as they arrive on `GET /Users`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub filter: Option<String>,
    pub start_index: Option<String>,
    pub count: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub attributes: Option<String>,
    pub excluded_attributes: Option<String>,
}

/// Sort direction, ascending unless the client asks otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    fn parse(raw: &str) -> ScimResult<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "ascending" => Ok(Self::Ascending),
            "descending" => Ok(Self::Descending),
            _ => Err(ScimError::InvalidFilter(format!(
                "sortOrder must be 'ascending' or 'descending', got '{}'",
                raw
            ))),
        }
    }
}

/// Parsed and clamped search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub filter: Option<FilterExpr>,
    /// 1-based, never below 1
    pub start_index: usize,
    /// `None` means no upper bound
    pub count: Option<usize>,
    pub sort_by: Option<AttributePath>,
    pub sort_order: SortOrder,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            filter: None,
            start_index: 1,
            count: None,
            sort_by: None,
            sort_order: SortOrder::Ascending,
        }
    }
}

impl SearchRequest {
    /// Build from query parameters, clamping `startIndex` to at least 1 and
    /// `count` to at least 0.
    pub fn from_params(params: &SearchParams) -> ScimResult<Self> {
        let filter = match params.filter.as_deref().map(str::trim) {
            Some(f) if !f.is_empty() => Some(FilterExpr::parse(f)?),
            _ => None,
        };

        let start_index = match parse_integer("startIndex", params.start_index.as_deref())? {
            Some(n) if n > 1 => usize::try_from(n).unwrap_or(usize::MAX),
            _ => 1,
        };

        let count = parse_integer("count", params.count.as_deref())?
            .map(|n| usize::try_from(n.max(0)).unwrap_or(usize::MAX));

        let sort_by = match params.sort_by.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => Some(AttributePath::parse(path)?),
            _ => None,
        };

        let sort_order = match params.sort_order.as_deref().map(str::trim) {
            Some(order) if !order.is_empty() => SortOrder::parse(order)?,
            _ => SortOrder::default(),
        };

        Ok(Self {
            filter,
            start_index,
            count,
            sort_by,
            sort_order,
        })
    }

    /// A request matching only `filter`, with default paging.
    pub fn with_filter(filter: FilterExpr) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }

    /// Page window `[from, to)` over `total` matches.
    pub fn window(&self, total: usize) -> (usize, usize) {
        let from = self.start_index.saturating_sub(1).min(total);
        let to = match self.count {
            Some(count) => from.saturating_add(count).min(total),
            None => total,
        };
        (from, to)
    }
}

fn parse_integer(name: &str, raw: Option<&str>) -> ScimResult<Option<i64>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse::<i64>().map(Some).map_err(|_| {
            ScimError::InvalidValue(format!("{} must be an integer, got '{}'", name, value))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(start_index: Option<&str>, count: Option<&str>) -> SearchParams {
        SearchParams {
            start_index: start_index.map(str::to_string),
            count: count.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let request = SearchRequest::from_params(&SearchParams::default()).unwrap();
        assert_eq!(request, SearchRequest::default());
        assert_eq!(request.window(7), (0, 7));
    }

    #[test]
    fn test_clamping() {
        let request = SearchRequest::from_params(&params(Some("0"), Some("-3"))).unwrap();
        assert_eq!(request.start_index, 1);
        assert_eq!(request.count, Some(0));

        let request = SearchRequest::from_params(&params(Some("-10"), None)).unwrap();
        assert_eq!(request.start_index, 1);
    }

    #[test]
    fn test_window_past_the_end_is_empty() {
        let request = SearchRequest::from_params(&params(Some("10"), Some("5"))).unwrap();
        let (from, to) = request.window(3);
        assert_eq!((from, to), (3, 3));
    }

    #[test]
    fn test_window_with_huge_count_does_not_overflow() {
        let request =
            SearchRequest::from_params(&params(Some("2"), Some("9223372036854775807"))).unwrap();
        assert_eq!(request.window(5), (1, 5));
    }

    #[test]
    fn test_window_treats_zero_start_index_as_first() {
        let request = SearchRequest {
            start_index: 0,
            count: Some(1),
            ..Default::default()
        };
        assert_eq!(request.window(3), (0, 1));
    }

    #[test]
    fn test_non_numeric_paging_is_rejected() {
        assert!(matches!(
            SearchRequest::from_params(&params(Some("abc"), None)),
            Err(ScimError::InvalidValue(_))
        ));
        assert!(matches!(
            SearchRequest::from_params(&params(None, Some("1.5"))),
            Err(ScimError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_sort_parameters() {
        let request = SearchRequest::from_params(&SearchParams {
            sort_by: Some("name.familyName".to_string()),
            sort_order: Some("DESCENDING".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(request.sort_order, SortOrder::Descending);
        assert_eq!(
            request.sort_by.unwrap().sub_attribute.as_deref(),
            Some("familyName")
        );

        assert!(matches!(
            SearchRequest::from_params(&SearchParams {
                sort_order: Some("sideways".to_string()),
                ..Default::default()
            }),
            Err(ScimError::InvalidFilter(_))
        ));
        assert!(matches!(
            SearchRequest::from_params(&SearchParams {
                sort_by: Some("name..x".to_string()),
                ..Default::default()
            }),
            Err(ScimError::InvalidFilter(_))
        ));
    }
}
