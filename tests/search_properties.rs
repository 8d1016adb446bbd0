//! Pagination and filtering properties of the search engine.

use proptest::prelude::*;
use scim_provisioner::schema::{ResourceKind, SchemaRegistry};
use scim_provisioner::search::{SearchEngine, SearchParams, SearchRequest};
use serde_json::{Value, json};
use std::sync::Arc;

const BASE: &str = "https://scim.test/scim/v2/acme";

fn engine() -> SearchEngine {
    SearchEngine::new(Arc::new(SchemaRegistry::with_embedded_schemas().unwrap()))
}

fn users(n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| json!({"id": format!("u{}", i), "userName": format!("user{:03}", i)}))
        .collect()
}

fn request(start_index: i64, count: Option<i64>) -> SearchRequest {
    SearchRequest::from_params(&SearchParams {
        start_index: Some(start_index.to_string()),
        count: count.map(|c| c.to_string()),
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn test_empty_candidates_with_zero_count() {
    let result = engine()
        .execute(ResourceKind::User, &request(1, Some(0)), users(0), BASE)
        .unwrap();
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({
            "schemas": ["urn:ietf:params:scim:api:messages:2.0:ListResponse"],
            "totalResults": 0,
            "startIndex": 1,
            "itemsPerPage": 0,
            "Resources": []
        })
    );
}

#[test]
fn test_start_index_past_the_end() {
    let result = engine()
        .execute(ResourceKind::User, &request(10, Some(5)), users(3), BASE)
        .unwrap();
    assert_eq!(result.total_results, 3);
    assert_eq!(result.start_index, 10);
    assert_eq!(result.items_per_page, 0);
    assert!(result.resources.is_empty());
}

#[test]
fn test_non_positive_values_are_clamped() {
    let result = engine()
        .execute(ResourceKind::User, &request(-4, Some(-1)), users(3), BASE)
        .unwrap();
    assert_eq!(result.start_index, 1);
    assert_eq!(result.items_per_page, 0);
    assert_eq!(result.total_results, 3);
}

#[test]
fn test_resources_are_stamped_with_location() {
    let result = engine()
        .execute(ResourceKind::User, &SearchRequest::default(), users(1), BASE)
        .unwrap();
    assert_eq!(
        result.resources[0]["meta"]["location"],
        format!("{}/Users/u0", BASE)
    );
    assert_eq!(result.resources[0]["meta"]["resourceType"], "User");
}

proptest! {
    #[test]
    fn prop_page_is_the_expected_window(
        total in 0usize..40,
        start_index in -5i64..50,
        count in proptest::option::of(-5i64..50),
    ) {
        let result = engine()
            .execute(ResourceKind::User, &request(start_index, count), users(total), BASE)
            .unwrap();

        let start = start_index.max(1) as usize;
        let from = (start - 1).min(total);
        let to = match count {
            Some(c) => (from + c.max(0) as usize).min(total),
            None => total,
        };

        prop_assert_eq!(result.total_results, total);
        prop_assert_eq!(result.start_index, start);
        prop_assert_eq!(result.items_per_page, to - from);
        prop_assert_eq!(result.resources.len(), result.items_per_page);

        let ids: Vec<String> = result
            .resources
            .iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect();
        let expected: Vec<String> = (from..to).map(|i| format!("u{}", i)).collect();
        prop_assert_eq!(ids, expected);
    }

    #[test]
    fn prop_filter_counts_only_matches(total in 0usize..30, threshold in 0usize..30) {
        let filter = format!("userName lt \"user{:03}\"", threshold);
        let request = SearchRequest::from_params(&SearchParams {
            filter: Some(filter),
            count: Some("5".to_string()),
            ..Default::default()
        })
        .unwrap();

        let result = engine()
            .execute(ResourceKind::User, &request, users(total), BASE)
            .unwrap();

        let matching = threshold.min(total);
        prop_assert_eq!(result.total_results, matching);
        prop_assert_eq!(result.items_per_page, matching.min(5));
    }
}
