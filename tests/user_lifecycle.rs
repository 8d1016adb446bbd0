//! End-to-end User lifecycle over HTTP.

mod common;

use axum::http::{Method, StatusCode, header};
use common::fixtures::{self, ERROR_URN, LIST_URN};
use common::{BASE_URL, TENANT, TestServer};
use scim_provisioner::directory::UserDirectory;
use scim_provisioner::resource::ROLES_ATTRIBUTE;
use serde_json::json;

#[tokio::test]
async fn test_create_then_get() {
    let server = TestServer::start().await;

    let created = server
        .scim(Method::POST, "/Users", Some(&fixtures::user("alice")))
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(
        created.header(header::CONTENT_TYPE),
        Some("application/scim+json")
    );

    let id = created.body["id"].as_str().unwrap().to_string();
    let location = format!("{}/scim/v2/{}/Users/{}", BASE_URL, TENANT, id);
    assert_eq!(created.header(header::LOCATION), Some(location.as_str()));
    assert_eq!(created.body["meta"]["location"], location);
    assert_eq!(created.body["meta"]["resourceType"], "User");
    assert!(created.header(header::ETAG).is_some());

    let fetched = server.scim(Method::GET, &format!("/Users/{}", id), None).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body["userName"], "alice");
    assert_eq!(fetched.body["emails"][0]["value"], "alice@acme.com");
    assert_eq!(
        fetched.header(header::ETAG),
        created.header(header::ETAG)
    );
}

#[tokio::test]
async fn test_duplicate_username_conflicts_without_mutation() {
    let server = TestServer::start().await;
    let first = server
        .scim(Method::POST, "/Users", Some(&fixtures::user("alice")))
        .await;
    assert_eq!(first.status, StatusCode::CREATED);
    let before = server.directory.stats().await;

    let second = server
        .scim(Method::POST, "/Users", Some(&fixtures::user("alice")))
        .await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.body["schemas"][0], ERROR_URN);
    assert_eq!(second.body["status"], "409");
    assert_eq!(second.body["scimType"], "uniqueness");

    assert_eq!(server.directory.stats().await, before);
}

#[tokio::test]
async fn test_patch_roles_round_trip() {
    let server = TestServer::start().await;
    let created = server
        .scim(
            Method::POST,
            "/Users",
            Some(&fixtures::user_with_roles("bob", json!([{"value": "viewer"}]))),
        )
        .await;
    let id = created.body["id"].as_str().unwrap().to_string();

    let roles = json!([
        {"value": "admin", "type": "app"},
        {"value": "auditor", "display": "Auditor"}
    ]);
    let patched = server
        .scim(
            Method::PATCH,
            &format!("/Users/{}", id),
            Some(&fixtures::patch(json!([
                {"op": "replace", "path": "roles", "value": roles}
            ]))),
        )
        .await;
    assert_eq!(patched.status, StatusCode::OK);

    let fetched = server.scim(Method::GET, &format!("/Users/{}", id), None).await;
    assert_eq!(fetched.body["roles"], roles);

    let stored = server.directory.get_user(&id).await.unwrap().unwrap();
    assert_eq!(
        stored.attribute(ROLES_ATTRIBUTE).unwrap(),
        &["admin".to_string(), "auditor".to_string()]
    );
}

#[tokio::test]
async fn test_replace_is_idempotent() {
    let server = TestServer::start().await;
    let created = server
        .scim(Method::POST, "/Users", Some(&fixtures::user("carol")))
        .await;
    let id = created.body["id"].as_str().unwrap().to_string();

    let mut replacement = fixtures::user("carol");
    replacement["name"]["givenName"] = json!("Carol");
    replacement["active"] = json!(false);

    let first = server
        .scim(Method::PUT, &format!("/Users/{}", id), Some(&replacement))
        .await;
    let second = server
        .scim(Method::PUT, &format!("/Users/{}", id), Some(&replacement))
        .await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.body["active"], false);
    assert_eq!(first.body["meta"]["version"], second.body["meta"]["version"]);
}

#[tokio::test]
async fn test_delete_removes_from_tenant() {
    let server = TestServer::start().await;
    let created = server
        .scim(Method::POST, "/Users", Some(&fixtures::user("dave")))
        .await;
    let id = created.body["id"].as_str().unwrap().to_string();

    let deleted = server
        .scim(Method::DELETE, &format!("/Users/{}", id), None)
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert_eq!(deleted.body, serde_json::Value::Null);

    let fetched = server.scim(Method::GET, &format!("/Users/{}", id), None).await;
    assert_eq!(fetched.status, StatusCode::NOT_FOUND);

    // the directory user itself survives
    assert!(server.directory.get_user(&id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_list_filters_and_paginates() {
    let server = TestServer::start().await;
    for name in ["erin", "frank", "grace"] {
        let response = server
            .scim(Method::POST, "/Users", Some(&fixtures::user(name)))
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let page = server
        .scim(
            Method::GET,
            "/Users?sortBy=userName&sortOrder=descending&startIndex=2&count=1",
            None,
        )
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body["schemas"][0], LIST_URN);
    assert_eq!(page.body["totalResults"], 3);
    assert_eq!(page.body["startIndex"], 2);
    assert_eq!(page.body["itemsPerPage"], 1);
    assert_eq!(page.body["Resources"][0]["userName"], "frank");

    let filtered = server
        .scim(Method::GET, "/Users?filter=userName%20eq%20%22GRACE%22", None)
        .await;
    assert_eq!(filtered.body["totalResults"], 1);
    assert_eq!(filtered.body["Resources"][0]["userName"], "grace");
}

#[tokio::test]
async fn test_malformed_requests_are_rejected() {
    let server = TestServer::start().await;

    let bad_filter = server
        .scim(Method::GET, "/Users?filter=userName%20eq", None)
        .await;
    assert_eq!(bad_filter.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_filter.body["scimType"], "invalidFilter");

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri(format!("/scim/v2/{}/Users", TENANT))
        .header(header::AUTHORIZATION, format!("Bearer {}", common::token()))
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let invalid_json = server.send_request(request).await;
    assert_eq!(invalid_json.status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid_json.body["scimType"], "invalidSyntax");

    let unknown = server
        .scim(Method::GET, "/Users/does-not-exist", None)
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.body["status"], "404");
}

#[tokio::test]
async fn test_unknown_tenant_is_not_found() {
    let server = TestServer::start().await;
    let response = server
        .send(
            Method::GET,
            "/scim/v2/globex/Users",
            Some(&common::token()),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
