//! Bearer token verification, validator caching and the companion issuer.

mod common;

use axum::http::{Method, StatusCode, header};
use common::fixtures;
use common::{AUDIENCE, ISSUER, JwksServer, TENANT, TestServer};
use scim_provisioner::issuer::{IssuerSettings, MintRequest, TokenIssuer};
use scim_provisioner::multi_tenant::{AuthMode, TenantSettings};
use serde_json::json;

fn users_uri() -> String {
    format!("/scim/v2/{}/Users", TENANT)
}

#[tokio::test]
async fn test_missing_or_malformed_token_is_unauthorized() {
    let server = TestServer::start().await;

    let missing = server.send(Method::GET, &users_uri(), None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.header(header::WWW_AUTHENTICATE), Some("Bearer"));
    assert_eq!(missing.body["status"], "401");

    let garbage = server
        .send(Method::GET, &users_uri(), Some("not.a.jwt"), None)
        .await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tokens_missing_issuer_or_audience_are_rejected() {
    let server = TestServer::start().await;
    let exp = common::now() + 300;

    let no_issuer = common::sign(&json!({"sub": "svc", "aud": AUDIENCE, "exp": exp}));
    let response = server
        .send(Method::GET, &users_uri(), Some(&no_issuer), None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let no_audience = common::sign(&json!({"sub": "svc", "iss": ISSUER, "exp": exp}));
    let response = server
        .send(Method::GET, &users_uri(), Some(&no_audience), None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let complete = common::sign(&json!({"sub": "svc", "iss": ISSUER, "aud": AUDIENCE, "exp": exp}));
    let response = server
        .send(Method::GET, &users_uri(), Some(&complete), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_audience_leaves_directory_untouched() {
    let server = TestServer::start().await;
    let before = server.directory.stats().await;

    let token = common::token_for_audience("some-other-api");
    let response = server
        .send(
            Method::POST,
            &users_uri(),
            Some(&token),
            Some(&fixtures::user("mallory")),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["detail"], "Unauthorized");
    assert_eq!(server.directory.stats().await, before);
}

#[tokio::test]
async fn test_wrong_issuer_is_rejected() {
    let server = TestServer::start().await;
    let token = common::issuer()
        .mint(MintRequest {
            iss: Some("https://elsewhere.test".to_string()),
            ..Default::default()
        })
        .unwrap()
        .access_token;

    let response = server
        .send(Method::GET, &users_uri(), Some(&token), None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_from_unknown_key_is_rejected() {
    let server = TestServer::start().await;
    let stranger = TokenIssuer::generate(IssuerSettings::new(ISSUER, AUDIENCE)).unwrap();
    let token = stranger.mint(MintRequest::default()).unwrap().access_token;

    let response = server
        .send(Method::GET, &users_uri(), Some(&token), None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    // first download plus one refetch for the unknown kid
    assert_eq!(server.jwks.fetch_count(), 2);
}

#[tokio::test]
async fn test_validator_and_key_set_are_reused() {
    let server = TestServer::start().await;

    for _ in 0..3 {
        let response = server.scim(Method::GET, "/Users", None).await;
        assert_eq!(response.status, StatusCode::OK);
    }

    assert_eq!(server.validators.build_count(), 1);
    assert_eq!(server.jwks.fetch_count(), 1);
}

#[tokio::test]
async fn test_concurrent_first_requests_share_one_validator() {
    let server = TestServer::start().await;

    let requests = (0..8).map(|_| server.scim(Method::GET, "/Users", None));
    let responses = futures::future::join_all(requests).await;

    assert!(responses.iter().all(|r| r.status == StatusCode::OK));
    assert_eq!(server.validators.build_count(), 1);
    assert_eq!(server.jwks.fetch_count(), 1);
}

#[tokio::test]
async fn test_changed_jwks_uri_rebuilds_validator() {
    let server = TestServer::start().await;
    assert_eq!(
        server.scim(Method::GET, "/Users", None).await.status,
        StatusCode::OK
    );

    let moved = TenantSettings::external(TENANT, ISSUER, server.jwks.url("/keys2"), AUDIENCE);
    server.resolver.upsert_tenant(moved).await.unwrap();

    assert_eq!(
        server.scim(Method::GET, "/Users", None).await.status,
        StatusCode::OK
    );
    assert_eq!(server.validators.build_count(), 2);
    assert_eq!(server.jwks.fetch_count(), 2);

    // settled again
    server.scim(Method::GET, "/Users", None).await;
    assert_eq!(server.validators.build_count(), 2);
}

#[tokio::test]
async fn test_wildcard_audience_accepts_any_audience() {
    let jwks = JwksServer::start().await;
    let tenant = TenantSettings::external("dev", ISSUER, jwks.url("/keys"), "*");
    let server = TestServer::with_tenants(jwks, vec![tenant]).await;

    let token = common::token_for_audience("anything-at-all");
    let response = server
        .send(Method::GET, "/scim/v2/dev/Users", Some(&token), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_tenants_do_not_share_audiences() {
    let jwks = JwksServer::start().await;
    let tenants = vec![
        TenantSettings::external("acme", ISSUER, jwks.url("/keys"), AUDIENCE),
        TenantSettings::external("globex", ISSUER, jwks.url("/keys"), "globex-api"),
    ];
    let server = TestServer::with_tenants(jwks, tenants).await;
    let acme_token = common::token();

    let acme = server
        .send(Method::GET, "/scim/v2/acme/Users", Some(&acme_token), None)
        .await;
    let globex = server
        .send(Method::GET, "/scim/v2/globex/Users", Some(&acme_token), None)
        .await;

    assert_eq!(acme.status, StatusCode::OK);
    assert_eq!(globex.status, StatusCode::UNAUTHORIZED);
    assert_eq!(server.validators.build_count(), 2);
}

#[tokio::test]
async fn test_directory_native_tenant_is_a_server_error() {
    let jwks = JwksServer::start().await;
    let mut tenant = TenantSettings::external("native", ISSUER, jwks.url("/keys"), AUDIENCE);
    tenant.auth.mode = AuthMode::DirectoryNative;
    let server = TestServer::with_tenants(jwks, vec![tenant]).await;

    let response = server
        .send(
            Method::GET,
            "/scim/v2/native/Users",
            Some(&common::token()),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["detail"], "Server configuration error");
    assert_eq!(server.jwks.fetch_count(), 0);
}

#[tokio::test]
async fn test_issuer_endpoints() {
    let server = TestServer::start().await;

    let keys = server
        .send(Method::GET, "/discovery/v2.0/keys", None, None)
        .await;
    assert_eq!(keys.status, StatusCode::OK);
    assert_eq!(keys.body["keys"][0]["kid"], common::issuer().kid());
    assert_eq!(keys.body["keys"][0]["kty"], "RSA");

    let minted = server.send(Method::POST, "/token", None, None).await;
    assert_eq!(minted.status, StatusCode::OK);
    assert_eq!(minted.body["token_type"], "Bearer");
    assert_eq!(minted.body["aud"], AUDIENCE);
    let token = minted.body["access_token"].as_str().unwrap().to_string();

    let users = server
        .send(Method::GET, &users_uri(), Some(&token), None)
        .await;
    assert_eq!(users.status, StatusCode::OK);

    let too_long = server
        .send(Method::POST, "/token", None, Some(&json!({"ttlSec": 86_401})))
        .await;
    assert_eq!(too_long.status, StatusCode::BAD_REQUEST);

    let custom = server
        .send(
            Method::POST,
            "/token",
            None,
            Some(&json!({"oid": "svc-1", "ttlSec": 60})),
        )
        .await;
    assert_eq!(custom.body["oid"], "svc-1");
    assert_eq!(custom.body["expires_in"], 60);
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::start().await;
    let response = server.send(Method::GET, "/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}
