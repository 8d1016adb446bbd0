//! Shared harness for the integration tests.
//!
//! [`TestServer`] wires the real router over an in-memory directory and a
//! JWKS endpoint served on an ephemeral local port by [`JwksServer`], so the
//! whole path from `Authorization` header to directory write is exercised.

#![allow(dead_code)]

pub mod fixtures;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use axum::routing::get;
use http_body_util::BodyExt;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rsa::RsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use scim_provisioner::auth::ValidatorRegistry;
use scim_provisioner::directory::InMemoryDirectory;
use scim_provisioner::issuer::{IssuerSettings, MintRequest, TokenIssuer};
use scim_provisioner::multi_tenant::{StaticTenantResolver, TenantSettings};
use scim_provisioner::schema::SchemaRegistry;
use scim_provisioner::server::{AppState, router};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tower::ServiceExt;

pub const ISSUER: &str = "https://issuer.test";
pub const AUDIENCE: &str = "scim-api";
pub const TENANT: &str = "acme";
pub const BASE_URL: &str = "https://scim.test";

/// One signing key per test binary; RSA key generation is slow.
fn signing_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::rngs::OsRng, 2048).unwrap())
}

pub fn issuer() -> Arc<TokenIssuer> {
    static ISSUER_INSTANCE: OnceLock<Arc<TokenIssuer>> = OnceLock::new();
    Arc::clone(ISSUER_INSTANCE.get_or_init(|| {
        Arc::new(
            TokenIssuer::with_key(IssuerSettings::new(ISSUER, AUDIENCE), signing_key()).unwrap(),
        )
    }))
}

/// Sign arbitrary claims with the issuer's key, for tokens the issuer
/// itself would never mint.
pub fn sign(claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(issuer().kid().to_string());
    let pem = signing_key().to_pkcs8_pem(LineEnding::LF).unwrap();
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap();
    jsonwebtoken::encode(&header, claims, &key).unwrap()
}

pub fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// A token the default tenant accepts.
pub fn token() -> String {
    issuer().mint(MintRequest::default()).unwrap().access_token
}

pub fn token_for_audience(audience: &str) -> String {
    issuer()
        .mint(MintRequest {
            aud: Some(audience.to_string()),
            ..Default::default()
        })
        .unwrap()
        .access_token
}

/// Serves the issuer's key set at `/keys` and `/keys2`, counting downloads.
pub struct JwksServer {
    pub base: String,
    fetches: Arc<AtomicUsize>,
}

impl JwksServer {
    pub async fn start() -> Self {
        let fetches = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fetches);
        let keys = move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                axum::Json(issuer().jwks())
            }
        };
        let app = Router::new()
            .route("/keys", get(keys.clone()))
            .route("/keys2", get(keys));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{}", addr),
            fetches,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

pub struct TestServer {
    pub app: Router,
    pub directory: Arc<InMemoryDirectory>,
    pub resolver: Arc<StaticTenantResolver<InMemoryDirectory>>,
    pub validators: Arc<ValidatorRegistry>,
    pub jwks: JwksServer,
}

impl TestServer {
    /// Server with the default tenant trusting [`issuer`].
    pub async fn start() -> Self {
        let jwks = JwksServer::start().await;
        let tenant = TenantSettings::external(TENANT, ISSUER, jwks.url("/keys"), AUDIENCE);
        Self::with_tenants(jwks, vec![tenant]).await
    }

    pub async fn with_tenants(jwks: JwksServer, tenants: Vec<TenantSettings>) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let directory = Arc::new(InMemoryDirectory::new());
        let resolver =
            Arc::new(StaticTenantResolver::new(tenants, Arc::clone(&directory)).unwrap());
        let validators = Arc::new(ValidatorRegistry::new(16));
        let state = AppState::new(
            Arc::clone(&resolver),
            Arc::new(SchemaRegistry::with_embedded_schemas().unwrap()),
            Arc::clone(&validators),
            BASE_URL,
        )
        .with_issuer(issuer());

        Self {
            app: router(state),
            directory,
            resolver,
            validators,
            jwks,
        }
    }

    /// Send a request with an optional bearer token and JSON body.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/scim+json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send_request(request).await
    }

    pub async fn send_request(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Authenticated request against the default tenant's SCIM root.
    pub async fn scim(&self, method: Method, path: &str, body: Option<&Value>) -> TestResponse {
        let uri = format!("/scim/v2/{}{}", TENANT, path);
        self.send(method, &uri, Some(&token()), body).await
    }
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
