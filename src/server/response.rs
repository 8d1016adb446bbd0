//! SCIM response shaping.
//!
//! Every SCIM response, success or failure, is JSON with
//! `Content-Type: application/scim+json`.

use crate::error::ScimError;
use crate::schema::ERROR_URN;
use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};

pub const SCIM_CONTENT_TYPE: &str = "application/scim+json";

/// A SCIM JSON body with status and the optional `Location` / `ETag` headers.
#[derive(Debug)]
pub struct ScimJson<T> {
    body: T,
    status: StatusCode,
    location: Option<String>,
    etag: Option<String>,
}

impl<T: Serialize> ScimJson<T> {
    pub fn ok(body: T) -> Self {
        Self {
            body,
            status: StatusCode::OK,
            location: None,
            etag: None,
        }
    }
}

impl ScimJson<Value> {
    /// A single resource: `ETag` from `meta.version`.
    pub fn resource(body: Value) -> Self {
        let etag = meta_field(&body, "version");
        Self {
            etag,
            ..Self::ok(body)
        }
    }

    /// A newly created resource: `201`, `Location` from `meta.location`.
    pub fn created(body: Value) -> Self {
        let location = meta_field(&body, "location");
        Self {
            status: StatusCode::CREATED,
            location,
            ..Self::resource(body)
        }
    }
}

fn meta_field(body: &Value, field: &str) -> Option<String> {
    body.get("meta")
        .and_then(|meta| meta.get(field))
        .and_then(Value::as_str)
        .map(str::to_string)
}

impl<T: Serialize> IntoResponse for ScimJson<T> {
    fn into_response(self) -> Response {
        let body = match serde_json::to_vec(&self.body) {
            Ok(body) => body,
            Err(e) => {
                return ScimError::internal(format!("Failed to serialize response: {}", e))
                    .into_response();
            }
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(SCIM_CONTENT_TYPE),
        );
        if let Some(value) = self.location.and_then(|l| HeaderValue::from_str(&l).ok()) {
            headers.insert(header::LOCATION, value);
        }
        if let Some(value) = self.etag.and_then(|e| HeaderValue::from_str(&e).ok()) {
            headers.insert(header::ETAG, value);
        }
        (self.status, headers, body).into_response()
    }
}

impl IntoResponse for ScimError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            log::error!("Request failed: {}", self);
        }

        let mut body = json!({
            "schemas": [ERROR_URN],
            "status": status.as_u16().to_string(),
            "detail": self.detail(),
        });
        if let Some(scim_type) = self.scim_type() {
            body["scimType"] = Value::String(scim_type.to_string());
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(SCIM_CONTENT_TYPE),
        );
        if status == StatusCode::UNAUTHORIZED {
            headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        (status, headers, body.to_string()).into_response()
    }
}

/// Parse a request body as JSON; anything else is `400 invalidSyntax`.
pub fn parse_json(body: &Bytes) -> Result<Value, ScimError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ScimError::invalid_request("Request body is empty"));
    }
    serde_json::from_slice(body)
        .map_err(|e| ScimError::invalid_request(format!("Request body is not valid JSON: {}", e)))
}
