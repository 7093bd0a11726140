//! Collected responses and their assertions.
//!
//! The `assert_*` helpers panic with the body in the message and return
//! `&Self`, so checks chain:
//!
//! ```
//! use bytes::Bytes;
//! use gapi_test::TestResponse;
//! use http::{HeaderMap, StatusCode};
//!
//! let response = TestResponse::new(
//!     StatusCode::NOT_FOUND,
//!     HeaderMap::new(),
//!     Bytes::from_static(br#"{"message":"user 9 not found","kind":"user_not_found"}"#),
//! );
//! response
//!     .assert_status(StatusCode::NOT_FOUND)
//!     .assert_error_kind("user_not_found")
//!     .assert_json_field("message", &serde_json::json!("user 9 not found"));
//! ```

use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;
use gapi_core::ErrorBody;
use gapi_middleware::{Response, REQUEST_ID_HEADER};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::TestError;

/// A fully buffered response.
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Buffers an application response.
    ///
    /// # Errors
    ///
    /// Fails if the body cannot be collected.
    pub async fn from_response(response: Response) -> Result<Self, TestError> {
        let (parts, body) = response.into_parts();
        let collected = body
            .collect()
            .await
            .map_err(|e| TestError::BodyRead(e.to_string()))?;
        Ok(Self::new(parts.status, parts.headers, collected.to_bytes()))
    }

    /// Builds a response from its parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Response status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header as text; `None` when missing or not visible ASCII.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// The `Content-Type` header.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(CONTENT_TYPE.as_str())
    }

    /// The `X-Request-ID` set by the tracing stage.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.header_str(REQUEST_ID_HEADER)
    }

    /// Raw body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The body as UTF-8.
    ///
    /// # Errors
    ///
    /// Fails on invalid UTF-8.
    pub fn text(&self) -> Result<String, TestError> {
        std::str::from_utf8(&self.body)
            .map(ToString::to_string)
            .map_err(|e| TestError::BodyRead(format!("body is not UTF-8: {e}")))
    }

    /// Decodes a JSON body.
    ///
    /// # Errors
    ///
    /// Fails if the body does not decode into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Decodes a JSON body of any shape.
    ///
    /// # Errors
    ///
    /// Fails if the body is not JSON.
    pub fn json_value(&self) -> Result<Value, TestError> {
        self.json()
    }

    /// Decodes the `{"message", "kind"}` error body.
    ///
    /// # Errors
    ///
    /// Fails if the body is not a JSON error body.
    pub fn error_body(&self) -> Result<ErrorBody, TestError> {
        self.json()
    }

    /// # Panics
    ///
    /// Panics on another status.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        if self.status != expected {
            self.fail(format_args!("expected status {expected}, got {}", self.status));
        }
        self
    }

    /// # Panics
    ///
    /// Panics on a non-2xx status.
    pub fn assert_success(&self) -> &Self {
        if !self.is_success() {
            self.fail(format_args!("expected a 2xx status, got {}", self.status));
        }
        self
    }

    /// # Panics
    ///
    /// Panics if the header is missing or has another value.
    pub fn assert_header(&self, name: impl AsRef<str>, expected: impl AsRef<str>) -> &Self {
        let (name, expected) = (name.as_ref(), expected.as_ref());
        match self.header_str(name) {
            Some(actual) if actual == expected => {}
            actual => self.fail(format_args!("header {name}: expected {expected}, got {actual:?}")),
        }
        self
    }

    /// Checks the media type, ignoring parameters such as `charset`.
    ///
    /// # Panics
    ///
    /// Panics if `Content-Type` is missing or does not start with `expected`.
    pub fn assert_content_type(&self, expected: impl AsRef<str>) -> &Self {
        let expected = expected.as_ref();
        match self.content_type() {
            Some(actual) if actual.starts_with(expected) => {}
            actual => self.fail(format_args!("content type: expected {expected}, got {actual:?}")),
        }
        self
    }

    /// # Panics
    ///
    /// Panics if the body does not contain `needle`.
    pub fn assert_body_contains(&self, needle: impl AsRef<str>) -> &Self {
        let needle = needle.as_ref();
        if !self.lossy_body().contains(needle) {
            self.fail(format_args!("body does not contain {needle:?}"));
        }
        self
    }

    /// # Panics
    ///
    /// Panics if the body differs from `expected`.
    pub fn assert_body_eq(&self, expected: impl AsRef<str>) -> &Self {
        let expected = expected.as_ref();
        if self.lossy_body() != expected {
            self.fail(format_args!("expected body {expected:?}"));
        }
        self
    }

    /// # Panics
    ///
    /// Panics if the body is not JSON or differs from `expected`.
    pub fn assert_json_eq(&self, expected: &Value) -> &Self {
        let actual = self.decoded();
        if &actual != expected {
            self.fail(format_args!("expected JSON {expected}"));
        }
        self
    }

    /// Checks one JSON value addressed by a dotted path; numeric segments
    /// index arrays (`users.0.name`).
    ///
    /// # Panics
    ///
    /// Panics if the path is missing or holds another value.
    pub fn assert_json_field(&self, path: impl AsRef<str>, expected: &Value) -> &Self {
        let path = path.as_ref();
        let json = self.decoded();
        match lookup(&json, path) {
            Some(actual) if actual == expected => {}
            Some(actual) => self.fail(format_args!("{path}: expected {expected}, got {actual}")),
            None => self.fail(format_args!("{path}: not found")),
        }
        self
    }

    /// # Panics
    ///
    /// Panics if the body is not an error body of `kind`.
    pub fn assert_error_kind(&self, kind: impl AsRef<str>) -> &Self {
        let kind = kind.as_ref();
        match self.error_body() {
            Ok(body) if body.kind == kind => {}
            Ok(body) => self.fail(format_args!("error kind mismatch: expected {kind}, got {}", body.kind)),
            Err(e) => self.fail(format_args!("expected an error body of kind {kind}: {e}")),
        }
        self
    }

    fn decoded(&self) -> Value {
        match self.json_value() {
            Ok(value) => value,
            Err(e) => self.fail(format_args!("body is not JSON: {e}")),
        }
    }

    fn lossy_body(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    fn fail(&self, reason: fmt::Arguments<'_>) -> ! {
        panic!("{reason}\n  status: {}\n  body: {}", self.status, self.lossy_body())
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &self.lossy_body())
            .finish()
    }
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |node, segment| match segment.parse::<usize>() {
            Ok(index) => node.get(index),
            Err(_) => node.get(segment),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde_json::json;

    fn json_response(status: StatusCode, body: &'static str) -> TestResponse {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
        TestResponse::new(status, headers, Bytes::from_static(body.as_bytes()))
    }

    #[test]
    fn test_accessors() {
        let response = json_response(StatusCode::OK, r#"{"name":"Alice","age":30}"#);
        assert!(response.is_success());
        assert_eq!(response.content_type(), Some("application/json; charset=utf-8"));
        assert_eq!(response.text().unwrap(), r#"{"name":"Alice","age":30}"#);

        let value = response.json_value().unwrap();
        assert_eq!(value["age"], 30);
    }

    #[test]
    fn test_chained_assertions() {
        json_response(StatusCode::CREATED, r#"{"user":{"name":"Alice","tags":["admin"]}}"#)
            .assert_success()
            .assert_status(StatusCode::CREATED)
            .assert_content_type("application/json")
            .assert_header("content-type", "application/json; charset=utf-8")
            .assert_body_contains("Alice")
            .assert_json_field("user.tags.0", &json!("admin"))
            .assert_json_eq(&json!({"user": {"name": "Alice", "tags": ["admin"]}}));
    }

    #[test]
    fn test_error_body() {
        let response = json_response(
            StatusCode::NOT_FOUND,
            r#"{"message":"no such user","kind":"user_not_found"}"#,
        );
        assert!(!response.is_success());
        assert_eq!(response.error_body().unwrap().message, "no such user");
        response.assert_error_kind("user_not_found");
    }

    #[test]
    #[should_panic(expected = "error kind mismatch")]
    fn test_assert_error_kind_mismatch() {
        json_response(StatusCode::BAD_REQUEST, r#"{"message":"x","kind":"missing_param"}"#)
            .assert_error_kind("invalid_body");
    }

    #[test]
    #[should_panic(expected = "expected status 200 OK, got 404 Not Found")]
    fn test_assert_status_mismatch() {
        json_response(StatusCode::NOT_FOUND, "{}").assert_status(StatusCode::OK);
    }

    #[test]
    #[should_panic(expected = "missing.path: not found")]
    fn test_assert_json_field_missing() {
        json_response(StatusCode::OK, "{}").assert_json_field("missing.path", &json!(1));
    }

    #[test]
    fn test_request_id() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("abc"));
        let response = TestResponse::new(StatusCode::NO_CONTENT, headers, Bytes::new());
        assert_eq!(response.request_id(), Some("abc"));
        response.assert_body_eq("");
    }

    #[tokio::test]
    async fn test_from_response() {
        let response = http::Response::builder()
            .status(StatusCode::ACCEPTED)
            .body(http_body_util::Full::new(Bytes::from_static(b"done")))
            .unwrap();
        let response = TestResponse::from_response(response).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        response.assert_body_eq("done");
    }

    #[test]
    fn test_lookup() {
        let value = json!({"users": [{"name": "Alice"}], "total": 1});
        assert_eq!(lookup(&value, "users.0.name"), Some(&json!("Alice")));
        assert_eq!(lookup(&value, "total"), Some(&json!(1)));
        assert_eq!(lookup(&value, "users.3"), None);
    }
}
