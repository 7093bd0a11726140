//! Test request building.

use bytes::Bytes;
use gapi_core::APPLICATION_JSON;
use gapi_middleware::Request;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use serde::Serialize;

use crate::error::TestError;

/// Shortcuts for starting a [`TestRequestBuilder`].
#[derive(Debug, Clone, Copy)]
pub struct TestRequest;

impl TestRequest {
    /// Starts a GET request.
    pub fn get(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::GET, uri)
    }

    /// Starts a POST request.
    pub fn post(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::POST, uri)
    }

    /// Starts a PUT request.
    pub fn put(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PUT, uri)
    }

    /// Starts a PATCH request.
    pub fn patch(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PATCH, uri)
    }

    /// Starts a DELETE request.
    pub fn delete(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::DELETE, uri)
    }
}

/// Builder for an in-memory request.
///
/// Invalid headers or unserializable bodies do not fail immediately; the
/// first problem is reported by [`build`](Self::build).
#[must_use]
#[derive(Debug)]
pub struct TestRequestBuilder {
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Bytes,
    error: Option<TestError>,
}

impl TestRequestBuilder {
    /// Creates a builder.
    pub fn new(method: Method, uri: impl AsRef<str>) -> Self {
        Self {
            method,
            uri: uri.as_ref().to_string(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            error: None,
        }
    }

    fn fail(&mut self, err: TestError) {
        self.error.get_or_insert(err);
    }

    /// Sets a header.
    ///
    /// ```
    /// use gapi_test::TestRequest;
    ///
    /// let request = TestRequest::get("/users")
    ///     .header("X-Request-ID", "abc")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(request.headers()["x-request-id"], "abc");
    /// ```
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = HeaderName::try_from(name.as_ref());
        let value = HeaderValue::try_from(value.as_ref());
        match (name, value) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            (Err(e), _) => self.fail(TestError::InvalidHeader(e.to_string())),
            (_, Err(e)) => self.fail(TestError::InvalidHeader(e.to_string())),
        }
        self
    }

    /// Sets the `Content-Type` header.
    pub fn content_type(self, content_type: impl AsRef<str>) -> Self {
        self.header(header::CONTENT_TYPE.as_str(), content_type)
    }

    /// Sets the `Accept` header.
    pub fn accept(self, accept: impl AsRef<str>) -> Self {
        self.header(header::ACCEPT.as_str(), accept)
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body and `Content-Type: application/json`.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.body = Bytes::from(bytes),
            Err(e) => self.fail(TestError::Json(e)),
        }
        self.content_type(APPLICATION_JSON)
    }

    /// Appends `value` to the URI as a form-encoded query string.
    pub fn query<T: Serialize>(mut self, value: &T) -> Self {
        match serde_urlencoded::to_string(value) {
            Ok(query) if query.is_empty() => {}
            Ok(query) => {
                self.uri.push(if self.uri.contains('?') { '&' } else { '?' });
                self.uri.push_str(&query);
            }
            Err(e) => self.fail(TestError::RequestBuild(format!("invalid query: {e}"))),
        }
        self
    }

    /// Builds the request.
    ///
    /// # Errors
    ///
    /// Returns the first error recorded while building, or an error for an
    /// unparsable URI.
    pub fn build(self) -> Result<Request, TestError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let uri: Uri = self
            .uri
            .parse()
            .map_err(|e| TestError::RequestBuild(format!("invalid URI: {e}")))?;

        let mut request = http::Request::new(self.body);
        *request.method_mut() = self.method;
        *request.uri_mut() = uri;
        *request.headers_mut() = self.headers;
        Ok(request)
    }
}
