//! In-memory response sink.
//!
//! Every request, whether it arrived over a socket or was replayed from a
//! tool call, writes its response into a [`ResponseRecorder`]. The transport
//! turns the recording into whatever it sends back.

use bytes::{Bytes, BytesMut};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;

use crate::types::Response;

/// Captures status, headers and body written by the pipeline.
///
/// The status line and headers are committed by the first body write or an
/// explicit [`write_status`](Self::write_status); later status changes are
/// refused.
#[derive(Debug, Default)]
pub struct ResponseRecorder {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Commits the status code.
    ///
    /// Returns `false` and leaves the recording untouched when a status was
    /// already committed.
    pub fn write_status(&mut self, status: StatusCode) -> bool {
        if self.status.is_some() {
            return false;
        }
        self.status = Some(status);
        true
    }

    /// Sets a header. Ignored once the status is committed.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> bool {
        if self.status.is_some() {
            return false;
        }
        self.headers.insert(name, value);
        true
    }

    /// Appends to the body, committing a 200 status if none was written.
    pub fn write(&mut self, chunk: &[u8]) {
        self.status.get_or_insert(StatusCode::OK);
        self.body.extend_from_slice(chunk);
    }

    /// Whether the status line has been committed.
    pub fn is_committed(&self) -> bool {
        self.status.is_some()
    }

    /// Recorded status; 200 when nothing was written.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Recorded headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable headers, for transport-level headers added after the pipeline.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Recorded body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Recorded body as text, replacing invalid UTF-8.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Consumes the recorder, returning the body.
    pub fn into_body(self) -> Bytes {
        self.body.freeze()
    }

    /// Builds the HTTP response.
    pub fn into_response(self) -> Response {
        let mut response = http::Response::new(Full::new(self.body.freeze()));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;

    #[test]
    fn test_default_is_empty_ok() {
        let rec = ResponseRecorder::new();
        assert!(!rec.is_committed());
        assert_eq!(rec.status(), StatusCode::OK);
        assert!(rec.body().is_empty());
    }

    #[test]
    fn test_status_written_once() {
        let mut rec = ResponseRecorder::new();
        assert!(rec.write_status(StatusCode::NOT_FOUND));
        assert!(!rec.write_status(StatusCode::OK));
        assert_eq!(rec.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_write_commits_ok() {
        let mut rec = ResponseRecorder::new();
        rec.write(b"hello ");
        rec.write(b"world");
        assert!(rec.is_committed());
        assert!(!rec.set_header(CONTENT_TYPE, HeaderValue::from_static("text/plain")));
        assert_eq!(rec.body_text(), "hello world");
    }

    #[test]
    fn test_into_response() {
        let mut rec = ResponseRecorder::new();
        rec.set_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        rec.write_status(StatusCode::CREATED);
        rec.write(b"{}");
        let response = rec.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    }
}
