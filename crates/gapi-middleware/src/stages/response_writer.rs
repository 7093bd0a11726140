//! Response writing and content negotiation.
//!
//! The [`ResponseWriter`] turns the chain's [`HandlerResult`] into a recorded
//! response:
//!
//! | Result | Status | Body |
//! |--------|--------|------|
//! | `Err(e)` | `e.status()` | `{"message","kind"}` via the negotiated codec |
//! | `Ok(Reply::Empty)` | 204 | none |
//! | `Ok(Reply::Raw { .. })` | 200 | bytes as-is |
//! | `Ok(Reply::Value(_))` | 200 | negotiated codec |
//!
//! The codec is chosen as follows:
//!
//! 1. a forced media type, when the registry has one;
//! 2. the default media type, when `Accept` is absent or only `*/*`;
//! 3. the registered media type with the highest `q` among the `Accept`
//!    ranges, where the most specific matching range sets the weight.
//!
//! When nothing matches, a 406 `unsupported_content_type` error is written
//! with the default codec.

use std::sync::Arc;

use bytes::Bytes;
use gapi_core::{kinds, ApiError, Codec, CodecRegistry, HandlerResult, Reply};
use gapi_docs::{Describe, DocBuilder, DocsResult, ResponseOptions, Schema};
use gapi_telemetry::log_error;
use http::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use http::StatusCode;

use crate::context::RequestContext;
use crate::middleware::{Middleware, Next};
use crate::types::{BoxFuture, Request};

/// One parsed `Accept` entry.
#[derive(Debug, Clone, PartialEq)]
struct MediaRange {
    range: String,
    quality: f32,
}

impl MediaRange {
    /// 3 for `type/sub`, 2 for `type/*`, 1 for `*/*`, `None` when it does not
    /// cover `media_type`.
    fn specificity(&self, media_type: &str) -> Option<u8> {
        if self.range == "*/*" {
            return Some(1);
        }
        let (range_type, range_sub) = self.range.split_once('/')?;
        let (media_main, _) = media_type.split_once('/')?;
        if range_sub == "*" {
            return (range_type == media_main).then_some(2);
        }
        (self.range == media_type).then_some(3)
    }
}

fn parse_accept(header: &str) -> Vec<MediaRange> {
    header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let range = parts.next()?.trim().to_ascii_lowercase();
            if !range.contains('/') {
                return None;
            }
            let quality = parts
                .filter_map(|param| param.trim().strip_prefix("q="))
                .find_map(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0)
                .clamp(0.0, 1.0);
            Some(MediaRange { range, quality })
        })
        .collect()
}

/// Chooses the response codec for an `Accept` header.
///
/// # Errors
///
/// Returns a 406 `unsupported_content_type` error when no registered codec
/// is acceptable, or when a forced media type has no codec.
pub fn negotiate<'r>(
    registry: &'r CodecRegistry,
    accept: Option<&str>,
) -> Result<&'r Arc<dyn Codec>, ApiError> {
    if let Some(forced) = registry.forced_type() {
        return registry.get(forced).ok_or_else(|| not_acceptable(forced));
    }

    let ranges = accept.map(parse_accept).unwrap_or_default();
    let wildcard = ranges.iter().all(|r| r.range == "*/*" && r.quality > 0.0);
    if wildcard {
        if let Some(codec) = registry.default_codec() {
            return Ok(codec);
        }
    }

    let mut best: Option<(&Arc<dyn Codec>, f32)> = None;
    for codec in registry.codecs() {
        let media_type = codec.media_type();
        let quality = if ranges.is_empty() {
            1.0
        } else {
            ranges
                .iter()
                .filter_map(|r| r.specificity(media_type).map(|s| (s, r.quality)))
                .max_by_key(|(specificity, _)| *specificity)
                .map_or(0.0, |(_, q)| q)
        };
        if quality <= 0.0 {
            continue;
        }
        let better = match best {
            None => true,
            Some((current, q)) => {
                quality > q
                    || (quality == q
                        && registry.default_type() == Some(media_type)
                        && registry.default_type() != Some(current.media_type()))
            }
        };
        if better {
            best = Some((codec, quality));
        }
    }

    best.map(|(codec, _)| codec)
        .ok_or_else(|| not_acceptable(accept.unwrap_or_default()))
}

fn not_acceptable(accept: &str) -> ApiError {
    ApiError::not_acceptable(
        kinds::UNSUPPORTED_CONTENT_TYPE,
        format!("no encoder available for accept {accept}"),
    )
}

/// A response ready to be recorded.
struct Rendered {
    status: StatusCode,
    content_type: Option<String>,
    body: Bytes,
}

/// Middleware writing the chain's result to the response recorder.
#[derive(Clone)]
pub struct ResponseWriter {
    codecs: Arc<CodecRegistry>,
    response: Option<Schema>,
}

impl ResponseWriter {
    /// Creates a writer using `codecs`.
    pub fn new(codecs: Arc<CodecRegistry>) -> Self {
        Self {
            codecs,
            response: None,
        }
    }

    /// Declares the success response schema for documentation.
    #[must_use]
    pub fn with_response(mut self, schema: Schema) -> Self {
        self.response = Some(schema);
        self
    }

    /// Codec registry in use.
    pub fn codecs(&self) -> &Arc<CodecRegistry> {
        &self.codecs
    }

    fn render(&self, accept: Option<&str>, result: HandlerResult) -> Rendered {
        match result {
            Ok(Reply::Empty) => Rendered {
                status: StatusCode::NO_CONTENT,
                content_type: None,
                body: Bytes::new(),
            },
            Ok(Reply::Raw { body, content_type }) => Rendered {
                status: StatusCode::OK,
                content_type,
                body,
            },
            Ok(Reply::Value(value)) => {
                let codec = match negotiate(&self.codecs, accept) {
                    Ok(codec) => codec,
                    Err(err) => {
                        log_error(&err);
                        return self.render_error(None, &err);
                    }
                };
                match codec.encode(&*value) {
                    Ok(body) => Rendered {
                        status: StatusCode::OK,
                        content_type: Some(codec.media_type().to_string()),
                        body: Bytes::from(body),
                    },
                    Err(cause) => {
                        let err = ApiError::wrap_raw(cause, "failed to encode response")
                            .with_kind(kinds::INTERNAL_ERROR);
                        log_error(&err);
                        self.render_error(accept, &err)
                    }
                }
            }
            Err(err) => self.render_error(accept, &err),
        }
    }

    fn render_error(&self, accept: Option<&str>, err: &ApiError) -> Rendered {
        let codec = negotiate(&self.codecs, accept)
            .ok()
            .or_else(|| self.codecs.default_codec())
            .or_else(|| self.codecs.codecs().next());
        let body = err.body();

        match codec.map(|c| (c, c.encode(&body))) {
            Some((codec, Ok(encoded))) => Rendered {
                status: err.status(),
                content_type: Some(codec.media_type().to_string()),
                body: Bytes::from(encoded),
            },
            _ => Rendered {
                status: err.status(),
                content_type: Some(mime::TEXT_PLAIN_UTF_8.to_string()),
                body: Bytes::from(body.message),
            },
        }
    }

    fn commit(ctx: &mut RequestContext, rendered: Rendered) {
        let recorder = ctx.recorder_mut();
        if recorder.is_committed() {
            tracing::warn!(
                http.status_code = rendered.status.as_u16(),
                committed = recorder.status().as_u16(),
                "response already written, dropping result"
            );
            return;
        }

        if let Some(content_type) = rendered.content_type {
            match HeaderValue::from_str(&content_type) {
                Ok(value) => {
                    recorder.set_header(CONTENT_TYPE, value);
                }
                Err(err) => tracing::warn!(%content_type, error = %err, "invalid content type"),
            }
        }
        recorder.write_status(rendered.status);
        if !rendered.body.is_empty() {
            recorder.write(&rendered.body);
        }
    }
}

impl Middleware for ResponseWriter {
    fn name(&self) -> &'static str {
        "response_writer"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let accept = request
                .headers()
                .get(ACCEPT)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string);

            let result = next.run(ctx, request).await;
            let rendered = self.render(accept.as_deref(), result);
            Self::commit(ctx, rendered);
            Ok(Reply::Empty)
        })
    }

    fn as_describe(&self) -> Option<&dyn Describe> {
        Some(self)
    }
}

impl Describe for ResponseWriter {
    fn describe(&self, builder: &mut DocBuilder) -> DocsResult<()> {
        if let Some(schema) = &self.response {
            for media_type in self.codecs.media_types() {
                builder.with_response(
                    Some(schema.clone()),
                    ResponseOptions::new().mime_type(media_type),
                );
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ResponseWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseWriter")
            .field("media_types", &self.codecs.media_types().collect::<Vec<_>>())
            .field("response", &self.response.is_some())
            .finish()
    }
}
