//! Request body decoding and validation.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use gapi_core::{kinds, ApiError, CodecRegistry, HandlerResult};
use gapi_docs::{BodyOptions, Describe, DocBuilder, DocsResult};
use gapi_extract::{bind_body, validate_fields, Bindable};
use http::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::context::{Body, RequestContext};
use crate::middleware::{Middleware, Next};
use crate::types::{BoxFuture, Request};

/// Decodes the request body into `T`, stored as [`Body<T>`].
///
/// The codec is resolved from `Content-Type` (or the registry's forced and
/// default types). After decoding, field rules run depth first and then
/// [`Bindable::validate`] unless validation is skipped. The raw body stays on
/// the request, so the handler can read it again.
///
/// An empty body on a type with required fields fails with `missing_param`
/// naming the first required field.
pub struct BodyDecoder<T> {
    codecs: Arc<CodecRegistry>,
    skip_validation: bool,
    options: BodyOptions,
    _marker: PhantomData<fn() -> T>,
}

impl<T> BodyDecoder<T> {
    /// Creates a decoder using `codecs`.
    pub fn new(codecs: Arc<CodecRegistry>) -> Self {
        Self {
            codecs,
            skip_validation: false,
            options: BodyOptions::new(),
            _marker: PhantomData,
        }
    }

    /// Skips the custom validation hook; field rules still apply.
    #[must_use]
    pub fn skip_validation(mut self) -> Self {
        self.skip_validation = true;
        self
    }

    /// Documentation options applied to every media type.
    #[must_use]
    pub fn with_options(mut self, options: BodyOptions) -> Self {
        self.options = options;
        self
    }
}

impl<T> fmt::Debug for BodyDecoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyDecoder")
            .field("target", &std::any::type_name::<T>())
            .field("skip_validation", &self.skip_validation)
            .finish_non_exhaustive()
    }
}

impl<T: Bindable + Serialize> Middleware for BodyDecoder<T> {
    fn name(&self) -> &'static str {
        "body_decoder"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            if request.body().is_empty() {
                let fields = T::fields();
                if fields.iter().any(|f| f.is_required()) {
                    validate_fields(&fields, &Value::Object(Map::new()), "")?;
                    return Err(ApiError::bad_request(
                        kinds::BODY_ERROR,
                        "request body is empty",
                    ));
                }
            }

            let content_type = request
                .headers()
                .get(CONTENT_TYPE)
                .map(|v| {
                    v.to_str().map_err(|err| {
                        ApiError::wrap_raw(err, "unable to resolve content type")
                            .with_kind(kinds::INVALID_CONTENT_TYPE)
                            .with_status(http::StatusCode::BAD_REQUEST)
                    })
                })
                .transpose()?;

            let value = bind_body::<T>(
                &self.codecs,
                content_type,
                request.body(),
                self.skip_validation,
            )?;
            ctx.set_extension(Body(value));
            next.run(ctx, request).await
        })
    }

    fn as_describe(&self) -> Option<&dyn Describe> {
        Some(self)
    }
}

impl<T: Bindable + Serialize> Describe for BodyDecoder<T> {
    fn describe(&self, builder: &mut DocBuilder) -> DocsResult<()> {
        for media_type in self.codecs.media_types() {
            builder.with_body(T::fields(), self.options.clone().mime_type(media_type));
        }
        builder
            .with_error(400, kinds::BODY_ERROR, "Request body could not be read")
            .with_error(400, kinds::INVALID_CONTENT_TYPE, "Malformed Content-Type header")
            .with_error(400, kinds::INVALID_BODY_FORMAT, "Request body could not be decoded")
            .with_error(400, kinds::MISSING_PARAM, "A required field is missing")
            .with_error(400, kinds::BODY_VALIDATION_FAILED, "A field does not match its pattern")
            .with_error(400, kinds::ENUM_VALIDATION_FAILED, "A field is not one of its allowed values")
            .with_error(400, kinds::INVALID_BODY, "Request body failed validation")
            .with_error(415, kinds::UNSUPPORTED_CONTENT_TYPE, "Content type is not supported");
        builder.error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::FnHandler;
    use bytes::Bytes;
    use gapi_core::{BoxError, Reply, APPLICATION_JSON, APPLICATION_XML};
    use gapi_extract::Field;
    use http::{Method, StatusCode};
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct CreateUser {
        name: String,
        #[serde(default)]
        role: Option<String>,
    }

    impl Bindable for CreateUser {
        fn fields() -> Vec<Field> {
            vec![
                Field::string("name").required(),
                Field::string("role").one_of("admin,member"),
            ]
        }

        fn validate(&self) -> Result<(), BoxError> {
            if self.name == "root" {
                return Err("reserved name".into());
            }
            Ok(())
        }
    }

    async fn run(decoder: BodyDecoder<CreateUser>, content_type: &str, body: &str) -> HandlerResult {
        let handler = FnHandler::new(|ctx, req| {
            let bound = ctx.body::<CreateUser>().map(|b| b.name.clone());
            let raw = req.into_body();
            Box::pin(async move {
                let name = bound?;
                assert!(!raw.is_empty());
                Ok(Reply::value(name))
            })
        });
        let request = http::Request::builder()
            .method(Method::POST)
            .header(CONTENT_TYPE, content_type)
            .body(Bytes::copy_from_slice(body.as_bytes()))
            .unwrap();

        let mut ctx = RequestContext::new();
        Next::new(&decoder, Next::handler(&handler))
            .run(&mut ctx, request)
            .await
    }

    fn decoder() -> BodyDecoder<CreateUser> {
        BodyDecoder::new(Arc::new(CodecRegistry::standard()))
    }

    #[tokio::test]
    async fn test_decodes_json() {
        let result = run(decoder(), APPLICATION_JSON, r#"{"name":"Ann","role":"admin"}"#).await;
        assert!(matches!(result, Ok(Reply::Value(_))));
    }

    #[tokio::test]
    async fn test_decodes_xml() {
        let result = run(
            decoder(),
            APPLICATION_XML,
            "<CreateUser><name>Ann</name><role>member</role></CreateUser>",
        )
        .await;
        assert!(result.is_ok(), "{result:?}");
    }

    #[tokio::test]
    async fn test_failures_are_classified() {
        let cases = [
            (APPLICATION_JSON, r#"{"name":""}"#, StatusCode::BAD_REQUEST, kinds::MISSING_PARAM),
            (
                APPLICATION_JSON,
                r#"{"name":"Ann","role":"owner"}"#,
                StatusCode::BAD_REQUEST,
                kinds::ENUM_VALIDATION_FAILED,
            ),
            (APPLICATION_JSON, "{not json", StatusCode::BAD_REQUEST, kinds::INVALID_BODY_FORMAT),
            (APPLICATION_JSON, "", StatusCode::BAD_REQUEST, kinds::MISSING_PARAM),
            (APPLICATION_JSON, r#"{"name":"root"}"#, StatusCode::BAD_REQUEST, kinds::INVALID_BODY),
            ("text/csv", "name\nAnn", StatusCode::UNSUPPORTED_MEDIA_TYPE, kinds::UNSUPPORTED_CONTENT_TYPE),
            ("not a mime", "{}", StatusCode::BAD_REQUEST, kinds::INVALID_CONTENT_TYPE),
        ];

        for (content_type, body, status, kind) in cases {
            let err = run(decoder(), content_type, body).await.unwrap_err();
            assert_eq!(err.status(), status, "{content_type} {body}");
            assert_eq!(err.kind(), kind, "{content_type} {body}");
        }
    }

    #[tokio::test]
    async fn test_empty_body_names_required_field() {
        let err = run(decoder(), APPLICATION_JSON, "").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), kinds::MISSING_PARAM);
        assert_eq!(err.message(), "field name is required");
    }

    #[tokio::test]
    async fn test_skip_validation_only_skips_hook() {
        let result = run(decoder().skip_validation(), APPLICATION_JSON, r#"{"name":"root"}"#).await;
        assert!(result.is_ok());

        let err = run(decoder().skip_validation(), APPLICATION_JSON, r#"{"name":""}"#)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), kinds::MISSING_PARAM);
    }

    #[test]
    fn test_describe_documents_each_codec() {
        let mut builder = DocBuilder::new(Method::POST, "/users");
        decoder()
            .with_options(BodyOptions::new().description("new user"))
            .describe(&mut builder)
            .unwrap();

        let op = builder.operation();
        let body = op.request_body.as_ref().unwrap();
        assert!(body.required);
        assert_eq!(body.description.as_deref(), Some("new user"));
        assert!(body.content.contains_key(APPLICATION_JSON));
        assert!(body.content.contains_key(APPLICATION_XML));
        assert!(op.responses.contains_key("400"));
        assert!(op.responses.contains_key("415"));
    }
}
