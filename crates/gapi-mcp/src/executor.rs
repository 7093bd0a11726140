//! Replaying tool calls through the HTTP pipeline.
//!
//! A call's flat arguments are split back into path variables, a query
//! string and a JSON body. The resulting request runs through the route's
//! full middleware chain against an in-memory recorder, exactly as if it had
//! arrived over a socket.

use bytes::Bytes;
use gapi_core::APPLICATION_JSON;
use gapi_extract::ParamSource;
use gapi_middleware::{Endpoint, Request, RequestContext};
use gapi_router::Params;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::Method;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::protocol::CallToolResult;
use crate::schema::ArgumentOrigin;

/// Flat arguments split by destination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitArguments {
    /// Path variables, stringified.
    pub path: Params,
    /// Query pairs, stringified, in argument order.
    pub query: Vec<(String, String)>,
    /// Body object with dotted keys expanded into nested objects.
    pub body: Map<String, Value>,
}

impl SplitArguments {
    /// Path template with every `{name}` replaced by its percent-encoded
    /// value, so `/` or `?` inside a value stay within one segment.
    pub fn resolve_path(&self, template: &str) -> String {
        self.path.iter().fold(template.to_string(), |path, (name, value)| {
            path.replace(&format!("{{{name}}}"), &urlencoding::encode(value))
        })
    }

    /// Percent-encoded query string, without the leading `?`.
    ///
    /// # Errors
    ///
    /// Fails if a pair cannot be form-encoded.
    pub fn query_string(&self) -> Result<String, serde_urlencoded::ser::Error> {
        serde_urlencoded::to_string(&self.query)
    }

    /// JSON body, empty when no body argument was given.
    ///
    /// # Errors
    ///
    /// Fails if the body cannot be serialized.
    pub fn body_bytes(&self) -> Result<Bytes, serde_json::Error> {
        if self.body.is_empty() {
            return Ok(Bytes::new());
        }
        serde_json::to_vec(&self.body).map(Bytes::from)
    }
}

/// One route exposed as a tool.
#[derive(Debug, Clone)]
pub struct ToolRoute {
    method: Method,
    template: String,
    endpoint: Endpoint,
    origins: IndexMap<String, ArgumentOrigin>,
}

impl ToolRoute {
    /// Creates a tool route.
    pub fn new(
        method: Method,
        template: impl Into<String>,
        endpoint: Endpoint,
        origins: IndexMap<String, ArgumentOrigin>,
    ) -> Self {
        Self {
            method,
            template: template.into(),
            endpoint,
            origins,
        }
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path template.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Argument origins.
    pub fn origins(&self) -> &IndexMap<String, ArgumentOrigin> {
        &self.origins
    }

    /// Splits flat arguments by origin. Unknown keys go to the body as-is.
    pub fn split_arguments(&self, arguments: &Map<String, Value>) -> SplitArguments {
        let mut split = SplitArguments::default();

        for (key, value) in arguments {
            match self.origins.get(key) {
                Some(origin) if origin.source == ParamSource::Path => {
                    split.path.insert(key.clone(), stringify(value));
                }
                Some(origin) if origin.source == ParamSource::Query => {
                    split.query.push((key.clone(), stringify(value)));
                }
                Some(origin) => insert_nested(&mut split.body, &origin.body_path, value.clone()),
                None => {
                    split.body.insert(key.clone(), value.clone());
                }
            }
        }

        split
    }

    /// Builds the replayed request for `split`.
    ///
    /// # Errors
    ///
    /// Fails with a message when the arguments cannot form a request.
    pub fn build_request(&self, split: &SplitArguments) -> Result<Request, String> {
        let mut uri = split.resolve_path(&self.template);
        if !split.query.is_empty() {
            let query = split
                .query_string()
                .map_err(|e| format!("failed to encode query: {e}"))?;
            uri.push('?');
            uri.push_str(&query);
        }

        let body = split
            .body_bytes()
            .map_err(|e| format!("failed to encode body: {e}"))?;

        http::Request::builder()
            .method(self.method.clone())
            .uri(uri)
            .header(CONTENT_TYPE, APPLICATION_JSON)
            .header(ACCEPT, APPLICATION_JSON)
            .body(body)
            .map_err(|e| format!("invalid tool arguments: {e}"))
    }

    /// Runs the tool.
    ///
    /// `arguments` must be a JSON object or absent. The replayed request
    /// observes a child of `cancellation`. A 2xx recording is a successful
    /// result; anything else is flagged as an error. Either way the text is
    /// the recorded body.
    pub async fn execute(
        &self,
        arguments: Option<&Value>,
        cancellation: &CancellationToken,
    ) -> CallToolResult {
        let empty = Map::new();
        let arguments = match arguments {
            None | Some(Value::Null) => &empty,
            Some(Value::Object(map)) => map,
            Some(_) => return CallToolResult::error("arguments must be a JSON object"),
        };

        let split = self.split_arguments(arguments);
        let request = match self.build_request(&split) {
            Ok(request) => request,
            Err(message) => return CallToolResult::error(message),
        };

        let mut ctx = RequestContext::new()
            .with_params(split.path)
            .with_cancellation(cancellation.child_token());

        if let Err(err) = self.endpoint.execute(&mut ctx, request).await {
            let text = serde_json::to_string(&err.body()).unwrap_or_else(|_| err.to_string());
            return CallToolResult::error(text);
        }

        let recorder = ctx.recorder();
        let status = recorder.status();
        debug!(
            http.method = %self.method,
            http.path = %self.template,
            status = status.as_u16(),
            "tool call replayed"
        );

        if status.is_success() {
            CallToolResult::text(recorder.body_text())
        } else {
            CallToolResult::error(recorder.body_text())
        }
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn insert_nested(body: &mut Map<String, Value>, path: &[String], value: Value) {
    let Some((leaf, parents)) = path.split_last() else {
        return;
    };

    let mut node = body;
    for parent in parents {
        let slot = node
            .entry(parent.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(map) = slot else {
            return;
        };
        node = map;
    }
    node.insert(leaf.clone(), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FlatSchema;
    use gapi_core::Reply;
    use gapi_extract::Field;
    use gapi_middleware::{stages, FnHandler, Pipeline};
    use serde_json::json;

    fn route(endpoint: Endpoint) -> ToolRoute {
        let params = vec![
            (ParamSource::Path, Field::integer("id")),
            (ParamSource::Query, Field::string("note")),
        ];
        let body = vec![
            Field::string("name"),
            Field::new(
                "address",
                gapi_extract::FieldKind::Struct(|| vec![Field::string("city")]),
            ),
        ];
        let (_, origins) = FlatSchema::build(&params, Some(&body))
            .unwrap()
            .into_parts();
        ToolRoute::new(Method::PUT, "/users/{id}", endpoint, origins)
    }

    fn echo() -> Endpoint {
        Endpoint::new(|| {
            FnHandler::new(|ctx, req| {
                let id = ctx.params().get("id").unwrap_or_default().to_string();
                Box::pin(async move {
                    let body: Value = if req.body().is_empty() {
                        Value::Null
                    } else {
                        serde_json::from_slice(req.body()).unwrap_or(Value::Null)
                    };
                    echo_reply(id, req.uri().to_string(), body)
                })
            })
        })
        .with_defaults(defaults())
    }

    fn defaults() -> std::sync::Arc<[std::sync::Arc<dyn gapi_middleware::Middleware>]> {
        let codecs = std::sync::Arc::new(gapi_core::CodecRegistry::standard());
        Pipeline::from(stages::defaults(codecs)).to_shared()
    }

    fn echo_reply(id: String, uri: String, body: Value) -> gapi_core::HandlerResult {
        Ok(Reply::raw_with_type(
            json!({"id": id, "uri": uri, "body": body}).to_string(),
            APPLICATION_JSON,
        ))
    }

    #[test]
    fn test_split_arguments_by_origin() {
        let route = route(echo());
        let arguments = json!({
            "id": 3,
            "note": "a&b c",
            "name": "Ann",
            "address.city": "Paris",
            "extra": true
        });
        let split = route.split_arguments(arguments.as_object().unwrap());

        assert_eq!(split.path.get("id"), Some("3"));
        assert_eq!(split.query, vec![("note".to_string(), "a&b c".to_string())]);
        assert_eq!(
            Value::Object(split.body.clone()),
            json!({"name": "Ann", "address": {"city": "Paris"}, "extra": true})
        );
        assert_eq!(split.resolve_path("/users/{id}"), "/users/3");
        assert_eq!(split.query_string().unwrap(), "note=a%26b+c");
    }

    #[test]
    fn test_nested_insert_replaces_scalar_parent() {
        let mut body = Map::new();
        body.insert("address".to_string(), json!("flat"));
        insert_nested(
            &mut body,
            &["address".to_string(), "city".to_string()],
            json!("Paris"),
        );
        assert_eq!(Value::Object(body), json!({"address": {"city": "Paris"}}));
    }

    #[tokio::test]
    async fn test_execute_success() {
        let route = route(echo());
        let arguments = json!({"id": "7", "address.city": "Paris"});
        let result = route
            .execute(Some(&arguments), &CancellationToken::new())
            .await;

        assert!(!result.is_error);
        let text: Value = serde_json::from_str(result.first_text().unwrap()).unwrap();
        assert_eq!(text["id"], "7");
        assert_eq!(text["uri"], "/users/7");
        assert_eq!(text["body"], json!({"address": {"city": "Paris"}}));
    }

    #[tokio::test]
    async fn test_path_values_are_percent_encoded() {
        let route = route(echo());
        let arguments = json!({"id": "a b/c?d"});
        let split = route.split_arguments(arguments.as_object().unwrap());
        assert_eq!(split.resolve_path("/users/{id}"), "/users/a%20b%2Fc%3Fd");

        let result = route
            .execute(Some(&arguments), &CancellationToken::new())
            .await;
        assert!(!result.is_error, "{:?}", result.first_text());
        let text: Value = serde_json::from_str(result.first_text().unwrap()).unwrap();
        assert_eq!(text["id"], "a b/c?d");
        assert_eq!(text["uri"], "/users/a%20b%2Fc%3Fd");
    }

    #[tokio::test]
    async fn test_execute_rejects_non_object_arguments() {
        let route = route(echo());
        let result = route
            .execute(Some(&json!([1, 2])), &CancellationToken::new())
            .await;
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn test_unwritten_error_is_flagged() {
        let route = route(Endpoint::new(|| {
            FnHandler::new(|_ctx, _req| {
                Box::pin(async { Err(gapi_core::ApiError::not_found("user_not_found", "no such user")) })
            })
        }));
        let result = route.execute(None, &CancellationToken::new()).await;

        assert!(result.is_error);
        assert_eq!(
            result.first_text().unwrap(),
            r#"{"message":"no such user","kind":"user_not_found"}"#
        );
    }

    #[tokio::test]
    async fn test_cancellation_reaches_the_handler() {
        let route = route(Endpoint::new(|| {
            FnHandler::new(|ctx, _req| {
                let cancelled = ctx.is_cancelled();
                Box::pin(async move { Ok(Reply::raw(cancelled.to_string())) })
            })
        })
        .with_defaults(defaults()));
        let token = CancellationToken::new();
        token.cancel();

        let result = route.execute(None, &token).await;
        assert_eq!(result.first_text(), Some("true"));
    }
}
