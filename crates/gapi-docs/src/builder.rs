//! Operation documentation builder.
//!
//! A [`DocBuilder`] is handed to every participant of a route (middlewares
//! first, then the handler) through the [`Describe`] capability. Each one adds
//! what it knows: binding middlewares register parameters, bodies and the
//! errors they can raise, handlers add summaries, tags and responses.
//!
//! ```
//! use gapi_docs::{DocBuilder, ResponseOptions, Schema};
//! use gapi_extract::{Field, ParamSource};
//! use http::Method;
//!
//! let mut builder = DocBuilder::new(Method::GET, "/users/{id}");
//! builder
//!     .with_summary("Get user")
//!     .with_tags(["Users"])
//!     .with_params(ParamSource::Path, vec![Field::integer("id")])
//!     .with_response(Some(Schema::object()), ResponseOptions::new())
//!     .with_error(404, "user_not_found", "no user for this id");
//!
//! assert!(builder.error().is_ok());
//! assert_eq!(builder.operation_id(), "getUsersId");
//! ```

use gapi_core::{kinds, APPLICATION_JSON};
use gapi_extract::{Field, ParamSource};
use http::{Method, StatusCode};
use indexmap::IndexMap;
use serde_json::{json, Value};

use crate::error::{DocsError, DocsResult};
use crate::openapi::{
    Example, Header, MediaType, Operation, Parameter, ParameterIn, RequestBody, Response, Schema,
};

/// Capability of a route participant that can document itself.
///
/// Participants without it are skipped silently.
pub trait Describe {
    /// Adds this participant's metadata to `builder`.
    fn describe(&self, builder: &mut DocBuilder) -> DocsResult<()>;
}

/// Options for [`DocBuilder::with_body`].
#[derive(Debug, Clone, Default)]
pub struct BodyOptions {
    description: Option<String>,
    examples: IndexMap<String, Example>,
    mime_type: Option<String>,
}

impl BodyOptions {
    /// Default options: JSON body, no description.
    pub fn new() -> Self {
        Self::default()
    }

    /// Body description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a named example.
    #[must_use]
    pub fn example(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        self.examples.insert(
            name.clone(),
            Example {
                summary: Some(name),
                description: None,
                value: value.into(),
            },
        );
        self
    }

    /// Media type the body is documented under.
    #[must_use]
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// Options for [`DocBuilder::with_response`].
#[derive(Debug, Clone)]
pub struct ResponseOptions {
    description: Option<String>,
    examples: IndexMap<String, Example>,
    mime_type: String,
    status: Option<u16>,
    headers: IndexMap<String, String>,
}

impl Default for ResponseOptions {
    fn default() -> Self {
        Self {
            description: None,
            examples: IndexMap::new(),
            mime_type: APPLICATION_JSON.to_string(),
            status: None,
            headers: IndexMap::new(),
        }
    }
}

impl ResponseOptions {
    /// Default options: `application/json`, status 200 (204 without schema).
    pub fn new() -> Self {
        Self::default()
    }

    /// Response description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a named example.
    #[must_use]
    pub fn example(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        self.examples.insert(
            name.clone(),
            Example {
                summary: Some(name),
                description: None,
                value: value.into(),
            },
        );
        self
    }

    /// Media type of the response.
    #[must_use]
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Overrides the status code.
    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Documents a response header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.headers.insert(name.into(), description.into());
        self
    }

    /// Documents a redirect to `location`.
    #[must_use]
    pub fn redirect(self, status: u16, location: impl Into<String>) -> Self {
        self.status(status).header("Location", location)
    }
}

/// Accumulates the documentation of one operation.
#[derive(Debug, Clone)]
pub struct DocBuilder {
    method: Method,
    path: String,
    operation: Operation,
    params: Vec<(ParamSource, Field)>,
    body: Option<Vec<Field>>,
    tool_enabled: bool,
    tool_name: Option<String>,
    errors: Vec<DocsError>,
}

impl DocBuilder {
    /// Starts documenting `method path`.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let operation = Operation {
            operation_id: operation_id(&method, &path),
            ..Operation::default()
        };
        Self {
            method,
            path,
            operation,
            params: Vec::new(),
            body: None,
            tool_enabled: true,
            tool_name: None,
            errors: Vec::new(),
        }
    }

    /// Sets the summary, replacing any previous one.
    pub fn with_summary(&mut self, summary: impl Into<String>) -> &mut Self {
        self.operation.summary = Some(summary.into());
        self
    }

    /// Sets the description, replacing any previous one.
    pub fn with_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.operation.description = Some(description.into());
        self
    }

    /// Adds tags. Tags already present are ignored.
    pub fn with_tags<I, S>(&mut self, tags: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            let tag = tag.into();
            if !self.operation.tags.contains(&tag) {
                self.operation.tags.push(tag);
            }
        }
        self
    }

    /// Declares path or query parameters.
    ///
    /// Path parameters are always required. Declaring the same name twice for
    /// the same location replaces the earlier declaration.
    pub fn with_params(&mut self, source: ParamSource, fields: Vec<Field>) -> &mut Self {
        let location = match source {
            ParamSource::Path => ParameterIn::Path,
            ParamSource::Query => ParameterIn::Query,
            ParamSource::Body => {
                for field in &fields {
                    self.errors.push(DocsError::InvalidParamSource {
                        field: field.name().to_string(),
                        location: source.to_string(),
                    });
                }
                return self;
            }
        };

        for field in fields.into_iter().filter(|f| !f.is_skipped()) {
            let parameter = Parameter {
                name: field.name().to_string(),
                location,
                description: field.description().map(String::from),
                required: location == ParameterIn::Path || field.is_required(),
                schema: Some(Schema::for_field(&field)),
            };
            let params = &mut self.operation.parameters;
            match params
                .iter_mut()
                .find(|p| p.name == parameter.name && p.location == location)
            {
                Some(existing) => *existing = parameter,
                None => params.push(parameter),
            }

            match self
                .params
                .iter_mut()
                .find(|(s, f)| *s == source && f.name() == field.name())
            {
                Some(existing) => existing.1 = field,
                None => self.params.push((source, field)),
            }
        }
        self
    }

    /// Declares the request body.
    ///
    /// Calling it once per media type documents the same body under each.
    pub fn with_body(&mut self, fields: Vec<Field>, options: BodyOptions) -> &mut Self {
        let mime = options
            .mime_type
            .unwrap_or_else(|| APPLICATION_JSON.to_string());
        let schema = Schema::from_fields(&fields);

        let body = self
            .operation
            .request_body
            .get_or_insert_with(RequestBody::default);
        body.required |= !schema.required.is_empty();
        if options.description.is_some() {
            body.description = options.description;
        }
        body.content.insert(
            mime,
            MediaType {
                schema: Some(schema),
                example: None,
                examples: options.examples,
            },
        );

        self.body = Some(fields);
        self
    }

    /// Declares a success response.
    ///
    /// Without a schema the response has no content and defaults to 204.
    pub fn with_response(&mut self, schema: Option<Schema>, options: ResponseOptions) -> &mut Self {
        let default_status = if schema.is_some() { 200 } else { 204 };
        let Some(status) = self.checked_status(options.status.unwrap_or(default_status)) else {
            return self;
        };

        let response = self.response_entry(status);
        if let Some(description) = options.description {
            response.description = description;
        }
        for (name, description) in options.headers {
            response.headers.insert(
                name,
                Header {
                    description: Some(description),
                    schema: Some(Schema::string()),
                },
            );
        }
        if schema.is_some() || !options.examples.is_empty() {
            let media = response.content.entry(options.mime_type).or_default();
            if schema.is_some() {
                media.schema = schema;
            }
            media.examples.extend(options.examples);
        }
        self
    }

    /// Declares an error the operation may return.
    ///
    /// Several kinds under one status share a single response entry; each
    /// kind contributes one example and one line of the description.
    pub fn with_error(
        &mut self,
        status: u16,
        kind: impl Into<String>,
        description: impl Into<String>,
    ) -> &mut Self {
        let Some(status) = self.checked_status(status) else {
            return self;
        };
        let kind = kind.into();
        let description = description.into();

        let response = self.response_entry(status);
        let line = format!("{kind}: {description}");
        let media = response
            .content
            .entry(APPLICATION_JSON.to_string())
            .or_default();
        if media.examples.contains_key(&kind) {
            return self;
        }

        let kinds_seen = media.examples.len();
        media
            .schema
            .get_or_insert_with(error_body_schema)
            .properties
            .entry("kind".to_string())
            .or_insert_with(Schema::string)
            .enum_values
            .push(Value::String(kind.clone()));
        media.examples.insert(
            kind.clone(),
            Example {
                summary: Some(description.clone()),
                description: None,
                value: json!({"message": description, "kind": kind}),
            },
        );

        if kinds_seen == 0 {
            response.description = line;
        } else {
            response.description.push('\n');
            response.description.push_str(&line);
        }
        self
    }

    /// Shows or hides the operation from the tool list. Visible by default.
    pub fn with_tool(&mut self, enabled: bool) -> &mut Self {
        self.tool_enabled = enabled;
        self
    }

    /// Overrides the generated tool name.
    pub fn with_tool_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.tool_name = Some(name.into());
        self
    }

    /// Records a failure without aborting the chain of calls.
    pub fn push_error(&mut self, error: DocsError) -> &mut Self {
        self.errors.push(error);
        self
    }

    /// First recorded failure, if any.
    pub fn error(&self) -> DocsResult<()> {
        match self.errors.first() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Adds the response every operation carries and reports any failure.
    pub fn finish(&mut self) -> DocsResult<()> {
        self.with_error(500, kinds::INTERNAL_ERROR, "Internal server error");
        self.error()
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path template.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Generated operation ID.
    pub fn operation_id(&self) -> &str {
        &self.operation.operation_id
    }

    /// Summary.
    pub fn summary(&self) -> Option<&str> {
        self.operation.summary.as_deref()
    }

    /// Description.
    pub fn description(&self) -> Option<&str> {
        self.operation.description.as_deref()
    }

    /// Accumulated operation.
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Declared path and query parameters, in declaration order.
    pub fn params(&self) -> &[(ParamSource, Field)] {
        &self.params
    }

    /// Declared body fields.
    pub fn body(&self) -> Option<&[Field]> {
        self.body.as_deref()
    }

    /// Whether the operation is exposed as a tool.
    pub fn is_tool_enabled(&self) -> bool {
        self.tool_enabled
    }

    /// Tool name override.
    pub fn tool_name(&self) -> Option<&str> {
        self.tool_name.as_deref()
    }

    /// Consumes the builder, returning the operation.
    pub fn into_operation(self) -> Operation {
        self.operation
    }

    fn checked_status(&mut self, status: u16) -> Option<StatusCode> {
        match StatusCode::from_u16(status) {
            Ok(code) if (100..600).contains(&status) => Some(code),
            _ => {
                self.errors.push(DocsError::InvalidStatus(status));
                None
            }
        }
    }

    fn response_entry(&mut self, status: StatusCode) -> &mut Response {
        self.operation
            .responses
            .entry(status.as_str().to_string())
            .or_insert_with(|| Response {
                description: status.canonical_reason().unwrap_or_default().to_string(),
                ..Response::default()
            })
    }
}

fn error_body_schema() -> Schema {
    Schema::object()
        .property("message", Schema::string())
        .property("kind", Schema::string())
        .required_property("message")
        .required_property("kind")
}

/// Derives the operation ID for `method path`.
///
/// Braces are stripped, the method and each path segment are title-cased and
/// concatenated, and the first letter is lower-cased: `GET /users/{id}`
/// becomes `getUsersId`.
pub fn operation_id(method: &Method, path: &str) -> String {
    let method = method.as_str().to_ascii_lowercase();
    let id: String = std::iter::once(method.as_str())
        .chain(path.split('/'))
        .map(|segment| segment.trim_matches(|c| c == '{' || c == '}'))
        .filter(|segment| !segment.is_empty())
        .map(title_case)
        .collect();

    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => id,
    }
}

fn title_case(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_operation_id() {
        assert_eq!(operation_id(&Method::GET, "/users/{id}"), "getUsersId");
        assert_eq!(operation_id(&Method::DELETE, "/users/{id}"), "deleteUsersId");
        assert_eq!(
            operation_id(&Method::POST, "/orgs/{org}/members"),
            "postOrgsOrgMembers"
        );
        assert_eq!(operation_id(&Method::GET, "/"), "get");
    }

    #[test]
    fn test_summary_and_description_overwrite() {
        let mut builder = DocBuilder::new(Method::GET, "/users");
        builder.with_summary("first").with_summary("second");
        builder.with_description("a").with_description("b");
        assert_eq!(builder.summary(), Some("second"));
        assert_eq!(builder.description(), Some("b"));
    }

    #[test]
    fn test_params_are_additive_and_idempotent() {
        let mut builder = DocBuilder::new(Method::GET, "/users/{id}");
        builder
            .with_params(ParamSource::Path, vec![Field::integer("id")])
            .with_params(ParamSource::Query, vec![Field::string("q").required()])
            .with_params(ParamSource::Path, vec![Field::integer("id").describe("user id")]);

        let params = &builder.operation().parameters;
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].location, ParameterIn::Path);
        assert!(params[0].required);
        assert_eq!(params[0].description.as_deref(), Some("user id"));
        assert_eq!(params[1].location, ParameterIn::Query);
        assert!(params[1].required);
        assert_eq!(builder.params().len(), 2);
    }

    #[test]
    fn test_query_param_optional_by_default() {
        let mut builder = DocBuilder::new(Method::GET, "/users");
        builder.with_params(ParamSource::Query, vec![Field::integer("limit")]);
        assert!(!builder.operation().parameters[0].required);
    }

    #[test]
    fn test_body_source_rejected_for_params() {
        let mut builder = DocBuilder::new(Method::POST, "/users");
        builder.with_params(ParamSource::Body, vec![Field::string("name")]);
        assert!(matches!(
            builder.error(),
            Err(DocsError::InvalidParamSource { .. })
        ));
        assert!(builder.operation().parameters.is_empty());
    }

    #[test]
    fn test_body_per_media_type() {
        let mut builder = DocBuilder::new(Method::POST, "/users");
        let fields = vec![Field::string("name").required()];
        builder
            .with_body(
                fields.clone(),
                BodyOptions::new()
                    .description("new user")
                    .example("alice", json!({"name": "alice"})),
            )
            .with_body(fields, BodyOptions::new().mime_type("application/xml"));

        let body = builder.operation().request_body.as_ref().unwrap();
        assert!(body.required);
        assert_eq!(body.description.as_deref(), Some("new user"));
        let media: Vec<_> = body.content.keys().map(String::as_str).collect();
        assert_eq!(media, vec!["application/json", "application/xml"]);
        assert!(body.content["application/json"].examples.contains_key("alice"));
        assert_eq!(builder.body().unwrap().len(), 1);
    }

    #[test]
    fn test_response_status_defaults() {
        let mut builder = DocBuilder::new(Method::GET, "/users");
        builder.with_response(Some(Schema::array(Schema::object())), ResponseOptions::new());
        let ok = &builder.operation().responses["200"];
        assert_eq!(ok.description, "OK");
        assert!(ok.content.contains_key("application/json"));

        let mut builder = DocBuilder::new(Method::DELETE, "/users/{id}");
        builder.with_response(None, ResponseOptions::new().description("deleted"));
        let empty = &builder.operation().responses["204"];
        assert_eq!(empty.description, "deleted");
        assert!(empty.content.is_empty());
    }

    #[test]
    fn test_response_redirect_header() {
        let mut builder = DocBuilder::new(Method::GET, "/old");
        builder.with_response(None, ResponseOptions::new().redirect(301, "/new"));
        let moved = &builder.operation().responses["301"];
        assert_eq!(
            moved.headers["Location"].description.as_deref(),
            Some("/new")
        );
    }

    #[test]
    fn test_errors_grouped_by_status() {
        let mut builder = DocBuilder::new(Method::POST, "/users");
        builder
            .with_error(400, "missing_param", "A required field is missing")
            .with_error(400, "invalid_body", "Body validation failed")
            .with_error(400, "missing_param", "duplicate is ignored");

        let bad = &builder.operation().responses["400"];
        assert_eq!(
            bad.description,
            "missing_param: A required field is missing\ninvalid_body: Body validation failed"
        );
        let media = &bad.content["application/json"];
        assert_eq!(media.examples.len(), 2);
        assert_eq!(
            media.examples["invalid_body"].value,
            json!({"message": "Body validation failed", "kind": "invalid_body"})
        );
        let kind = &media.schema.as_ref().unwrap().properties["kind"];
        assert_eq!(kind.enum_values, vec![json!("missing_param"), json!("invalid_body")]);
    }

    #[test]
    fn test_invalid_status_recorded() {
        let mut builder = DocBuilder::new(Method::GET, "/users");
        builder.with_error(42, "weird", "nope");
        assert_eq!(builder.error(), Err(DocsError::InvalidStatus(42)));
        assert!(builder.operation().responses.is_empty());
    }

    #[test]
    fn test_finish_adds_internal_error() {
        let mut builder = DocBuilder::new(Method::GET, "/users");
        builder.finish().unwrap();
        let internal = &builder.operation().responses["500"];
        assert!(internal.content["application/json"]
            .examples
            .contains_key("internal_error"));
    }

    #[test]
    fn test_tool_toggles() {
        let mut builder = DocBuilder::new(Method::GET, "/health");
        assert!(builder.is_tool_enabled());
        builder.with_tool(false).with_tool_name("health");
        assert!(!builder.is_tool_enabled());
        assert_eq!(builder.tool_name(), Some("health"));
    }

    #[test]
    fn test_describe_capability() {
        struct Health;

        impl Describe for Health {
            fn describe(&self, builder: &mut DocBuilder) -> DocsResult<()> {
                builder.with_summary("Health check").with_tags(["Internal"]);
                builder.error()
            }
        }

        let mut builder = DocBuilder::new(Method::GET, "/health");
        Health.describe(&mut builder).unwrap();
        assert_eq!(builder.summary(), Some("Health check"));
        assert_eq!(builder.operation().tags, vec!["Internal"]);
    }

    proptest! {
        #[test]
        fn test_operation_id_is_brace_free(segments in prop::collection::vec("[a-z]{1,8}", 0..5)) {
            let path = format!("/{}", segments.iter().map(|s| format!("{{{s}}}")).collect::<Vec<_>>().join("/"));
            let id = operation_id(&Method::PUT, &path);
            prop_assert!(id.starts_with("put"));
            prop_assert!(!id.contains('{') && !id.contains('}') && !id.contains('/'), "operation id contains brace or slash: {}", id);
            prop_assert_eq!(id.clone(), operation_id(&Method::PUT, &path));
        }
    }
}
