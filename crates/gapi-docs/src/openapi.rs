//! OpenAPI 3 document types.
//!
//! Only the parts of the OpenAPI 3.0 format gapi emits are modelled:
//! <https://spec.openapis.org/oas/v3.0.3>

use gapi_extract::{Field, FieldKind};
use http::Method;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::builder::DocBuilder;
use crate::error::{DocsError, DocsResult};

/// OpenAPI version emitted in documents.
pub const OPENAPI_VERSION: &str = "3.0.3";

/// OpenAPI document root object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApi {
    /// OpenAPI version.
    pub openapi: String,
    /// API metadata.
    pub info: Info,
    /// Available servers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    /// Paths and their operations, in registration order.
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,
    /// Tags for grouping.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl OpenApi {
    /// Creates an empty document.
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            openapi: OPENAPI_VERSION.to_string(),
            info: Info {
                title: title.into(),
                version: version.into(),
                description: None,
            },
            servers: Vec::new(),
            paths: IndexMap::new(),
            tags: Vec::new(),
        }
    }

    /// Adds the operation accumulated by `builder`.
    pub fn add_operation(&mut self, builder: &DocBuilder) -> DocsResult<()> {
        self.insert(builder.method(), builder.path(), builder.operation().clone())
    }

    /// Inserts an operation under `method` and `path`.
    pub fn insert(&mut self, method: &Method, path: &str, operation: Operation) -> DocsResult<()> {
        let item = self.paths.entry(path.to_string()).or_default();
        let slot = item.slot_mut(method).ok_or_else(|| {
            DocsError::describe(format!("method {method} cannot be documented"))
        })?;
        if slot.is_some() {
            return Err(DocsError::DuplicateOperation {
                method: method.to_string(),
                path: path.to_string(),
            });
        }
        *slot = Some(operation);
        Ok(())
    }

    /// Looks up an operation.
    pub fn operation(&self, method: &Method, path: &str) -> Option<&Operation> {
        self.paths.get(path).and_then(|item| item.get(method))
    }

    /// Number of documented operations.
    pub fn operation_count(&self) -> usize {
        self.paths.values().map(PathItem::len).sum()
    }

    /// Serializes the document as compact JSON.
    pub fn to_json(&self) -> DocsResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Serializes the document as pretty JSON.
    pub fn to_json_pretty(&self) -> DocsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// API metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    /// API title.
    pub title: String,
    /// API version.
    pub version: String,
    /// API description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Server information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    /// Server URL.
    pub url: String,
    /// Server description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Operations available on one path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathItem {
    /// GET operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    /// PUT operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    /// POST operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    /// DELETE operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    /// OPTIONS operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    /// HEAD operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    /// PATCH operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    /// TRACE operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Operation>,
}

impl PathItem {
    fn slot_mut(&mut self, method: &Method) -> Option<&mut Option<Operation>> {
        match *method {
            Method::GET => Some(&mut self.get),
            Method::PUT => Some(&mut self.put),
            Method::POST => Some(&mut self.post),
            Method::DELETE => Some(&mut self.delete),
            Method::OPTIONS => Some(&mut self.options),
            Method::HEAD => Some(&mut self.head),
            Method::PATCH => Some(&mut self.patch),
            Method::TRACE => Some(&mut self.trace),
            _ => None,
        }
    }

    /// Operation for `method`.
    pub fn get(&self, method: &Method) -> Option<&Operation> {
        match *method {
            Method::GET => self.get.as_ref(),
            Method::PUT => self.put.as_ref(),
            Method::POST => self.post.as_ref(),
            Method::DELETE => self.delete.as_ref(),
            Method::OPTIONS => self.options.as_ref(),
            Method::HEAD => self.head.as_ref(),
            Method::PATCH => self.patch.as_ref(),
            Method::TRACE => self.trace.as_ref(),
            _ => None,
        }
    }

    /// Number of operations on this path.
    pub fn len(&self) -> usize {
        [
            &self.get,
            &self.put,
            &self.post,
            &self.delete,
            &self.options,
            &self.head,
            &self.patch,
            &self.trace,
        ]
        .iter()
        .filter(|op| op.is_some())
        .count()
    }

    /// Returns `true` if no operation is set.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An API operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Operation {
    /// Operation identifier.
    #[serde(rename = "operationId")]
    pub operation_id: String,
    /// Short summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Full description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tags for grouping.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// Request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "requestBody")]
    pub request_body: Option<RequestBody>,
    /// Responses keyed by status code.
    pub responses: IndexMap<String, Response>,
}

/// Parameter location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterIn {
    /// Query string parameter.
    Query,
    /// URL path parameter.
    Path,
}

/// An operation parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Parameter location.
    #[serde(rename = "in")]
    pub location: ParameterIn,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether required.
    #[serde(default)]
    pub required: bool,
    /// Parameter schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

/// Request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestBody {
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether required.
    #[serde(default)]
    pub required: bool,
    /// Content by media type.
    pub content: IndexMap<String, MediaType>,
}

/// Content for one media type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaType {
    /// Schema for this media type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    /// Single example.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_json::Value>,
    /// Named examples.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub examples: IndexMap<String, Example>,
}

/// Named example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    /// Short summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Example value.
    pub value: serde_json::Value,
}

/// Response definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {
    /// Description (required by OpenAPI).
    pub description: String,
    /// Response headers.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, Header>,
    /// Content by media type.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub content: IndexMap<String, MediaType>,
}

/// Response header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Header schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

/// Tag for grouping operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// JSON Schema type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    /// String type.
    String,
    /// Number type.
    Number,
    /// Integer type.
    Integer,
    /// Boolean type.
    Boolean,
    /// Array type.
    Array,
    /// Object type.
    Object,
}

impl SchemaType {
    /// Type for a field kind, following the fixed kind table.
    pub const fn for_kind(kind: &FieldKind) -> Self {
        match kind {
            FieldKind::String | FieldKind::Other => Self::String,
            FieldKind::Integer => Self::Integer,
            FieldKind::Float => Self::Number,
            FieldKind::Bool => Self::Boolean,
            FieldKind::Bytes | FieldKind::Array => Self::Array,
            FieldKind::Map | FieldKind::Struct(_) => Self::Object,
        }
    }
}

/// JSON Schema definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "type")]
    pub schema_type: Option<SchemaType>,
    /// Format hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Object properties.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,
    /// Required properties.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Array item schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Allowed values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[serde(rename = "enum")]
    pub enum_values: Vec<serde_json::Value>,
    /// Pattern regex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Example value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_json::Value>,
}

impl Schema {
    /// A schema of the given type.
    #[must_use]
    pub fn of(schema_type: SchemaType) -> Self {
        Self {
            schema_type: Some(schema_type),
            ..Self::default()
        }
    }

    /// Create a string schema.
    #[must_use]
    pub fn string() -> Self {
        Self::of(SchemaType::String)
    }

    /// Create an integer schema.
    #[must_use]
    pub fn integer() -> Self {
        Self::of(SchemaType::Integer)
    }

    /// Create an array schema with the given item schema.
    #[must_use]
    pub fn array(items: Self) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::of(SchemaType::Array)
        }
    }

    /// Create an object schema.
    #[must_use]
    pub fn object() -> Self {
        Self::of(SchemaType::Object)
    }

    /// Add a description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Add a property to an object schema.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, schema: Self) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Mark a property as required.
    #[must_use]
    pub fn required_property(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    /// Schema for a single field. Nested structs become nested objects.
    #[must_use]
    pub fn for_field(field: &Field) -> Self {
        let kind = field.kind();
        let mut schema = match kind {
            FieldKind::Struct(_) => Self::from_fields(&kind.nested().unwrap_or_default()),
            FieldKind::Bytes => Self::array(Self::integer()),
            _ => Self::of(SchemaType::for_kind(&kind)),
        };
        schema.description = field.description().map(String::from);
        schema.format = field.format_hint().map(String::from);
        schema.pattern = field.pattern_rule().map(String::from);
        schema.enum_values = field
            .enum_values()
            .iter()
            .map(|v| serde_json::Value::String(v.clone()))
            .collect();
        schema.default = field.default().cloned();
        schema.example = field.example_value().cloned();
        schema
    }

    /// Object schema for a field table. Skipped fields are left out.
    #[must_use]
    pub fn from_fields(fields: &[Field]) -> Self {
        fields
            .iter()
            .filter(|f| !f.is_skipped())
            .fold(Self::object(), |schema, field| {
                let schema = schema.property(field.name(), Self::for_field(field));
                if field.is_required() {
                    schema.required_property(field.name())
                } else {
                    schema
                }
            })
    }
}

/// Builds the document shell (info and servers) operations are added to.
#[derive(Debug, Clone)]
pub struct OpenApiGenerator {
    title: String,
    version: String,
    description: Option<String>,
    servers: Vec<Server>,
}

impl Default for OpenApiGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenApiGenerator {
    /// Create a new generator with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            title: "gapi".to_string(),
            version: "1.0.0".to_string(),
            description: None,
            servers: Vec::new(),
        }
    }

    /// Set the API title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the API version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the API description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a server URL.
    #[must_use]
    pub fn server(mut self, url: impl Into<String>, description: Option<String>) -> Self {
        self.servers.push(Server {
            url: url.into(),
            description,
        });
        self
    }

    /// Creates an empty document with the configured metadata.
    #[must_use]
    pub fn document(&self) -> OpenApi {
        let mut doc = OpenApi::new(&self.title, &self.version);
        doc.info.description.clone_from(&self.description);
        doc.servers.clone_from(&self.servers);
        doc
    }

    /// Creates a document holding every operation of `builders`.
    ///
    /// Tags used by operations are listed at the document level in first-use
    /// order.
    pub fn generate<'a>(
        &self,
        builders: impl IntoIterator<Item = &'a DocBuilder>,
    ) -> DocsResult<OpenApi> {
        let mut doc = self.document();
        for builder in builders {
            doc.add_operation(builder)?;
            for tag in &builder.operation().tags {
                if !doc.tags.iter().any(|t| t.name == *tag) {
                    doc.tags.push(Tag {
                        name: tag.clone(),
                        description: None,
                    });
                }
            }
        }
        Ok(doc)
    }
}
