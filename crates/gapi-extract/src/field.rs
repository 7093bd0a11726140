//! Field descriptor tables.
//!
//! Types taking part in binding describe their fields with a [`Field`] table
//! returned from [`Bindable::fields`]. The table plays the role struct tags
//! play elsewhere: it names each field as it appears on the wire and carries
//! its coercion category and validation rules.
//!
//! ```
//! use gapi_extract::{Bindable, Field};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Address {
//!     city: String,
//! }
//!
//! impl Bindable for Address {
//!     fn fields() -> Vec<Field> {
//!         vec![Field::string("city").required()]
//!     }
//! }
//!
//! #[derive(Serialize, Deserialize)]
//! struct CreateUser {
//!     name: String,
//!     role: String,
//!     address: Address,
//! }
//!
//! impl Bindable for CreateUser {
//!     fn fields() -> Vec<Field> {
//!         vec![
//!             Field::string("name").required().pattern("^[A-Za-z ]+$"),
//!             Field::string("role").one_of("admin,member"),
//!             Field::nested::<Address>("address"),
//!         ]
//!     }
//! }
//!
//! assert_eq!(CreateUser::fields().len(), 3);
//! ```

use std::fmt;

use gapi_core::BoxError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Where a bound value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamSource {
    /// Router path variable.
    Path,
    /// Query string.
    Query,
    /// Request body.
    Body,
}

impl ParamSource {
    /// Lowercase name (`path`, `query`, `body`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Body => "body",
        }
    }
}

impl fmt::Display for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coercion category of a field.
#[derive(Clone, Copy)]
pub enum FieldKind {
    /// Text.
    String,
    /// Any integer width, signed or unsigned.
    Integer,
    /// Any float width.
    Float,
    /// Boolean.
    Bool,
    /// Raw byte sequence.
    Bytes,
    /// Sequence of values.
    Array,
    /// String-keyed map.
    Map,
    /// Nested struct described by its own table.
    Struct(fn() -> Vec<Field>),
    /// Anything else.
    Other,
}

impl FieldKind {
    /// JSON schema type name for this kind.
    ///
    /// Unknown kinds fall back to `string`.
    pub const fn schema_type(&self) -> &'static str {
        match self {
            Self::String | Self::Other => "string",
            Self::Integer => "integer",
            Self::Float => "number",
            Self::Bool => "boolean",
            Self::Bytes | Self::Array => "array",
            Self::Map | Self::Struct(_) => "object",
        }
    }

    /// Nested field table for [`FieldKind::Struct`].
    pub fn nested(&self) -> Option<Vec<Field>> {
        match self {
            Self::Struct(fields) => Some(fields()),
            _ => None,
        }
    }
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("String"),
            Self::Integer => f.write_str("Integer"),
            Self::Float => f.write_str("Float"),
            Self::Bool => f.write_str("Bool"),
            Self::Bytes => f.write_str("Bytes"),
            Self::Array => f.write_str("Array"),
            Self::Map => f.write_str("Map"),
            Self::Struct(_) => f.write_str("Struct(..)"),
            Self::Other => f.write_str("Other"),
        }
    }
}

/// Marker name for fields excluded from the wire format.
pub const SKIPPED: &str = "-";

/// Descriptor for one field of a bindable type.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    field_name: Option<String>,
    kind: FieldKind,
    required: bool,
    pattern: Option<String>,
    enum_values: Vec<String>,
    description: Option<String>,
    format: Option<String>,
    default: Option<Value>,
    example: Option<Value>,
}

impl Field {
    /// Creates a field with an explicit kind. `name` is the wire name.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            field_name: None,
            kind,
            required: false,
            pattern: None,
            enum_values: Vec::new(),
            description: None,
            format: None,
            default: None,
            example: None,
        }
    }

    /// Text field.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    /// Integer field.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    /// Float field.
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float)
    }

    /// Boolean field.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    /// Byte sequence field.
    pub fn bytes(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Bytes)
    }

    /// Sequence field.
    pub fn array(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Array)
    }

    /// Map field.
    pub fn map(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Map)
    }

    /// Nested struct field, described by `T`'s own table.
    pub fn nested<T: Bindable>(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Struct(T::fields))
    }

    /// Sets the source struct field name when it differs from the wire name.
    #[must_use]
    pub fn field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = Some(field_name.into());
        self
    }

    /// Marks the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the requirement flag.
    #[must_use]
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Regex the field's string form must match.
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Comma-separated list of allowed values.
    #[must_use]
    pub fn one_of(mut self, values: &str) -> Self {
        self.enum_values = values
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect();
        self
    }

    /// Human-readable description.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Schema format hint (`date-time`, `email`, ...).
    #[must_use]
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Default value advertised in schemas.
    #[must_use]
    pub fn default_value(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Example value advertised in schemas.
    #[must_use]
    pub fn example(mut self, example: impl Into<Value>) -> Self {
        self.example = Some(example.into());
        self
    }

    /// Wire name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source struct field name, falling back to the wire name.
    pub fn source_name(&self) -> &str {
        self.field_name.as_deref().unwrap_or(&self.name)
    }

    /// Coercion category.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Whether the field is required.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Pattern rule.
    pub fn pattern_rule(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    /// Allowed values.
    pub fn enum_values(&self) -> &[String] {
        &self.enum_values
    }

    /// Description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Format hint.
    pub fn format_hint(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// Default value.
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Example value.
    pub fn example_value(&self) -> Option<&Value> {
        self.example.as_ref()
    }

    /// Whether the field is excluded from the wire format.
    pub fn is_skipped(&self) -> bool {
        self.name == SKIPPED
    }

    /// Whether the field carries any validation rule.
    pub fn has_rules(&self) -> bool {
        self.required || self.pattern.is_some() || !self.enum_values.is_empty()
    }
}

/// A type that can be bound from a request.
///
/// Implementors list their wire fields and may override [`validate`](Self::validate)
/// to add checks that run after the structural rules.
pub trait Bindable: DeserializeOwned + Send + Sync + 'static {
    /// Field table.
    fn fields() -> Vec<Field>;

    /// Custom validation hook for bodies.
    ///
    /// Returning an [`ApiError`](gapi_core::ApiError) passes it through
    /// unchanged; any other error becomes a 400 `invalid_body`.
    fn validate(&self) -> Result<(), BoxError> {
        Ok(())
    }
}
