//! Flat input schemas.
//!
//! A tool takes one flat argument object. Path, query and body fields are
//! merged into it; nested body structs are flattened with dotted keys
//! (`address.city`). Each key remembers where it came from so a call can be
//! split back into a request.

use gapi_docs::Schema;
use gapi_extract::{Field, FieldKind, ParamSource};
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{McpError, McpResult};

/// Where a flattened argument goes when a tool is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentOrigin {
    /// Request part carrying the value.
    pub source: ParamSource,
    /// Name of the Rust field the value binds to.
    pub field: String,
    /// Wire names from the body root down to the value. Empty for path and
    /// query arguments.
    pub body_path: Vec<String>,
}

impl ArgumentOrigin {
    fn param(source: ParamSource, field: &Field) -> Self {
        Self {
            source,
            field: field.source_name().to_string(),
            body_path: Vec::new(),
        }
    }

    fn body(field: &Field, body_path: Vec<String>) -> Self {
        Self {
            source: ParamSource::Body,
            field: field.source_name().to_string(),
            body_path,
        }
    }
}

/// JSON Schema object advertised as a tool's `inputSchema`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    schema_type: &'static str,
    /// One property per flattened argument.
    pub properties: IndexMap<String, Schema>,
    /// Names of the required arguments.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

/// Flattened arguments of one operation.
#[derive(Debug, Clone, Default)]
pub struct FlatSchema {
    schema: InputSchema,
    origins: IndexMap<String, ArgumentOrigin>,
}

impl FlatSchema {
    /// Flattens declared path and query parameters and body fields.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::Collision`] when two declarations produce the
    /// same argument name.
    pub fn build(params: &[(ParamSource, Field)], body: Option<&[Field]>) -> McpResult<Self> {
        let mut flat = Self {
            schema: InputSchema {
                schema_type: "object",
                ..InputSchema::default()
            },
            origins: IndexMap::new(),
        };

        for (source, field) in params {
            if field.is_skipped() || *source == ParamSource::Body {
                continue;
            }
            let required = *source == ParamSource::Path || field.is_required();
            flat.insert(
                field.name().to_string(),
                Schema::for_field(field),
                required,
                ArgumentOrigin::param(*source, field),
            )?;
        }

        if let Some(fields) = body {
            flat.flatten_body(fields, &[])?;
        }

        Ok(flat)
    }

    fn flatten_body(&mut self, fields: &[Field], parents: &[String]) -> McpResult<()> {
        for field in fields.iter().filter(|f| !f.is_skipped()) {
            let mut body_path = parents.to_vec();
            body_path.push(field.name().to_string());

            if let FieldKind::Struct(nested) = field.kind() {
                self.flatten_body(&nested(), &body_path)?;
                continue;
            }

            self.insert(
                body_path.join("."),
                Schema::for_field(field),
                field.is_required(),
                ArgumentOrigin::body(field, body_path),
            )?;
        }
        Ok(())
    }

    fn insert(
        &mut self,
        key: String,
        schema: Schema,
        required: bool,
        origin: ArgumentOrigin,
    ) -> McpResult<()> {
        if let Some(existing) = self.origins.get(&key) {
            return Err(McpError::Collision {
                key,
                first: existing.source,
                second: origin.source,
            });
        }
        if required {
            self.schema.required.push(key.clone());
        }
        self.schema.properties.insert(key.clone(), schema);
        self.origins.insert(key, origin);
        Ok(())
    }

    /// The advertised schema.
    pub fn schema(&self) -> &InputSchema {
        &self.schema
    }

    /// Origin of every argument, in declaration order.
    pub fn origins(&self) -> &IndexMap<String, ArgumentOrigin> {
        &self.origins
    }

    /// Origin of one argument.
    pub fn origin(&self, key: &str) -> Option<&ArgumentOrigin> {
        self.origins.get(key)
    }

    /// Splits the parts into the schema and the origin table.
    pub fn into_parts(self) -> (InputSchema, IndexMap<String, ArgumentOrigin>) {
        (self.schema, self.origins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gapi_extract::Bindable;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Address {
        #[allow(dead_code)]
        city: String,
    }

    impl Bindable for Address {
        fn fields() -> Vec<Field> {
            vec![Field::string("city").required(), Field::string("zip")]
        }
    }

    fn user_body() -> Vec<Field> {
        vec![
            Field::string("name").required(),
            Field::string("role").one_of("admin,member"),
            Field::nested::<Address>("address"),
        ]
    }

    #[test]
    fn test_path_and_query_arguments() {
        let params = vec![
            (ParamSource::Path, Field::integer("id")),
            (ParamSource::Query, Field::string("expand")),
            (ParamSource::Query, Field::integer("limit").required()),
        ];
        let flat = FlatSchema::build(&params, None).unwrap();

        let schema = serde_json::to_value(flat.schema()).unwrap();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["id"]["type"], "integer");
        assert_eq!(schema["properties"]["expand"]["type"], "string");
        assert_eq!(schema["required"], json!(["id", "limit"]));
        assert_eq!(flat.origin("id").unwrap().source, ParamSource::Path);
        assert_eq!(flat.origin("expand").unwrap().source, ParamSource::Query);
    }

    #[test]
    fn test_nested_body_fields_are_flattened() {
        let body = user_body();
        let flat = FlatSchema::build(&[], Some(&body)).unwrap();
        let schema = flat.schema();

        let keys: Vec<&str> = schema.properties.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "role", "address.city", "address.zip"]);
        assert_eq!(schema.required, vec!["name", "address.city"]);
        assert_eq!(
            schema.properties["role"].enum_values,
            vec![json!("admin"), json!("member")]
        );

        let city = flat.origin("address.city").unwrap();
        assert_eq!(city.source, ParamSource::Body);
        assert_eq!(city.body_path, vec!["address", "city"]);
    }

    #[test]
    fn test_collision_is_reported() {
        let params = vec![(ParamSource::Path, Field::integer("id"))];
        let body = vec![Field::integer("id")];

        let err = FlatSchema::build(&params, Some(&body)).unwrap_err();
        match err {
            McpError::Collision { key, first, second } => {
                assert_eq!(key, "id");
                assert_eq!(first, ParamSource::Path);
                assert_eq!(second, ParamSource::Body);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_schema_serializes_without_required() {
        let flat = FlatSchema::build(&[], None).unwrap();
        let schema = serde_json::to_value(flat.schema()).unwrap();
        assert_eq!(schema, json!({"type": "object", "properties": {}}));
    }
}
