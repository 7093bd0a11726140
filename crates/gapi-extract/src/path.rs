//! Path variable binding.
//!
//! [`bind_path`] looks up each field of the target's table among the router's
//! captured variables and coerces the raw text by the field's [`FieldKind`]:
//!
//! | Kind | Coercion | Failure |
//! |------|----------|---------|
//! | `Integer` | base-10 parse | 400 `invalid_param_type` |
//! | `Float` | float parse | 400 `invalid_param_type` |
//! | `Bool` | `== "true"` | never |
//! | `String` | as-is | never |
//! | `Bytes` | raw bytes | never |
//! | anything else | | 400 `invalid_param_type` |
//!
//! A variable the router did not capture is a routing defect and yields a
//! 500 `invalid_param_type`.

use gapi_core::{kinds, ApiError};
use gapi_router::Params;
use serde_json::{Map, Number, Value};

use crate::field::{Bindable, Field, FieldKind};

/// Binds path variables into `T`.
///
/// # Example
///
/// ```rust
/// use gapi_extract::{bind_path, Bindable, Field};
/// use gapi_router::Params;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct UserPath {
///     id: u64,
/// }
///
/// impl Bindable for UserPath {
///     fn fields() -> Vec<Field> {
///         vec![Field::integer("id")]
///     }
/// }
///
/// let mut params = Params::new();
/// params.push("id", "3");
///
/// let path: UserPath = bind_path(&params).unwrap();
/// assert_eq!(path.id, 3);
/// ```
pub fn bind_path<T: Bindable>(params: &Params) -> Result<T, ApiError> {
    let mut object = Map::new();
    for field in T::fields().iter().filter(|f| !f.is_skipped()) {
        let raw = params.get(field.name()).ok_or_else(|| {
            ApiError::internal_server_error(
                kinds::INVALID_PARAM_TYPE,
                format!("unknown path variable {}", field.name()),
            )
        })?;
        object.insert(field.source_name().to_string(), coerce(field, raw)?);
    }

    serde_json::from_value(Value::Object(object)).map_err(|err| {
        ApiError::wrap_raw(err, "invalid path parameters")
            .with_kind(kinds::INVALID_PARAM_TYPE)
            .with_status(http::StatusCode::BAD_REQUEST)
    })
}

fn coerce(field: &Field, raw: &str) -> Result<Value, ApiError> {
    let invalid = |what: &str| {
        ApiError::bad_request(
            kinds::INVALID_PARAM_TYPE,
            format!("{} must be {what}", field.name()),
        )
    };

    match field.kind() {
        FieldKind::Integer => raw
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| raw.parse::<u64>().map(Value::from))
            .map_err(|_| invalid("a number")),
        FieldKind::Float => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| invalid("a float")),
        FieldKind::Bool => Ok(Value::Bool(raw == "true")),
        FieldKind::String => Ok(Value::String(raw.to_string())),
        FieldKind::Bytes => Ok(Value::Array(raw.bytes().map(Value::from).collect())),
        FieldKind::Array | FieldKind::Map | FieldKind::Struct(_) | FieldKind::Other => {
            Err(ApiError::bad_request(
                kinds::INVALID_PARAM_TYPE,
                format!("{} cannot be bound from a path variable", field.name()),
            ))
        }
    }
}
