//! Request body binding and structural validation.
//!
//! Binding resolves a codec from the registry, decodes the body into the
//! target type, walks the target's field table against the decoded value and
//! finally runs the [`Bindable::validate`] hook.
//!
//! | Failure | Status | Kind |
//! |---------|--------|------|
//! | forced type without codec, unknown content type | 415 | `unsupported_content_type` |
//! | malformed `Content-Type` header | 400 | `invalid_content_type` |
//! | decode error | 400 | `invalid_body_format` |
//! | required field at its zero value | 400 | `missing_param` |
//! | pattern mismatch | 400 | `body_validation_failed` |
//! | value outside the enum | 400 | `enum_validation_failed` |
//! | `validate` hook error | 400 | `invalid_body` (structured errors pass through) |
//! | bad rule (`-` name with rules, invalid regex) | 500 | `invalid_config` |

use std::sync::Arc;

use gapi_core::codec::{self, Codec, CodecRegistry};
use gapi_core::{kinds, ApiError};
use http::StatusCode;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::field::{Bindable, Field, FieldKind};

/// Picks the codec used to decode a request body.
///
/// A forced type always wins. Otherwise the `Content-Type` header is parsed
/// and its essence looked up; without a header the registry default is used.
pub fn resolve_codec<'r>(
    registry: &'r CodecRegistry,
    content_type: Option<&str>,
) -> Result<&'r Arc<dyn Codec>, ApiError> {
    if let Some(forced) = registry.forced_type() {
        return registry.get(forced).ok_or_else(|| {
            ApiError::unsupported_media_type(
                kinds::UNSUPPORTED_CONTENT_TYPE,
                format!("no decoder found for content type {forced}"),
            )
        });
    }

    match content_type.map(str::trim).filter(|ct| !ct.is_empty()) {
        Some(header) => {
            let parsed: mime::Mime = header.parse().map_err(|err| {
                ApiError::wrap_raw(err, "unable to resolve content type")
                    .with_kind(kinds::INVALID_CONTENT_TYPE)
                    .with_status(StatusCode::BAD_REQUEST)
            })?;
            registry.get(parsed.essence_str()).ok_or_else(|| {
                ApiError::unsupported_media_type(
                    kinds::UNSUPPORTED_CONTENT_TYPE,
                    format!("unsupported content-type {}", parsed.essence_str()),
                )
            })
        }
        None => registry.default_codec().ok_or_else(|| {
            ApiError::unsupported_media_type(
                kinds::UNSUPPORTED_CONTENT_TYPE,
                "no content type given and no default decoder",
            )
        }),
    }
}

/// Decodes and validates a request body.
///
/// `skip_validation` only skips the [`Bindable::validate`] hook; field rules
/// always run.
///
/// # Example
///
/// ```rust
/// use gapi_core::{kinds, CodecRegistry};
/// use gapi_extract::{bind_body, Bindable, Field};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct CreateUser {
///     #[serde(rename = "userName")]
///     name: String,
/// }
///
/// impl Bindable for CreateUser {
///     fn fields() -> Vec<Field> {
///         vec![Field::string("userName").required()]
///     }
/// }
///
/// let registry = CodecRegistry::standard();
/// let err = bind_body::<CreateUser>(&registry, None, br#"{"userName":""}"#, false).unwrap_err();
/// assert_eq!(err.kind(), kinds::MISSING_PARAM);
/// assert_eq!(err.message(), "field userName is required");
/// ```
pub fn bind_body<T>(
    registry: &CodecRegistry,
    content_type: Option<&str>,
    body: &[u8],
    skip_validation: bool,
) -> Result<T, ApiError>
where
    T: Bindable + Serialize,
{
    let codec = resolve_codec(registry, content_type)?;
    let value: T = codec::decode(codec.as_ref(), body).map_err(|err| {
        ApiError::wrap_raw(err, "failed to decode body")
            .with_kind(kinds::INVALID_BODY_FORMAT)
            .with_status(StatusCode::BAD_REQUEST)
    })?;

    let tree = serde_json::to_value(&value).map_err(|err| {
        ApiError::wrap_raw(err, "failed to inspect decoded body").with_kind(kinds::INVALID_CONFIG)
    })?;
    validate_fields(&T::fields(), &tree, "")?;

    if !skip_validation {
        value.validate().map_err(|err| {
            ApiError::from_boxed(err, |other| {
                let message = other.to_string();
                ApiError::wrap_raw(other, message)
                    .with_kind(kinds::INVALID_BODY)
                    .with_status(StatusCode::BAD_REQUEST)
            })
        })?;
    }

    Ok(value)
}

/// Checks `value` against a field table, depth first.
///
/// Missing keys are treated as `null`. `prefix` is the dotted path of the
/// enclosing field, used in error messages.
pub fn validate_fields(fields: &[Field], value: &Value, prefix: &str) -> Result<(), ApiError> {
    for field in fields {
        if field.is_skipped() {
            if field.has_rules() {
                return Err(ApiError::internal_server_error(
                    kinds::INVALID_CONFIG,
                    format!(
                        "field '{}' carries validation rules but is not serialized",
                        field.source_name()
                    ),
                ));
            }
            continue;
        }

        let path = if prefix.is_empty() {
            field.name().to_string()
        } else {
            format!("{prefix}.{}", field.name())
        };
        let current = value.get(field.name()).unwrap_or(&Value::Null);

        // Per field: pattern, then enum, then required. Absent values only
        // face the required rule.
        if !current.is_null() {
            check_pattern(field, current, &path)?;
            check_enum(field, current, &path)?;
        }

        if field.is_required() && is_zero(current) {
            return Err(ApiError::bad_request(
                kinds::MISSING_PARAM,
                format!("field {path} is required"),
            ));
        }

        if let (FieldKind::Struct(nested), Value::Object(_)) = (field.kind(), current) {
            validate_fields(&nested(), current, &path)?;
        }
    }
    Ok(())
}

fn check_pattern(field: &Field, value: &Value, path: &str) -> Result<(), ApiError> {
    let Some(pattern) = field.pattern_rule() else {
        return Ok(());
    };
    let regex = Regex::new(pattern).map_err(|err| {
        ApiError::wrap_raw(err, format!("pattern of field {path} is not a valid regex"))
            .with_kind(kinds::INVALID_CONFIG)
    })?;
    if regex.is_match(&display(value)) {
        Ok(())
    } else {
        Err(ApiError::bad_request(
            kinds::BODY_VALIDATION_FAILED,
            format!("field {path} does not match the required pattern"),
        ))
    }
}

fn check_enum(field: &Field, value: &Value, path: &str) -> Result<(), ApiError> {
    let allowed = field.enum_values();
    if allowed.is_empty() {
        return Ok(());
    }
    let text = display(value);
    if allowed.iter().any(|v| *v == text) {
        Ok(())
    } else {
        Err(ApiError::bad_request(
            kinds::ENUM_VALIDATION_FAILED,
            format!("field {path} must be one of [{}]", allowed.join(",")),
        ))
    }
}

/// String form used by pattern and enum rules.
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Whether `value` is the zero value of its type.
///
/// Objects are zero when every member is.
pub fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(members) => members.values().all(is_zero),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gapi_core::{BoxError, CodecRegistry, APPLICATION_JSON, APPLICATION_XML};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Address {
        city: String,
        #[serde(default)]
        zip: String,
    }

    impl Bindable for Address {
        fn fields() -> Vec<Field> {
            vec![
                Field::string("city").required(),
                Field::string("zip").pattern("^[0-9]{5}$"),
            ]
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename = "user")]
    struct NewUser {
        #[serde(rename = "userName")]
        name: String,
        role: String,
        #[serde(default)]
        age: u32,
        address: Option<Address>,
    }

    impl Bindable for NewUser {
        fn fields() -> Vec<Field> {
            vec![
                Field::string("userName").field_name("name").required(),
                Field::string("role").one_of("admin,member"),
                Field::integer("age"),
                Field::nested::<Address>("address"),
            ]
        }

        fn validate(&self) -> Result<(), BoxError> {
            if self.name == "root" {
                return Err("root is reserved".into());
            }
            if self.name == "ghost" {
                return Err(ApiError::conflict("user_exists", "ghost exists").into());
            }
            Ok(())
        }
    }

    fn bind(body: &serde_json::Value) -> Result<NewUser, ApiError> {
        let bytes = serde_json::to_vec(body).unwrap();
        bind_body(&CodecRegistry::standard(), Some(APPLICATION_JSON), &bytes, false)
    }

    #[test]
    fn test_valid_body() {
        let user = bind(&json!({
            "userName": "ada",
            "role": "admin",
            "address": {"city": "Paris", "zip": "75001"}
        }))
        .unwrap();
        assert_eq!(user.name, "ada");
        assert_eq!(user.address.unwrap().city, "Paris");
    }

    #[test]
    fn test_required_names_wire_field() {
        let err = bind(&json!({"userName": "", "role": "admin"})).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), kinds::MISSING_PARAM);
        assert_eq!(err.message(), "field userName is required");
    }

    #[test]
    fn test_enum_rule() {
        let err = bind(&json!({"userName": "ada", "role": "owner"})).unwrap_err();
        assert_eq!(err.kind(), kinds::ENUM_VALIDATION_FAILED);
        assert_eq!(err.message(), "field role must be one of [admin,member]");
    }

    #[test]
    fn test_nested_rules_depth_first() {
        let err = bind(&json!({
            "userName": "ada",
            "role": "member",
            "address": {"city": "", "zip": "1"}
        }))
        .unwrap_err();
        assert_eq!(err.kind(), kinds::MISSING_PARAM);
        assert_eq!(err.message(), "field address.city is required");

        let err = bind(&json!({
            "userName": "ada",
            "role": "member",
            "address": {"city": "Lyon", "zip": "1"}
        }))
        .unwrap_err();
        assert_eq!(err.kind(), kinds::BODY_VALIDATION_FAILED);
    }

    #[test]
    fn test_absent_optional_struct_is_skipped() {
        let user = bind(&json!({"userName": "ada", "role": "member"})).unwrap();
        assert!(user.address.is_none());
    }

    #[test]
    fn test_validate_hook_plain_error() {
        let err = bind(&json!({"userName": "root", "role": "admin"})).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), kinds::INVALID_BODY);
        assert_eq!(err.message(), "root is reserved");
    }

    #[test]
    fn test_validate_hook_structured_error_passes_through() {
        let err = bind(&json!({"userName": "ghost", "role": "admin"})).unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.kind(), "user_exists");
    }

    #[test]
    fn test_skip_validation_only_skips_hook() {
        let registry = CodecRegistry::standard();
        let user: NewUser = bind_body(
            &registry,
            None,
            br#"{"userName":"root","role":"admin"}"#,
            true,
        )
        .unwrap();
        assert_eq!(user.name, "root");

        let err = bind_body::<NewUser>(&registry, None, br#"{"userName":"","role":"admin"}"#, true)
            .unwrap_err();
        assert_eq!(err.kind(), kinds::MISSING_PARAM);
    }

    #[test]
    fn test_xml_body() {
        let registry = CodecRegistry::standard();
        let body = b"<user><userName>ada</userName><role>member</role><age>3</age></user>";
        let user: NewUser =
            bind_body(&registry, Some("application/xml; charset=utf-8"), body, false).unwrap();
        assert_eq!(user.name, "ada");
        assert_eq!(user.age, 3);
    }

    #[test]
    fn test_decode_failure() {
        let registry = CodecRegistry::standard();
        let err = bind_body::<NewUser>(&registry, None, b"{not json", false).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), kinds::INVALID_BODY_FORMAT);
    }

    #[test]
    fn test_codec_resolution() {
        let registry = CodecRegistry::standard();
        assert_eq!(
            resolve_codec(&registry, None).unwrap().media_type(),
            APPLICATION_JSON
        );
        assert_eq!(
            resolve_codec(&registry, Some("Application/XML")).unwrap().media_type(),
            APPLICATION_XML
        );

        let err = resolve_codec(&registry, Some("text/csv")).err().unwrap();
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(err.kind(), kinds::UNSUPPORTED_CONTENT_TYPE);

        let err = resolve_codec(&registry, Some("not a mime")).err().unwrap();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), kinds::INVALID_CONTENT_TYPE);
    }

    #[test]
    fn test_forced_type() {
        let registry = CodecRegistry::standard().with_forced(APPLICATION_JSON);
        assert_eq!(
            resolve_codec(&registry, Some(APPLICATION_XML)).unwrap().media_type(),
            APPLICATION_JSON
        );

        let registry = CodecRegistry::json().with_forced("application/yaml");
        let err = resolve_codec(&registry, None).err().unwrap();
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn test_invalid_rules_are_config_errors() {
        let fields = vec![Field::string("-").required()];
        let err = validate_fields(&fields, &json!({}), "").unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.kind(), kinds::INVALID_CONFIG);

        let fields = vec![Field::string("name").pattern("([")];
        let err = validate_fields(&fields, &json!({"name": "x"}), "").unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.kind(), kinds::INVALID_CONFIG);
    }

    #[test]
    fn test_rule_order_within_a_field() {
        let fields = vec![Field::string("role")
            .required()
            .pattern("^[a-z]+$")
            .one_of("admin,member")];

        let err = validate_fields(&fields, &json!({"role": "Owner"}), "").unwrap_err();
        assert_eq!(err.kind(), kinds::BODY_VALIDATION_FAILED);

        let err = validate_fields(&fields, &json!({"role": "owner"}), "").unwrap_err();
        assert_eq!(err.kind(), kinds::ENUM_VALIDATION_FAILED);

        let err = validate_fields(&fields, &json!({"role": ""}), "").unwrap_err();
        assert_eq!(err.kind(), kinds::BODY_VALIDATION_FAILED);

        let err = validate_fields(&fields, &json!({}), "").unwrap_err();
        assert_eq!(err.kind(), kinds::MISSING_PARAM);
        assert_eq!(err.message(), "field role is required");
    }

    #[test]
    fn test_pattern_uses_string_form_of_numbers() {
        let fields = vec![Field::integer("code").pattern("^[0-9]{3}$")];
        assert!(validate_fields(&fields, &json!({"code": 404}), "").is_ok());
        assert!(validate_fields(&fields, &json!({"code": 4040}), "").is_err());
    }

    #[test]
    fn test_zero_values() {
        assert!(is_zero(&json!(null)));
        assert!(is_zero(&json!(0)));
        assert!(is_zero(&json!(0.0)));
        assert!(is_zero(&json!("")));
        assert!(is_zero(&json!(false)));
        assert!(is_zero(&json!([])));
        assert!(is_zero(&json!({"a": "", "b": 0})));
        assert!(!is_zero(&json!({"a": "x"})));
        assert!(!is_zero(&json!(-1)));
    }
}
