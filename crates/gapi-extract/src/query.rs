//! Query string binding.

use gapi_core::{kinds, ApiError};

use crate::field::Bindable;

/// Binds a raw query string (without the leading `?`) into `T`.
///
/// Keys are matched against the wire names of `T`'s field table and renamed
/// to their source names before decoding with `serde_urlencoded`. Unknown keys
/// are ignored. Any decoding failure, including a missing required key, is a
/// 422 `query_params_encoding`.
///
/// # Example
///
/// ```rust
/// use gapi_extract::{bind_query, Bindable, Field};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct ListParams {
///     #[serde(default)]
///     limit: Option<u32>,
///     #[serde(default)]
///     search: Option<String>,
/// }
///
/// impl Bindable for ListParams {
///     fn fields() -> Vec<Field> {
///         vec![Field::integer("limit"), Field::string("search")]
///     }
/// }
///
/// let params: ListParams = bind_query(Some("limit=10&utm=x")).unwrap();
/// assert_eq!(params.limit, Some(10));
/// assert_eq!(params.search, None);
/// ```
pub fn bind_query<T: Bindable>(query: Option<&str>) -> Result<T, ApiError> {
    let fields = T::fields();
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_str(query.unwrap_or_default()).map_err(encoding_error)?;

    if let Some(missing) = fields
        .iter()
        .filter(|f| f.is_required() && !f.is_skipped())
        .find(|f| !pairs.iter().any(|(k, _)| k == f.name()))
    {
        return Err(ApiError::unprocessable_entity(
            kinds::QUERY_PARAMS_ENCODING,
            format!("query parameter {} is required", missing.name()),
        ));
    }

    let renamed: Vec<(String, String)> = pairs
        .into_iter()
        .map(|(key, value)| {
            let key = fields
                .iter()
                .find(|f| f.name() == key)
                .map_or(key.clone(), |f| f.source_name().to_string());
            (key, value)
        })
        .collect();

    let encoded = serde_urlencoded::to_string(&renamed).map_err(encoding_error)?;
    serde_urlencoded::from_str(&encoded).map_err(encoding_error)
}

fn encoding_error(err: impl Into<gapi_core::BoxError>) -> ApiError {
    ApiError::wrap_raw(err, "failed to decode query params")
        .with_kind(kinds::QUERY_PARAMS_ENCODING)
        .with_status(http::StatusCode::UNPROCESSABLE_ENTITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use http::StatusCode;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Search {
        q: String,
        #[serde(default)]
        page: Option<u32>,
        #[serde(default)]
        exact: bool,
        #[serde(rename = "sort", default)]
        sort_by: Option<String>,
    }

    impl Bindable for Search {
        fn fields() -> Vec<Field> {
            vec![
                Field::string("q").required(),
                Field::integer("page"),
                Field::boolean("exact"),
                Field::string("order").field_name("sort"),
            ]
        }
    }

    #[test]
    fn test_binds_known_keys() {
        let search: Search = bind_query(Some("q=rust%20lang&page=2&exact=true")).unwrap();
        assert_eq!(search.q, "rust lang");
        assert_eq!(search.page, Some(2));
        assert!(search.exact);
    }

    #[test]
    fn test_wire_name_is_renamed() {
        let search: Search = bind_query(Some("q=a&order=desc")).unwrap();
        assert_eq!(search.sort_by.as_deref(), Some("desc"));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let search: Search = bind_query(Some("q=a&tracking=1")).unwrap();
        assert_eq!(search.q, "a");
        assert_eq!(search.page, None);
    }

    #[test]
    fn test_missing_required_key() {
        let err = bind_query::<Search>(Some("page=1")).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.kind(), kinds::QUERY_PARAMS_ENCODING);
        assert_eq!(err.message(), "query parameter q is required");
    }

    #[test]
    fn test_bad_value_is_unprocessable() {
        let err = bind_query::<Search>(Some("q=a&page=two")).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.kind(), kinds::QUERY_PARAMS_ENCODING);
    }

    #[test]
    fn test_absent_query_string() {
        let err = bind_query::<Search>(None).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
