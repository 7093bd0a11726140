//! Handler success values.

use std::fmt;

use bytes::Bytes;
use serde::Serialize;

use crate::error::ApiError;

/// Result returned by handlers and middlewares.
pub type HandlerResult = Result<Reply, ApiError>;

/// Success value produced by a handler.
///
/// `Empty` becomes `204 No Content`, `Raw` bytes are written as-is and
/// `Value` is encoded with the negotiated codec.
pub enum Reply {
    /// No body.
    Empty,
    /// Pre-encoded bytes, bypassing codecs.
    Raw {
        /// Body bytes.
        body: Bytes,
        /// Content type to send; `None` leaves the header unset.
        content_type: Option<String>,
    },
    /// A value to encode.
    Value(Box<dyn erased_serde::Serialize + Send + Sync>),
}

impl Reply {
    /// Wraps a serializable value.
    pub fn value<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self::Value(Box::new(value))
    }

    /// Raw bytes without a content type.
    pub fn raw(body: impl Into<Bytes>) -> Self {
        Self::Raw {
            body: body.into(),
            content_type: None,
        }
    }

    /// Raw bytes with a content type.
    pub fn raw_with_type(body: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self::Raw {
            body: body.into(),
            content_type: Some(content_type.into()),
        }
    }

    /// Returns `true` for [`Reply::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl Default for Reply {
    fn default() -> Self {
        Self::Empty
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Raw { body, content_type } => f
                .debug_struct("Raw")
                .field("len", &body.len())
                .field("content_type", content_type)
                .finish(),
            Self::Value(_) => f.write_str("Value(..)"),
        }
    }
}

impl From<()> for Reply {
    fn from((): ()) -> Self {
        Self::Empty
    }
}

impl From<Bytes> for Reply {
    fn from(body: Bytes) -> Self {
        Self::raw(body)
    }
}

impl From<Vec<u8>> for Reply {
    fn from(body: Vec<u8>) -> Self {
        Self::raw(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Codec, JsonCodec};

    #[test]
    fn test_constructors() {
        assert!(Reply::default().is_empty());
        assert!(Reply::from(()).is_empty());
        assert!(!Reply::value(42).is_empty());

        match Reply::raw_with_type("a,b", "text/csv") {
            Reply::Raw { body, content_type } => {
                assert_eq!(body, Bytes::from("a,b"));
                assert_eq!(content_type.as_deref(), Some("text/csv"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_value_encodes_through_codec() {
        let reply = Reply::value(serde_json::json!({"id": 3}));
        let Reply::Value(value) = reply else {
            panic!("expected value");
        };
        let bytes = JsonCodec.encode(&*value).unwrap();
        assert_eq!(bytes, br#"{"id":3}"#);
    }
}
