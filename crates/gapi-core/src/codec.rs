//! Content codec registry.
//!
//! A [`Codec`] encodes and decodes one media type. The [`CodecRegistry`] maps
//! media types to codecs and carries the default and forced media types used by
//! body decoding and response writing.
//!
//! Codecs are object-safe through `erased-serde`: encoders receive a
//! `&dyn erased_serde::Serialize` and decoders hand an erased deserializer to a
//! sink, so typed decoding goes straight from bytes to the target type.
//!
//! | Media type | Codec |
//! |------------|-------|
//! | `application/json` | [`JsonCodec`] (`serde_json`) |
//! | `application/xml` | [`XmlCodec`] (`quick-xml`) |

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::xml::{Items, SequenceRoot};

/// `application/json`.
pub const APPLICATION_JSON: &str = "application/json";
/// `application/xml`.
pub const APPLICATION_XML: &str = "application/xml";

/// Errors produced by codecs.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Encoding failed.
    #[error("failed to encode {media_type}: {reason}")]
    Encode {
        /// Codec media type.
        media_type: String,
        /// Underlying failure.
        reason: String,
    },

    /// Decoding failed.
    #[error("failed to decode {media_type}: {reason}")]
    Decode {
        /// Codec media type.
        media_type: String,
        /// Underlying failure.
        reason: String,
    },

    /// No codec registered for the media type.
    #[error("no codec registered for {0}")]
    Unsupported(String),
}

impl CodecError {
    fn encode(media_type: &str, reason: impl fmt::Display) -> Self {
        Self::Encode {
            media_type: media_type.to_string(),
            reason: reason.to_string(),
        }
    }

    fn decode(media_type: &str, reason: impl fmt::Display) -> Self {
        Self::Decode {
            media_type: media_type.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Receives an erased deserializer positioned at the start of a decoded body.
pub type DecodeSink<'a> = dyn for<'de> FnMut(
        &mut dyn erased_serde::Deserializer<'de>,
    ) -> Result<(), erased_serde::Error>
    + 'a;

/// Encoder and decoder for one media type.
pub trait Codec: Send + Sync + 'static {
    /// Media type essence, lowercase (`type/subtype`).
    fn media_type(&self) -> &str;

    /// Encodes a value.
    fn encode(&self, value: &dyn erased_serde::Serialize) -> Result<Vec<u8>, CodecError>;

    /// Decodes `body`, handing the deserializer to `sink`.
    fn decode(&self, body: &[u8], sink: &mut DecodeSink<'_>) -> Result<(), CodecError>;
}

/// Encodes `value` with `codec`.
pub fn encode<T: Serialize + ?Sized>(codec: &dyn Codec, value: &T) -> Result<Vec<u8>, CodecError> {
    codec.encode(&value)
}

/// Decodes `body` into `T` with `codec`.
pub fn decode<T: DeserializeOwned>(codec: &dyn Codec, body: &[u8]) -> Result<T, CodecError> {
    let mut out = None;
    codec.decode(body, &mut |de| {
        out = Some(erased_serde::deserialize::<T>(de)?);
        Ok(())
    })?;
    out.ok_or_else(|| CodecError::decode(codec.media_type(), "decoder produced no value"))
}

/// JSON codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn media_type(&self) -> &str {
        APPLICATION_JSON
    }

    fn encode(&self, value: &dyn erased_serde::Serialize) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::encode(APPLICATION_JSON, e))
    }

    fn decode(&self, body: &[u8], sink: &mut DecodeSink<'_>) -> Result<(), CodecError> {
        let mut de = serde_json::Deserializer::from_slice(body);
        sink(&mut <dyn erased_serde::Deserializer>::erase(&mut de))
            .map_err(|e| CodecError::decode(APPLICATION_JSON, e))?;
        de.end().map_err(|e| CodecError::decode(APPLICATION_JSON, e))
    }
}

/// XML codec backed by `quick-xml`.
///
/// Named structs use their serde name as the root element; anything else
/// (maps, `serde_json::Value`) is wrapped in the configured root element.
/// Sequences become one `<item>` per element under that root, so an empty
/// list is `<response/>` rather than an empty body.
#[derive(Debug, Clone)]
pub struct XmlCodec {
    root: String,
}

impl XmlCodec {
    /// Creates a codec with a `response` fallback root element.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root("response")
    }

    /// Creates a codec with a custom fallback root element.
    #[must_use]
    pub fn with_root(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for XmlCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for XmlCodec {
    fn media_type(&self) -> &str {
        APPLICATION_XML
    }

    fn encode(&self, value: &dyn erased_serde::Serialize) -> Result<Vec<u8>, CodecError> {
        let text = match quick_xml::se::to_string(&value) {
            Ok(text) => text,
            Err(_) if is_sequence(value) => {
                quick_xml::se::to_string_with_root(&self.root, &Items { item: value })
                    .map_err(|e| CodecError::encode(APPLICATION_XML, e))?
            }
            Err(_) => quick_xml::se::to_string_with_root(&self.root, &value)
                .map_err(|e| CodecError::encode(APPLICATION_XML, e))?,
        };
        Ok(text.into_bytes())
    }

    fn decode(&self, body: &[u8], sink: &mut DecodeSink<'_>) -> Result<(), CodecError> {
        let text = std::str::from_utf8(body).map_err(|e| CodecError::decode(APPLICATION_XML, e))?;
        let mut de = quick_xml::de::Deserializer::from_str(text);
        sink(&mut <dyn erased_serde::Deserializer>::erase(SequenceRoot(&mut de)))
            .map_err(|e| CodecError::decode(APPLICATION_XML, e))
    }
}

// Only reached for values quick-xml refuses to root on its own.
fn is_sequence(value: &dyn erased_serde::Serialize) -> bool {
    serde_json::to_value(value).is_ok_and(|v| v.is_array())
}

/// Media type to codec map with default and forced selections.
#[derive(Clone)]
pub struct CodecRegistry {
    codecs: IndexMap<String, Arc<dyn Codec>>,
    default_type: Option<String>,
    forced_type: Option<String>,
}

impl CodecRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            codecs: IndexMap::new(),
            default_type: None,
            forced_type: None,
        }
    }

    /// JSON and XML codecs with JSON as the default.
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .with_codec(JsonCodec)
            .with_codec(XmlCodec::new())
            .with_default(APPLICATION_JSON)
    }

    /// JSON only.
    #[must_use]
    pub fn json() -> Self {
        Self::new().with_codec(JsonCodec).with_default(APPLICATION_JSON)
    }

    /// Registers a codec, replacing any codec for the same media type.
    #[must_use]
    pub fn with_codec(mut self, codec: impl Codec) -> Self {
        self.register(Arc::new(codec));
        self
    }

    /// Registers a shared codec.
    pub fn register(&mut self, codec: Arc<dyn Codec>) {
        self.codecs
            .insert(codec.media_type().to_ascii_lowercase(), codec);
    }

    /// Sets the media type used when the request gives no preference.
    #[must_use]
    pub fn with_default(mut self, media_type: impl Into<String>) -> Self {
        self.default_type = Some(media_type.into().to_ascii_lowercase());
        self
    }

    /// Forces a media type regardless of request headers.
    #[must_use]
    pub fn with_forced(mut self, media_type: impl Into<String>) -> Self {
        self.forced_type = Some(media_type.into().to_ascii_lowercase());
        self
    }

    /// Looks up a codec by media type essence (parameters are ignored).
    pub fn get(&self, media_type: &str) -> Option<&Arc<dyn Codec>> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.codecs.get(&essence)
    }

    /// Default media type, if configured.
    pub fn default_type(&self) -> Option<&str> {
        self.default_type.as_deref()
    }

    /// Forced media type, if configured.
    pub fn forced_type(&self) -> Option<&str> {
        self.forced_type.as_deref()
    }

    /// Codec for the default media type, if both are present.
    pub fn default_codec(&self) -> Option<&Arc<dyn Codec>> {
        self.default_type.as_deref().and_then(|t| self.get(t))
    }

    /// Registered media types in registration order.
    pub fn media_types(&self) -> impl Iterator<Item = &str> {
        self.codecs.keys().map(String::as_str)
    }

    /// Registered codecs in registration order.
    pub fn codecs(&self) -> impl Iterator<Item = &Arc<dyn Codec>> {
        self.codecs.values()
    }

    /// Number of registered codecs.
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    /// Returns `true` if no codec is registered.
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    /// Encodes `value` as `media_type`.
    pub fn encode<T: Serialize + ?Sized>(
        &self,
        media_type: &str,
        value: &T,
    ) -> Result<Vec<u8>, CodecError> {
        let codec = self
            .get(media_type)
            .ok_or_else(|| CodecError::Unsupported(media_type.to_string()))?;
        encode(codec.as_ref(), value)
    }

    /// Decodes `body` from `media_type` into `T`.
    pub fn decode<T: DeserializeOwned>(
        &self,
        media_type: &str,
        body: &[u8],
    ) -> Result<T, CodecError> {
        let codec = self
            .get(media_type)
            .ok_or_else(|| CodecError::Unsupported(media_type.to_string()))?;
        decode(codec.as_ref(), body)
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("codecs", &self.codecs.keys().collect::<Vec<_>>())
            .field("default_type", &self.default_type)
            .field("forced_type", &self.forced_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, ErrorBody};
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename = "user")]
    struct User {
        id: u32,
        name: String,
        active: bool,
        score: f64,
    }

    fn sample() -> User {
        User {
            id: 7,
            name: "Ada".to_string(),
            active: true,
            score: 12.5,
        }
    }

    #[test]
    fn test_round_trip_every_registered_codec() {
        let registry = CodecRegistry::standard();
        for media_type in [APPLICATION_JSON, APPLICATION_XML] {
            let bytes = registry.encode(media_type, &sample()).unwrap();
            let back: User = registry.decode(media_type, &bytes).unwrap();
            assert_eq!(back, sample(), "{media_type}");
        }
    }

    #[test]
    fn test_xml_sequence_has_single_root() {
        let users = vec![sample(), User { id: 8, ..sample() }];
        let codec = XmlCodec::new();

        let text = String::from_utf8(encode(&codec, &users).unwrap()).unwrap();
        assert!(text.starts_with("<response><item>"), "{text}");
        assert!(text.ends_with("</item></response>"), "{text}");
        assert_eq!(text.matches("<response>").count(), 1, "{text}");

        let back: Vec<User> = decode(&codec, text.as_bytes()).unwrap();
        assert_eq!(back, users);
    }

    #[test]
    fn test_xml_empty_sequence_round_trip() {
        let codec = XmlCodec::new();
        let bytes = encode(&codec, &Vec::<User>::new()).unwrap();
        assert!(!bytes.is_empty());

        let back: Vec<User> = decode(&codec, &bytes).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn test_xml_single_item_sequence_round_trip() {
        let registry = CodecRegistry::standard();
        let bytes = registry.encode(APPLICATION_XML, &vec![sample()]).unwrap();
        let back: Vec<User> = registry.decode(APPLICATION_XML, &bytes).unwrap();
        assert_eq!(back, vec![sample()]);
    }

    #[test]
    fn test_xml_uses_struct_name_as_root() {
        let bytes = encode(&XmlCodec::new(), &sample()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("<user>"), "{text}");
        assert!(text.contains("<name>Ada</name>"));
    }

    #[test]
    fn test_error_body_in_both_formats() {
        let err = ApiError::not_found("user_not_found", "no such user");
        let registry = CodecRegistry::standard();

        let json = registry.encode(APPLICATION_JSON, &err).unwrap();
        let body: ErrorBody = registry.decode(APPLICATION_JSON, &json).unwrap();
        assert_eq!(body.kind, "user_not_found");

        let xml = registry.encode(APPLICATION_XML, &err).unwrap();
        let text = String::from_utf8(xml.clone()).unwrap();
        assert!(text.starts_with("<error>"), "{text}");
        let body: ErrorBody = registry.decode(APPLICATION_XML, &xml).unwrap();
        assert_eq!(body.message, "no such user");
    }

    #[test]
    fn test_lookup_ignores_parameters_and_case() {
        let registry = CodecRegistry::standard();
        assert!(registry.get("Application/JSON; charset=utf-8").is_some());
        assert!(registry.get("text/plain").is_none());
    }

    #[test]
    fn test_default_and_forced() {
        let registry = CodecRegistry::standard().with_forced(APPLICATION_XML);
        assert_eq!(registry.default_type(), Some(APPLICATION_JSON));
        assert_eq!(registry.forced_type(), Some(APPLICATION_XML));
        assert_eq!(
            registry.default_codec().unwrap().media_type(),
            APPLICATION_JSON
        );
        assert_eq!(
            registry.media_types().collect::<Vec<_>>(),
            vec![APPLICATION_JSON, APPLICATION_XML]
        );
    }

    #[test]
    fn test_decode_errors() {
        let registry = CodecRegistry::standard();
        let err = registry
            .decode::<User>(APPLICATION_JSON, b"{not json")
            .unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));

        let err = registry.decode::<User>("text/csv", b"a,b").unwrap_err();
        assert!(matches!(err, CodecError::Unsupported(_)));

        let err = registry
            .decode::<User>(APPLICATION_JSON, br#"{"id":1,"name":"x","active":true,"score":1.0} trailing"#)
            .unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));
    }
}
