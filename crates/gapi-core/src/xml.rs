//! Sequence framing for the XML codec.
//!
//! XML needs a single root element, so a top-level sequence is written as
//! one `<item>` child per element under the codec's root:
//!
//! ```text
//! <response><item>..</item><item>..</item></response>
//! ```
//!
//! [`SequenceRoot`] reads that shape back and leaves every other shape to
//! the wrapped deserializer.

use std::iter;

use serde::de::value::SeqDeserializer;
use serde::de::{DeserializeSeed, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::Serialize;

/// Element name of each sequence entry.
pub(crate) const ITEM: &str = "item";

/// Serializes a sequence as the `item` children of the root element.
#[derive(Serialize)]
pub(crate) struct Items<'a> {
    pub(crate) item: &'a dyn erased_serde::Serialize,
}

/// Deserializer that unwraps `<root><item/>..</root>` for sequence targets.
pub(crate) struct SequenceRoot<D>(pub(crate) D);

macro_rules! forward {
    ($($method:ident)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, D::Error> {
            self.0.$method(visitor)
        }
    )*};
}

impl<'de, D: Deserializer<'de>> Deserializer<'de> for SequenceRoot<D> {
    type Error = D::Error;

    forward! {
        deserialize_any deserialize_bool
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64 deserialize_i128
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64 deserialize_u128
        deserialize_f32 deserialize_f64 deserialize_char deserialize_str deserialize_string
        deserialize_bytes deserialize_byte_buf deserialize_option deserialize_unit
        deserialize_map deserialize_identifier deserialize_ignored_any
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, D::Error> {
        self.0
            .deserialize_struct("items", &[ITEM], ItemsVisitor(visitor))
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, D::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, D::Error> {
        self.0.deserialize_unit_struct(name, visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, D::Error> {
        self.0.deserialize_newtype_struct(name, visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, D::Error> {
        self.0.deserialize_tuple_struct(name, len, visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, D::Error> {
        self.0.deserialize_struct(name, fields, visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, D::Error> {
        self.0.deserialize_enum(name, variants, visitor)
    }

    fn is_human_readable(&self) -> bool {
        self.0.is_human_readable()
    }
}

struct ItemsVisitor<V>(V);

impl<'de, V: Visitor<'de>> Visitor<'de> for ItemsVisitor<V> {
    type Value = V::Value;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.expecting(f)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<V::Value, A::Error> {
        let mut visitor = Some(self.0);
        let mut value = None;
        while let Some(key) = map.next_key::<String>()? {
            match visitor.take() {
                Some(inner) if key == ITEM => value = Some(map.next_value_seed(SeqSeed(inner))?),
                other => {
                    visitor = other;
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        match (value, visitor) {
            (Some(value), _) => Ok(value),
            (None, Some(inner)) => inner.visit_seq(SeqDeserializer::new(iter::empty::<()>())),
            (None, None) => Err(serde::de::Error::missing_field(ITEM)),
        }
    }
}

struct SeqSeed<V>(V);

impl<'de, V: Visitor<'de>> DeserializeSeed<'de> for SeqSeed<V> {
    type Value = V::Value;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<V::Value, D::Error> {
        deserializer.deserialize_seq(self.0)
    }
}
