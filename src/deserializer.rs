//! Serde deserializer implementation for parsed maps
//!
//! This module lets a parsed token list be deserialized directly into Rust
//! types using the standard serde derive macros:
//!
//! ```rust
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Args {
//!     user_name: String,
//!     verbose: bool,
//!     retries: u32,
//! }
//!
//! let args: Args = kv_typecast::from_tokens(["--user-name=mig", "--verbose", "retries:3"])?;
//! assert_eq!(args.user_name, "mig");
//! assert!(args.verbose);
//! assert_eq!(args.retries, 3);
//! # Ok::<(), kv_typecast::KvError>(())
//! ```
//!
//! Typed extraction works on the raw token text. A value is only typecast
//! when the target field asks for a boolean or a number, so `zip=007` still
//! fills a `String` field with `"007"`.

use crate::error::KvError;
use crate::parser::{KeyValueParser, typecast_str};
use crate::value::{Array, Map, Value};
use serde::de::{self, DeserializeOwned, DeserializeSeed, IntoDeserializer, Visitor};

fn type_mismatch(expected: &str, found: &Value) -> KvError {
    KvError::Deserialize(format!(
        "Type mismatch: expected {}, found {} '{}'",
        expected,
        found.type_name(),
        found
    ))
}

/// Deserializer for the merged result map
pub struct MapDeserializer {
    map: Map,
    typecast: bool,
}

impl MapDeserializer {
    /// Creates a deserializer that consumes `map`, typecasting string values
    /// on demand
    pub fn new(map: Map) -> Self {
        Self::with_typecast(map, true)
    }

    /// Creates a deserializer that consumes `map`; with `typecast` off, string
    /// values only fill string fields
    pub fn with_typecast(map: Map, typecast: bool) -> Self {
        Self { map, typecast }
    }
}

impl<'de> de::Deserializer<'de> for MapDeserializer {
    type Error = KvError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_map(ValueMapAccess::new(self.map, self.typecast))
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }
}

/// Deserializer for individual values
pub struct ValueDeserializer {
    value: Value,
    typecast: bool,
}

impl ValueDeserializer {
    /// Creates a deserializer that consumes `value`, typecasting strings on demand
    pub fn new(value: Value) -> Self {
        Self::with_typecast(value, true)
    }

    /// Creates a deserializer that consumes `value`
    pub fn with_typecast(value: Value, typecast: bool) -> Self {
        Self { value, typecast }
    }

    /// The value as seen by a non-string target: raw strings go through
    /// `typecast_str` and a missing value becomes `true`
    fn typed(self) -> Value {
        match self.value {
            Value::String(s) if self.typecast => typecast_str(&s),
            Value::Null if self.typecast => Value::Boolean(true),
            other => other,
        }
    }
}

impl<'de> IntoDeserializer<'de, KvError> for Value {
    type Deserializer = ValueDeserializer;

    fn into_deserializer(self) -> Self::Deserializer {
        ValueDeserializer::new(self)
    }
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = KvError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        let typecast = self.typecast;
        match self.typed() {
            Value::String(s) => visitor.visit_string(s),
            Value::Integer(i) => visitor.visit_i64(i),
            Value::Float(f) => visitor.visit_f64(f),
            Value::Boolean(b) => visitor.visit_bool(b),
            Value::Null => visitor.visit_unit(),
            Value::Array(arr) => visitor.visit_seq(ValueSeqAccess::new(*arr, typecast)),
        }
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.typed() {
            Value::Boolean(b) => visitor.visit_bool(b),
            // A bare flag that was not typecast is still a set flag
            Value::Null => visitor.visit_bool(true),
            other => Err(type_mismatch("boolean", &other)),
        }
    }

    fn deserialize_i8<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i16<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i32<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.typed() {
            Value::Integer(i) => visitor.visit_i64(i),
            // i64::MAX as f64 rounds up to 2^63, hence the strict bound
            Value::Float(f)
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 =>
            {
                visitor.visit_i64(f as i64)
            }
            other => Err(type_mismatch("integer", &other)),
        }
    }

    fn deserialize_u8<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_u64(visitor)
    }

    fn deserialize_u16<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_u64(visitor)
    }

    fn deserialize_u32<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_u64(visitor)
    }

    fn deserialize_u64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.typed() {
            Value::Integer(i) if i >= 0 => visitor.visit_u64(i as u64),
            Value::Float(f) if f.fract() == 0.0 && f >= 0.0 && f < u64::MAX as f64 => {
                visitor.visit_u64(f as u64)
            }
            other => Err(type_mismatch("unsigned integer", &other)),
        }
    }

    fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_f64(visitor)
    }

    fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.typed() {
            Value::Float(f) => visitor.visit_f64(f),
            Value::Integer(i) => visitor.visit_f64(i as f64),
            other => Err(type_mismatch("float", &other)),
        }
    }

    fn deserialize_char<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::String(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => visitor.visit_char(c),
                    _ => Err(KvError::Deserialize(format!(
                        "Type mismatch: expected single character, found string of length {}",
                        s.chars().count()
                    ))),
                }
            }
            other => Err(type_mismatch("character", &other)),
        }
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    // Token text is passed through untouched. Only values that were typed
    // before reaching here (defaults, typecast parses) are rendered.
    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::String(s) => visitor.visit_string(s),
            scalar @ (Value::Integer(_) | Value::Float(_) | Value::Boolean(_)) => {
                visitor.visit_string(scalar.to_string())
            }
            other => Err(type_mismatch("string", &other)),
        }
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    // An untyped bare flag is still present, so it is `Some(true)` when
    // typecasting and `None` otherwise.
    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Null if !self.typecast => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Null => visitor.visit_unit(),
            other => Err(type_mismatch("unit", &other)),
        }
    }

    fn deserialize_unit_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    // A key given a single value still fills a sequence field.
    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Array(arr) => visitor.visit_seq(ValueSeqAccess::new(*arr, self.typecast)),
            Value::Null => Err(type_mismatch("sequence", &Value::Null)),
            single => {
                let mut arr = Array::new();
                arr.push(single);
                visitor.visit_seq(ValueSeqAccess::new(arr, self.typecast))
            }
        }
    }

    fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        Err(type_mismatch("map", &self.value))
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_map(visitor)
    }

    // Only unit variants can be named by a token value (`--mode=fast`).
    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::String(s) => {
                let variant: de::value::StringDeserializer<KvError> = s.into_deserializer();
                visitor.visit_enum(variant)
            }
            other => Err(type_mismatch("enum variant name", &other)),
        }
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_unit()
    }
}

/// Sequence access for array values
struct ValueSeqAccess {
    array: smallvec::IntoIter<[Value; 4]>,
    typecast: bool,
}

impl ValueSeqAccess {
    fn new(array: Array, typecast: bool) -> Self {
        Self {
            array: array.into_iter(),
            typecast,
        }
    }
}

impl<'de> de::SeqAccess<'de> for ValueSeqAccess {
    type Error = KvError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: DeserializeSeed<'de>,
    {
        match self.array.next() {
            Some(value) => seed
                .deserialize(ValueDeserializer::with_typecast(value, self.typecast))
                .map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.array.len())
    }
}

/// Map access over the result map
struct ValueMapAccess {
    entries: indexmap::map::IntoIter<String, Value>,
    current_value: Option<Value>,
    typecast: bool,
}

impl ValueMapAccess {
    fn new(map: Map, typecast: bool) -> Self {
        Self {
            entries: map.into_iter(),
            current_value: None,
            typecast,
        }
    }
}

impl<'de> de::MapAccess<'de> for ValueMapAccess {
    type Error = KvError;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: DeserializeSeed<'de>,
    {
        match self.entries.next() {
            Some((key, value)) => {
                self.current_value = Some(value);
                seed.deserialize(ValueDeserializer::with_typecast(
                    Value::String(key),
                    self.typecast,
                ))
                .map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        match self.current_value.take() {
            Some(value) => seed.deserialize(ValueDeserializer::with_typecast(value, self.typecast)),
            None => Err(KvError::Deserialize(
                "No value available for map entry".to_string(),
            )),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

/// Deserializes a parsed map into a Rust type
pub fn from_map<T>(map: Map) -> Result<T, KvError>
where
    T: DeserializeOwned,
{
    T::deserialize(MapDeserializer::new(map))
}

/// Parses tokens with the default parser and deserializes the result
pub fn from_tokens<T, I, S>(tokens: I) -> Result<T, KvError>
where
    T: DeserializeOwned,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    KeyValueParser::default().parse_into(tokens)
}
