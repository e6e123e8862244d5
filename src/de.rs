//! LTSV unmarshaling.
//!
//! Two kinds of targets are supported:
//!
//! - a [`Record`], decoded field by field. Missing labels leave the field as
//!   it was; a field that fails to convert is recorded and the remaining
//!   fields are still decoded;
//! - a [`MapTarget`] (`HashMap`, `BTreeMap`, `IndexMap`, [`LtsvMap`]) whose
//!   keys and values deserialize from plain strings. Every label is inserted.
//!
//! ## Usage
//!
//! ```rust
//! use serde_ltsv::{impl_record, unmarshal_str};
//!
//! #[derive(Default, Debug, PartialEq)]
//! struct Profile {
//!     user: String,
//!     age: u8,
//!     height: Option<f64>,
//!     weight: f32,
//! }
//! impl_record!(Profile { user, age, height, weight });
//!
//! let mut profile = Profile::default();
//! unmarshal_str("user:songmu\tage:36", &mut profile).unwrap();
//! assert_eq!(profile.user, "songmu");
//! assert_eq!(profile.height, None);
//! ```

use crate::cache::PlanCache;
use crate::error::{FieldError, FieldErrors};
use crate::field::{FieldType, Kind, Record, Scalar};
use crate::map::TextDomain;
use crate::resolve::resolve_key;
use crate::{Error, LtsvMap, Result};
use indexmap::IndexMap;
use serde::de::{self, DeserializeOwned, Visitor};
use serde::Deserialize;
use serde::forward_to_deserialize_any;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

const NOT_TEXT_MAP: &str = "ltsv: not a map of string to string";

type ReadFn<R> = Box<dyn Fn(&mut R, &str) -> std::result::Result<(), FieldError> + Send + Sync>;

struct Binding<R> {
    name: &'static str,
    key: String,
    read: ReadFn<R>,
}

/// The resolved list of readers for one record type.
///
/// Excluded fields have no binding. Plans are built once per type and kept
/// in a [`PlanCache`].
pub struct DecodePlan<R> {
    bindings: Vec<Binding<R>>,
}

impl<R: Record> DecodePlan<R> {
    /// Resolves `R`'s fields into readers.
    #[must_use]
    pub fn build() -> Self {
        let bindings = R::fields()
            .into_iter()
            .filter_map(|field| {
                Some(Binding {
                    key: resolve_key(field.name, field.tag)?,
                    name: field.name,
                    read: field.decode,
                })
            })
            .collect();
        DecodePlan { bindings }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Labels this plan reads, in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|binding| binding.key.as_str())
    }

    /// Stores every label of `map` that `R` declares into `target` and
    /// returns the fields that failed.
    pub fn read(&self, map: &LtsvMap, target: &mut R) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for binding in &self.bindings {
            let Some(text) = map.get(&binding.key) else {
                continue;
            };
            if let Err(err) = (binding.read)(target, text) {
                errors.insert(binding.name, err);
            }
        }
        errors
    }
}

/// Decodes a tokenized record into `target`, using the plan for `R` in
/// [`PlanCache::global`].
///
/// # Errors
///
/// Returns [`Error::Fields`] naming every field whose text could not be
/// converted. All other fields are decoded regardless.
pub fn decode_record<R: Record>(map: &LtsvMap, target: &mut R) -> Result<()> {
    decode_record_with(PlanCache::global(), map, target)
}

/// Same as [`decode_record`] with the plan taken from `cache`.
///
/// # Errors
///
/// Returns [`Error::Fields`] if any field failed.
pub fn decode_record_with<R: Record>(
    cache: &PlanCache,
    map: &LtsvMap,
    target: &mut R,
) -> Result<()> {
    cache.decode_plan::<R>().read(map, target).into_result()
}

/// Converts `text` into `field` according to `F`'s [`Kind`].
///
/// On failure the field is left untouched.
pub(crate) fn decode_field<F: FieldType>(
    field: &mut F,
    text: &str,
) -> std::result::Result<(), FieldError> {
    let scalar = match F::KIND {
        Kind::Text => Scalar::Text(text),
        Kind::Signed { bits } => {
            Scalar::Signed(parse_signed(text, bits).ok_or_else(|| number_error::<F>(text))?)
        }
        Kind::Unsigned { bits } => {
            Scalar::Unsigned(parse_unsigned(text, bits).ok_or_else(|| number_error::<F>(text))?)
        }
        Kind::Float { bits } => {
            Scalar::Float(parse_float(text, bits).ok_or_else(|| number_error::<F>(text))?)
        }
        Kind::Custom => {
            return match F::decode_text(text.as_bytes()) {
                Some(Ok(value)) => {
                    *field = value;
                    Ok(())
                }
                Some(Err(err)) => Err(FieldError::from(err)),
                None => Err(FieldError::unmarshal(text, F::type_name())),
            };
        }
    };

    match F::from_scalar(scalar) {
        Some(value) => {
            *field = value;
            Ok(())
        }
        None => Err(FieldError::unmarshal(text, F::type_name())),
    }
}

fn number_error<F: FieldType>(text: &str) -> FieldError {
    FieldError::unmarshal(format!("number {}", text), F::type_name())
}

fn parse_signed(text: &str, bits: u32) -> Option<i64> {
    let v: i64 = text.parse().ok()?;
    if bits < 64 {
        let max = (1i64 << (bits - 1)) - 1;
        let min = -max - 1;
        if v < min || v > max {
            return None;
        }
    }
    Some(v)
}

fn parse_unsigned(text: &str, bits: u32) -> Option<u64> {
    if text.starts_with('+') {
        return None;
    }
    let v: u64 = text.parse().ok()?;
    if bits < 64 && v >> bits != 0 {
        return None;
    }
    Some(v)
}

fn parse_float(text: &str, bits: u32) -> Option<f64> {
    let v = if bits == 32 {
        f64::from(text.parse::<f32>().ok()?)
    } else {
        text.parse::<f64>().ok()?
    };
    // a finite literal too large for the width parses to infinity
    if v.is_infinite() && !is_infinity_literal(text) {
        return None;
    }
    Some(v)
}

fn is_infinity_literal(text: &str) -> bool {
    text.trim_start_matches(['+', '-'])
        .get(..3)
        .map_or(false, |prefix| prefix.eq_ignore_ascii_case("inf"))
}

/// A map that LTSV labels and values can be inserted into.
///
/// Both the key and the value type must be [`TextDomain`]s: `String`,
/// `Box<str>`, `Cow<str>` or a newtype around one of them.
pub trait MapTarget {
    type Key: DeserializeOwned + TextDomain;
    type Value: DeserializeOwned + TextDomain;

    fn insert_entry(&mut self, key: Self::Key, value: Self::Value);
}

impl<K, V, S> MapTarget for HashMap<K, V, S>
where
    K: DeserializeOwned + TextDomain + Eq + Hash,
    V: DeserializeOwned + TextDomain,
    S: BuildHasher,
{
    type Key = K;
    type Value = V;

    fn insert_entry(&mut self, key: K, value: V) {
        self.insert(key, value);
    }
}

impl<K, V> MapTarget for BTreeMap<K, V>
where
    K: DeserializeOwned + TextDomain + Ord,
    V: DeserializeOwned + TextDomain,
{
    type Key = K;
    type Value = V;

    fn insert_entry(&mut self, key: K, value: V) {
        self.insert(key, value);
    }
}

impl<K, V, S> MapTarget for IndexMap<K, V, S>
where
    K: DeserializeOwned + TextDomain + Eq + Hash,
    V: DeserializeOwned + TextDomain,
    S: BuildHasher,
{
    type Key = K;
    type Value = V;

    fn insert_entry(&mut self, key: K, value: V) {
        self.insert(key, value);
    }
}

impl MapTarget for LtsvMap {
    type Key = String;
    type Value = String;

    fn insert_entry(&mut self, key: String, value: String) {
        self.insert(key, value);
    }
}

/// Inserts every label of `map` into `target`.
///
/// # Errors
///
/// Returns [`Error::TypeMismatch`] if a key or value does not deserialize
/// from a string, which only happens for a [`TextDomain`] newtype that does
/// not deserialize as one. `target` is not modified in that case.
pub fn decode_map<M: MapTarget>(map: &LtsvMap, target: &mut M) -> Result<()> {
    let mut entries = Vec::with_capacity(map.len());
    for (key, value) in map.iter() {
        let key = <M::Key as Deserialize>::deserialize(TextDeserializer::new(key))
            .map_err(|_| Error::type_mismatch(NOT_TEXT_MAP))?;
        let value = <M::Value as Deserialize>::deserialize(TextDeserializer::new(value))
            .map_err(|_| Error::type_mismatch(NOT_TEXT_MAP))?;
        entries.push((key, value));
    }
    for (key, value) in entries {
        target.insert_entry(key, value);
    }
    Ok(())
}

/// Deserializer over a single label or value.
///
/// It only ever produces a string; anything that cannot be built from one
/// fails.
pub struct TextDeserializer<'a> {
    input: &'a str,
}

impl<'a> TextDeserializer<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        TextDeserializer { input }
    }
}

impl<'de, 'a> de::Deserializer<'de> for TextDeserializer<'a> {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_str(self.input)
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }
}
