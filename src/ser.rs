//! LTSV marshaling.
//!
//! Records are written through a cached [`EncodePlan`]: the first time a type
//! is marshaled its fields are resolved once, and every later call reuses the
//! plan from the [`PlanCache`].
//!
//! Maps are written through serde: any [`TextMap`] can be marshaled, in the
//! map's own iteration order.
//!
//! ## Usage
//!
//! ```rust
//! use serde_ltsv::{impl_record, to_string};
//!
//! struct Profile {
//!     user: String,
//!     age: u8,
//!     height: f64,
//!     weight: f32,
//!     memo: String,
//! }
//! impl_record!(Profile { user, age, height, weight, memo => "-" });
//!
//! let profile = Profile {
//!     user: "songmu".to_string(),
//!     age: 36,
//!     height: 169.1,
//!     weight: 66.6,
//!     memo: "songmu.jp".to_string(),
//! };
//! assert_eq!(
//!     to_string(&profile).unwrap(),
//!     "user:songmu\tage:36\theight:169.1\tweight:66.6"
//! );
//! ```
//!
//! ## Partial output
//!
//! A field that fails to marshal is left out and reported; the others are
//! still written. [`Encoder::encode`] appends into a caller-owned buffer so
//! the partial line is available next to the error.

use crate::cache::PlanCache;
use crate::error::{FieldError, FieldErrors};
use crate::field::{FieldRef, FieldType, Kind, Record};
use crate::map::{TextMap, FIELD_DELIMITER, KEY_DELIMITER};
use crate::resolve::resolve_key;
use crate::{Error, Result};
use serde::ser::{self, Impossible, Serialize};
use std::sync::Arc;

const NOT_TEXT_MAP: &str = "ltsv: not a map of string to string";
const NOT_RECORD_OR_MAP: &str = "ltsv: not a record or map";

type WriteFn<R> = Box<dyn Fn(&R, &mut Vec<u8>) -> std::result::Result<bool, FieldError> + Send + Sync>;

struct PlanStep<R> {
    name: &'static str,
    /// Label followed by the key delimiter.
    prefix: Vec<u8>,
    kind: Kind,
    write: WriteFn<R>,
}

/// The resolved, ordered list of writers for one record type.
///
/// Excluded fields have no step at all.
pub struct EncodePlan<R> {
    steps: Vec<PlanStep<R>>,
}

impl<R: Record> EncodePlan<R> {
    /// Resolves `R`'s fields into writers.
    #[must_use]
    pub fn build() -> Self {
        let steps = R::fields()
            .into_iter()
            .filter_map(|field| {
                let key = resolve_key(field.name, field.tag)?;
                let mut prefix = key.into_bytes();
                prefix.push(KEY_DELIMITER as u8);
                Some(PlanStep {
                    name: field.name,
                    prefix,
                    kind: field.kind,
                    write: field.encode,
                })
            })
            .collect();
        EncodePlan { steps }
    }

    /// Number of fields this plan writes at most.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// `(field name, kind)` for every step, in output order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, Kind)> + '_ {
        self.steps.iter().map(|step| (step.name, step.kind))
    }

    /// Appends `record` to `out` and returns the fields that failed.
    pub fn write(&self, record: &R, out: &mut Vec<u8>) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let mut emitted = 0usize;
        for step in &self.steps {
            let mark = out.len();
            if emitted > 0 {
                out.push(FIELD_DELIMITER as u8);
            }
            out.extend_from_slice(&step.prefix);
            match (step.write)(record, out) {
                Ok(true) => emitted += 1,
                Ok(false) => out.truncate(mark),
                Err(err) => {
                    out.truncate(mark);
                    errors.insert(step.name, err);
                }
            }
        }
        errors
    }
}

/// Writes the text form of `field` to `out`.
///
/// Returns `Ok(false)` without writing when a nullable field is empty.
pub(crate) fn encode_field<F: FieldType>(
    field: &F,
    out: &mut Vec<u8>,
) -> std::result::Result<bool, FieldError> {
    match field.view() {
        FieldRef::Absent => return Ok(false),
        FieldRef::Text(s) => out.extend_from_slice(s.as_bytes()),
        FieldRef::Signed(v) => out.extend_from_slice(v.to_string().as_bytes()),
        FieldRef::Unsigned(v) => out.extend_from_slice(v.to_string().as_bytes()),
        FieldRef::Float32(v) => out.extend_from_slice(v.to_string().as_bytes()),
        FieldRef::Float64(v) => out.extend_from_slice(v.to_string().as_bytes()),
        FieldRef::Custom => match field.encode_text() {
            Some(Ok(bytes)) => out.extend_from_slice(&bytes),
            Some(Err(err)) => return Err(FieldError::from(err)),
            None => {
                return Err(FieldError::Marshal {
                    type_name: F::type_name(),
                })
            }
        },
    }
    Ok(true)
}

/// Marshals records and maps.
///
/// An `Encoder` is a cheap handle on a [`PlanCache`]. [`Encoder::new`] uses the
/// process-wide cache; [`Encoder::with_cache`] takes any other, which keeps
/// tests and embedders isolated from each other.
///
/// # Examples
///
/// ```rust
/// use serde_ltsv::{impl_record, Encoder, PlanCache};
/// use std::sync::Arc;
///
/// struct Hit { path: String, status: u16 }
/// impl_record!(Hit { path, status });
///
/// let cache = Arc::new(PlanCache::new());
/// let encoder = Encoder::with_cache(Arc::clone(&cache));
///
/// let mut out = Vec::new();
/// encoder.encode(&Hit { path: "/".into(), status: 200 }, &mut out).unwrap();
/// assert_eq!(out, b"path:/\tstatus:200");
/// assert!(cache.contains::<Hit>());
/// ```
#[derive(Clone)]
pub struct Encoder {
    cache: Arc<PlanCache>,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    /// Creates an encoder backed by [`PlanCache::global`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_cache(Arc::clone(PlanCache::global()))
    }

    /// Creates an encoder backed by `cache`.
    #[must_use]
    pub fn with_cache(cache: Arc<PlanCache>) -> Self {
        Encoder { cache }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<PlanCache> {
        &self.cache
    }

    /// Appends the LTSV form of `record` to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fields`] if any field failed. Every other field has
    /// still been written to `out`.
    pub fn encode<R: Record>(&self, record: &R, out: &mut Vec<u8>) -> Result<()> {
        let plan = self.cache.get_or_build::<R>();
        plan.write(record, out).into_result()
    }

    /// Appends the LTSV form of a string-to-string map to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if a key or value does not serialize as
    /// a string. Nothing is appended in that case.
    pub fn encode_map<M>(&self, map: &M, out: &mut Vec<u8>) -> Result<()>
    where
        M: ?Sized + TextMap,
    {
        encode_map(map, out)
    }
}

/// Appends the LTSV form of a string-to-string map to `out`.
///
/// # Errors
///
/// Returns [`Error::TypeMismatch`] if a key or value does not serialize as a
/// string. Only [`TextMap`] sources are accepted, so this can only happen for
/// a [`TextDomain`](crate::TextDomain) newtype that serializes some other way.
pub fn encode_map<M>(map: &M, out: &mut Vec<u8>) -> Result<()>
where
    M: ?Sized + TextMap,
{
    let mut buf = Vec::new();
    map.serialize(MapSerializer { output: &mut buf })?;
    out.extend_from_slice(&buf);
    Ok(())
}

/// Serializer accepting a single map of strings.
pub struct MapSerializer<'a> {
    output: &'a mut Vec<u8>,
}

fn not_a_map() -> Error {
    Error::type_mismatch(NOT_RECORD_OR_MAP)
}

fn not_text() -> Error {
    Error::type_mismatch(NOT_TEXT_MAP)
}

impl<'a> ser::Serializer for MapSerializer<'a> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = Impossible<(), Error>;
    type SerializeTuple = Impossible<(), Error>;
    type SerializeTupleStruct = Impossible<(), Error>;
    type SerializeTupleVariant = Impossible<(), Error>;
    type SerializeMap = EntrySerializer<'a>;
    type SerializeStruct = Impossible<(), Error>;
    type SerializeStructVariant = Impossible<(), Error>;

    fn serialize_bool(self, _v: bool) -> Result<()> {
        Err(not_a_map())
    }

    fn serialize_i8(self, _v: i8) -> Result<()> {
        Err(not_a_map())
    }

    fn serialize_i16(self, _v: i16) -> Result<()> {
        Err(not_a_map())
    }

    fn serialize_i32(self, _v: i32) -> Result<()> {
        Err(not_a_map())
    }

    fn serialize_i64(self, _v: i64) -> Result<()> {
        Err(not_a_map())
    }

    fn serialize_u8(self, _v: u8) -> Result<()> {
        Err(not_a_map())
    }

    fn serialize_u16(self, _v: u16) -> Result<()> {
        Err(not_a_map())
    }

    fn serialize_u32(self, _v: u32) -> Result<()> {
        Err(not_a_map())
    }

    fn serialize_u64(self, _v: u64) -> Result<()> {
        Err(not_a_map())
    }

    fn serialize_f32(self, _v: f32) -> Result<()> {
        Err(not_a_map())
    }

    fn serialize_f64(self, _v: f64) -> Result<()> {
        Err(not_a_map())
    }

    fn serialize_char(self, _v: char) -> Result<()> {
        Err(not_a_map())
    }

    fn serialize_str(self, _v: &str) -> Result<()> {
        Err(not_a_map())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<()> {
        Err(not_a_map())
    }

    fn serialize_none(self) -> Result<()> {
        Err(not_a_map())
    }

    fn serialize_some<T>(self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        Err(not_a_map())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        Err(not_a_map())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<()> {
        Err(not_a_map())
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        Err(not_a_map())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(not_a_map())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(not_a_map())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(not_a_map())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(not_a_map())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Ok(EntrySerializer {
            output: self.output,
            first: true,
        })
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(not_a_map())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(not_a_map())
    }
}

pub struct EntrySerializer<'a> {
    output: &'a mut Vec<u8>,
    first: bool,
}

impl<'a> ser::SerializeMap for EntrySerializer<'a> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let key = key.serialize(TextSerializer)?;
        if !self.first {
            self.output.push(FIELD_DELIMITER as u8);
        }
        self.first = false;
        self.output.extend_from_slice(key.as_bytes());
        self.output.push(KEY_DELIMITER as u8);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let value = value.serialize(TextSerializer)?;
        self.output.extend_from_slice(value.as_bytes());
        Ok(())
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

/// Serializer that only accepts strings.
pub struct TextSerializer;

impl ser::Serializer for TextSerializer {
    type Ok = String;
    type Error = Error;

    type SerializeSeq = Impossible<String, Error>;
    type SerializeTuple = Impossible<String, Error>;
    type SerializeTupleStruct = Impossible<String, Error>;
    type SerializeTupleVariant = Impossible<String, Error>;
    type SerializeMap = Impossible<String, Error>;
    type SerializeStruct = Impossible<String, Error>;
    type SerializeStructVariant = Impossible<String, Error>;

    fn serialize_str(self, v: &str) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_bool(self, _v: bool) -> Result<String> {
        Err(not_text())
    }

    fn serialize_i8(self, _v: i8) -> Result<String> {
        Err(not_text())
    }

    fn serialize_i16(self, _v: i16) -> Result<String> {
        Err(not_text())
    }

    fn serialize_i32(self, _v: i32) -> Result<String> {
        Err(not_text())
    }

    fn serialize_i64(self, _v: i64) -> Result<String> {
        Err(not_text())
    }

    fn serialize_u8(self, _v: u8) -> Result<String> {
        Err(not_text())
    }

    fn serialize_u16(self, _v: u16) -> Result<String> {
        Err(not_text())
    }

    fn serialize_u32(self, _v: u32) -> Result<String> {
        Err(not_text())
    }

    fn serialize_u64(self, _v: u64) -> Result<String> {
        Err(not_text())
    }

    fn serialize_f32(self, _v: f32) -> Result<String> {
        Err(not_text())
    }

    fn serialize_f64(self, _v: f64) -> Result<String> {
        Err(not_text())
    }

    fn serialize_char(self, _v: char) -> Result<String> {
        Err(not_text())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<String> {
        Err(not_text())
    }

    fn serialize_none(self) -> Result<String> {
        Err(not_text())
    }

    fn serialize_some<T>(self, _value: &T) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        Err(not_text())
    }

    fn serialize_unit(self) -> Result<String> {
        Err(not_text())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<String> {
        Err(not_text())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<String> {
        Err(not_text())
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        Err(not_text())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(not_text())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(not_text())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(not_text())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(not_text())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(not_text())
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(not_text())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(not_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};

    struct Profile {
        user: String,
        age: u8,
        height: Option<f64>,
        weight: f32,
        memo: String,
    }
    crate::impl_record!(Profile {
        user => "user",
        age => "age",
        height => "height",
        weight,
        memo => "-",
    });

    fn profile() -> Profile {
        Profile {
            user: "songmu".to_string(),
            age: 36,
            height: Some(169.1),
            weight: 66.6,
            memo: "songmu.jp".to_string(),
        }
    }

    fn encode<R: Record>(record: &R) -> (String, Result<()>) {
        let encoder = Encoder::with_cache(Arc::new(PlanCache::new()));
        let mut out = Vec::new();
        let result = encoder.encode(record, &mut out);
        (String::from_utf8(out).unwrap(), result)
    }

    #[test]
    fn test_encode_record() {
        let (text, result) = encode(&profile());
        assert!(result.is_ok());
        assert_eq!(text, "user:songmu\tage:36\theight:169.1\tweight:66.6");
    }

    #[test]
    fn test_absent_optional_leaves_no_delimiter() {
        let mut p = profile();
        p.height = None;
        let (text, _) = encode(&p);
        assert_eq!(text, "user:songmu\tage:36\tweight:66.6");
    }

    #[test]
    fn test_leading_absent_field_leaves_no_delimiter() {
        struct Sparse {
            a: Option<u8>,
            b: Option<u8>,
            c: u8,
        }
        crate::impl_record!(Sparse { a, b, c });

        let (text, _) = encode(&Sparse {
            a: None,
            b: None,
            c: 1,
        });
        assert_eq!(text, "c:1");
    }

    #[test]
    fn test_plan_skips_excluded_fields() {
        let plan = EncodePlan::<Profile>::build();
        assert_eq!(plan.len(), 4);
        let names: Vec<_> = plan.fields().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["user", "age", "height", "weight"]);
    }

    #[test]
    fn test_unsupported_field_is_reported_and_skipped() {
        struct Opaque;
        impl FieldType for Opaque {
            fn type_name() -> &'static str {
                "Opaque"
            }
        }

        struct Mixed {
            first: u8,
            blob: Opaque,
            last: String,
        }
        crate::impl_record!(Mixed { first, blob, last });

        let (text, result) = encode(&Mixed {
            first: 1,
            blob: Opaque,
            last: "x".to_string(),
        });
        assert_eq!(text, "first:1\tlast:x");
        let err = result.unwrap_err();
        assert_eq!(
            err.fields().unwrap().of_field("blob").unwrap().to_string(),
            "ltsv: failed to marshal type: Opaque"
        );
    }

    #[test]
    fn test_float_formatting_is_shortest() {
        let mut out = Vec::new();
        encode_field(&0.1f32, &mut out).unwrap();
        assert_eq!(out, b"0.1");

        let mut out = Vec::new();
        encode_field(&1e21f64, &mut out).unwrap();
        assert_eq!(out, b"1000000000000000000000");
    }

    #[test]
    fn test_encode_map_either_order() {
        let mut data = HashMap::new();
        data.insert("hoge".to_string(), "fuga".to_string());
        data.insert("piyo".to_string(), "piyo".to_string());

        let mut out = Vec::new();
        encode_map(&data, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text == "hoge:fuga\tpiyo:piyo" || text == "piyo:piyo\thoge:fuga");
    }

    #[derive(serde::Serialize)]
    struct Count(u32);
    impl crate::TextDomain for Count {}

    #[test]
    fn test_encode_map_rejects_newtype_over_number() {
        let mut data = BTreeMap::new();
        data.insert("a".to_string(), Count(1));

        let mut out = b"keep".to_vec();
        let err = encode_map(&data, &mut out).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)));
        assert_eq!(err.to_string(), "ltsv: not a map of string to string");
        assert_eq!(out, b"keep");
    }

    #[test]
    fn test_encode_map_borrowed_text() {
        let mut data = BTreeMap::new();
        data.insert("b", std::borrow::Cow::Borrowed("2"));
        data.insert("a", std::borrow::Cow::Owned("1".to_string()));

        let mut out = Vec::new();
        encode_map(&data, &mut out).unwrap();
        assert_eq!(out, b"a:1\tb:2");
    }
}
