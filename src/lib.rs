//! # serde_ltsv
//!
//! Marshal and unmarshal LTSV (Labeled Tab-separated Values) records.
//!
//! ## What is LTSV?
//!
//! LTSV is a line format of `label:value` fields separated by tabs, popular for
//! access logs because every value carries its own label:
//!
//! ```text
//! host:127.0.0.1	status:200	size:512	reqtime:0.004
//! ```
//!
//! ## Key Features
//!
//! - **Typed records**: decode into structs with string, integer, float,
//!   optional and custom fields, and encode them back
//! - **Dynamic maps**: decode into or encode from any string-to-string map
//! - **Per-field errors**: one bad field never hides or blocks the others
//! - **Plan caching**: field resolution happens once per type, shared across
//!   threads
//! - **No Unsafe Code**: Written entirely in safe Rust
//!
//! ## Quick Start
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! serde_ltsv = "0.1"
//! ```
//!
//! ### Records
//!
//! ```rust
//! use serde_ltsv::{impl_record, from_str, to_string};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Access {
//!     host: String,
//!     status: u16,
//!     size: u64,
//!     req_time: Option<f64>,
//! }
//! impl_record!(Access { host, status, size, req_time => "reqtime" });
//!
//! let line = "host:127.0.0.1\tstatus:200\tsize:512\treqtime:0.004";
//! let access: Access = from_str(line).unwrap();
//! assert_eq!(access.status, 200);
//! assert_eq!(access.req_time, Some(0.004));
//!
//! assert_eq!(to_string(&access).unwrap(), line);
//! ```
//!
//! ### Maps
//!
//! ```rust
//! use serde_ltsv::{map_to_string, unmarshal_map};
//! use std::collections::BTreeMap;
//!
//! let mut map: BTreeMap<String, String> = BTreeMap::new();
//! unmarshal_map(b"hoge:fuga\tpiyo:piyo", &mut map).unwrap();
//! assert_eq!(map["hoge"], "fuga");
//!
//! assert_eq!(map_to_string(&map).unwrap(), "hoge:fuga\tpiyo:piyo");
//! ```
//!
//! ### Field errors
//!
//! ```rust
//! use serde_ltsv::{impl_record, unmarshal_str};
//!
//! #[derive(Default)]
//! struct Profile {
//!     user: String,
//!     age: u8,
//!     height: Option<f64>,
//! }
//! impl_record!(Profile { user, age, height });
//!
//! let mut profile = Profile::default();
//! let err = unmarshal_str("user:songmu\tage:-\theight:-", &mut profile).unwrap_err();
//!
//! assert_eq!(profile.user, "songmu");
//! let errors = err.fields().unwrap();
//! assert_eq!(errors.names().collect::<Vec<_>>(), vec!["age", "height"]);
//! ```
//!
//! ## Format Description
//!
//! See the [`format`] module for the exact reading and writing rules.

pub mod cache;
pub mod de;
pub mod error;
pub mod field;
pub mod format;
pub mod macros;
pub mod map;
pub mod resolve;
pub mod ser;
pub mod text;

pub use cache::PlanCache;
pub use de::{decode_map, decode_record, decode_record_with, DecodePlan, MapTarget, TextDeserializer};
pub use error::{BoxError, Error, FieldError, FieldErrors, Result};
pub use field::{FieldDescriptor, FieldRef, FieldType, Kind, Record, Scalar};
pub use map::{LtsvMap, TextDomain, TextMap, FIELD_DELIMITER, KEY_DELIMITER};
pub use resolve::{bindings, FieldBinding};
pub use ser::{encode_map, EncodePlan, Encoder};
pub use text::{FromText, ToText};

use std::io;

/// Unmarshal one LTSV record into `target`.
///
/// Labels missing from `data` leave the matching fields untouched. Fields
/// that fail to convert keep their value and are reported together.
///
/// # Examples
///
/// ```rust
/// use serde_ltsv::{impl_record, unmarshal};
///
/// #[derive(Default)]
/// struct Hit { path: String, status: u16 }
/// impl_record!(Hit { path, status });
///
/// let mut hit = Hit { path: String::new(), status: 404 };
/// unmarshal(b"path:/index.html", &mut hit).unwrap();
/// assert_eq!(hit.path, "/index.html");
/// assert_eq!(hit.status, 404);
/// ```
///
/// # Errors
///
/// Returns [`Error::Malformed`] if `data` is not LTSV, in which case `target`
/// is not modified, or [`Error::Fields`] if any field failed.
pub fn unmarshal<R: Record>(data: &[u8], target: &mut R) -> Result<()> {
    let map = LtsvMap::parse_bytes(data)?;
    decode_record(&map, target)
}

/// Unmarshal one LTSV record from a string into `target`.
///
/// # Errors
///
/// Same as [`unmarshal`].
pub fn unmarshal_str<R: Record>(s: &str, target: &mut R) -> Result<()> {
    let map = LtsvMap::parse(s)?;
    decode_record(&map, target)
}

/// Unmarshal one LTSV record into a map, inserting every label.
///
/// # Examples
///
/// ```rust
/// use serde_ltsv::unmarshal_map;
/// use std::collections::HashMap;
///
/// let mut map: HashMap<String, String> = HashMap::new();
/// unmarshal_map(b"hoge: fuga\tpiyo: piyo", &mut map).unwrap();
/// assert_eq!(map.len(), 2);
/// assert_eq!(map["piyo"], "piyo");
/// ```
///
/// # Errors
///
/// Returns [`Error::Malformed`] if `data` is not LTSV, or
/// [`Error::TypeMismatch`] if the map's keys or values cannot hold strings.
pub fn unmarshal_map<M: MapTarget>(data: &[u8], target: &mut M) -> Result<()> {
    let map = LtsvMap::parse_bytes(data)?;
    decode_map(&map, target)
}

/// Build a record from a string of LTSV text, starting from `R::default()`.
///
/// # Examples
///
/// ```rust
/// use serde_ltsv::{impl_record, from_str};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Point { x: i32, y: i32 }
/// impl_record!(Point { x, y });
///
/// let point: Point = from_str("x:1\ty:2").unwrap();
/// assert_eq!(point, Point { x: 1, y: 2 });
/// ```
///
/// # Errors
///
/// Returns an error if the input is not LTSV or any field fails to convert.
pub fn from_str<R: Record + Default>(s: &str) -> Result<R> {
    let mut record = R::default();
    unmarshal_str(s, &mut record)?;
    Ok(record)
}

/// Build a record from bytes of LTSV text.
///
/// # Errors
///
/// Returns an error if the bytes are not UTF-8 LTSV or any field fails to
/// convert.
pub fn from_slice<R: Record + Default>(v: &[u8]) -> Result<R> {
    let mut record = R::default();
    unmarshal(v, &mut record)?;
    Ok(record)
}

/// Build a record from an I/O stream holding one LTSV record.
///
/// A single trailing line break is ignored.
///
/// # Examples
///
/// ```rust
/// use serde_ltsv::{impl_record, from_reader};
/// use std::io::Cursor;
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Point { x: i32, y: i32 }
/// impl_record!(Point { x, y });
///
/// let point: Point = from_reader(Cursor::new(b"x:1\ty:2\n")).unwrap();
/// assert_eq!(point, Point { x: 1, y: 2 });
/// ```
///
/// # Errors
///
/// Returns [`Error::Io`] if reading fails, otherwise the same errors as
/// [`from_slice`]. Input that is not UTF-8 is [`Error::Malformed`].
pub fn from_reader<Rd, R>(mut reader: Rd) -> Result<R>
where
    Rd: io::Read,
    R: Record + Default,
{
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| Error::io(&e.to_string()))?;
    let line = bytes
        .strip_suffix(b"\n")
        .map(|b| b.strip_suffix(b"\r").unwrap_or(b))
        .unwrap_or(bytes.as_slice());
    from_slice(line)
}

/// Marshal a record to LTSV bytes.
///
/// # Errors
///
/// Returns [`Error::Fields`] if any field failed, and the text is dropped.
/// Use [`marshal`] to keep the fields that did succeed.
pub fn to_vec<R: Record>(value: &R) -> Result<Vec<u8>> {
    let (out, result) = marshal(value);
    result.map(|()| out)
}

/// Marshal a record, returning the bytes written together with the outcome.
///
/// Fields that fail are left out of the bytes and reported in the result, so
/// a line with one bad field still carries every other field.
///
/// # Examples
///
/// ```rust
/// use serde_ltsv::{impl_record, marshal, FieldType};
///
/// struct Opaque;
/// impl FieldType for Opaque {}
///
/// struct Line { status: u16, extra: Opaque }
/// impl_record!(Line { status, extra });
///
/// let (bytes, result) = marshal(&Line { status: 200, extra: Opaque });
/// assert_eq!(bytes, b"status:200");
/// assert!(result.unwrap_err().fields().unwrap().of_field("extra").is_some());
/// ```
pub fn marshal<R: Record>(value: &R) -> (Vec<u8>, Result<()>) {
    let mut out = Vec::new();
    let result = Encoder::new().encode(value, &mut out);
    (out, result)
}

/// Marshal a record to an LTSV string.
///
/// # Examples
///
/// ```rust
/// use serde_ltsv::{impl_record, to_string};
///
/// struct Point { x: i32, y: i32, label: Option<String> }
/// impl_record!(Point { x, y, label });
///
/// let point = Point { x: 1, y: -2, label: None };
/// assert_eq!(to_string(&point).unwrap(), "x:1\ty:-2");
/// ```
///
/// # Errors
///
/// Returns [`Error::Fields`] if any field failed, or [`Error::Custom`] if a
/// custom field wrote bytes that are not UTF-8. The partial line is dropped
/// on error; see [`marshal`] to keep it.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string<R: Record>(value: &R) -> Result<String> {
    into_string(to_vec(value)?)
}

/// Marshal a record to a writer.
///
/// Fields that succeed are written even when others fail; the failures are
/// returned afterwards.
///
/// # Examples
///
/// ```rust
/// use serde_ltsv::{impl_record, to_writer};
///
/// struct Point { x: i32, y: i32 }
/// impl_record!(Point { x, y });
///
/// let mut buffer = Vec::new();
/// to_writer(&mut buffer, &Point { x: 1, y: 2 }).unwrap();
/// assert_eq!(buffer, b"x:1\ty:2");
/// ```
///
/// # Errors
///
/// Returns [`Error::Io`] if writing fails, otherwise [`Error::Fields`] if any
/// field failed.
pub fn to_writer<W, R>(mut writer: W, value: &R) -> Result<()>
where
    W: io::Write,
    R: Record,
{
    let mut out = Vec::new();
    let result = Encoder::new().encode(value, &mut out);
    writer
        .write_all(&out)
        .map_err(|e| Error::io(&e.to_string()))?;
    result
}

/// Marshal a string-to-string map to an LTSV string.
///
/// Entries are written in the map's iteration order.
///
/// # Examples
///
/// ```rust
/// use serde_ltsv::map_to_string;
/// use indexmap::IndexMap;
///
/// let mut map = IndexMap::new();
/// map.insert("piyo", "piyo");
/// map.insert("hoge", "fuga");
/// assert_eq!(map_to_string(&map).unwrap(), "piyo:piyo\thoge:fuga");
/// ```
///
/// # Errors
///
/// Returns [`Error::TypeMismatch`] if a key or value does not serialize as a
/// string.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn map_to_string<M>(map: &M) -> Result<String>
where
    M: ?Sized + TextMap,
{
    let mut out = Vec::new();
    encode_map(map, &mut out)?;
    into_string(out)
}

/// Marshal a string-to-string map to a writer.
///
/// # Errors
///
/// Returns [`Error::TypeMismatch`] if a key or value does not serialize as a
/// string, in which case nothing is written, or [`Error::Io`] if writing
/// fails.
pub fn map_to_writer<W, M>(mut writer: W, map: &M) -> Result<()>
where
    W: io::Write,
    M: ?Sized + TextMap,
{
    let mut out = Vec::new();
    encode_map(map, &mut out)?;
    writer
        .write_all(&out)
        .map_err(|e| Error::io(&e.to_string()))?;
    Ok(())
}

fn into_string(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| Error::custom(e.to_string()))
}
