//! Ordered LTSV record map.
//!
//! [`LtsvMap`] is the tokenized form of one LTSV line: a wrapper around
//! [`IndexMap`] that keeps labels in the order they first appeared. It is what
//! both the record decoder and the map decoder read from.
//!
//! ## Parsing rules
//!
//! - Fields are separated by a single tab.
//! - Each field is trimmed, then split at its first colon into label and
//!   value, and both halves are trimmed again. Values may contain colons.
//! - A field without a colon (including an empty field) makes the whole line
//!   malformed.
//! - A label that appears twice keeps its first position and its last value.
//!
//! ## Examples
//!
//! ```rust
//! use serde_ltsv::LtsvMap;
//!
//! let map = LtsvMap::parse("host:127.0.0.1\tua:curl/8.0\tua:wget").unwrap();
//! assert_eq!(map.get("host"), Some("127.0.0.1"));
//! assert_eq!(map.get("ua"), Some("wget"));
//!
//! let labels: Vec<_> = map.keys().collect();
//! assert_eq!(labels, vec!["host", "ua"]);
//! ```

use crate::{Error, Result};
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

/// Separator between two fields of a record.
pub const FIELD_DELIMITER: char = '\t';

/// Separator between a label and its value.
pub const KEY_DELIMITER: char = ':';

/// A key or value type that holds plain text.
///
/// Map targets and map sources are only accepted when both their key and
/// value types implement this trait, so a map of numbers, addresses or
/// characters is rejected when the program is compiled rather than when a
/// particular value happens not to parse. A newtype around `String` may
/// implement it as long as it serializes and deserializes as a string.
///
/// ```compile_fail
/// use serde_ltsv::unmarshal_map;
/// use std::collections::HashMap;
/// use std::net::IpAddr;
///
/// let mut map: HashMap<String, IpAddr> = HashMap::new();
/// unmarshal_map(b"a:10.0.0.1", &mut map).unwrap();
/// ```
///
/// ```compile_fail
/// use serde_ltsv::map_to_string;
/// use std::collections::HashMap;
///
/// let mut map: HashMap<String, char> = HashMap::new();
/// map.insert("a".to_string(), 'x');
/// map_to_string(&map).unwrap();
/// ```
pub trait TextDomain {}

impl TextDomain for str {}
impl TextDomain for String {}
impl TextDomain for Box<str> {}
impl TextDomain for Cow<'_, str> {}
impl<T: ?Sized + TextDomain> TextDomain for &T {}

/// A map whose entries can be written as LTSV.
pub trait TextMap: Serialize {}

impl<K, V, S> TextMap for HashMap<K, V, S>
where
    K: TextDomain + Serialize + Eq + Hash,
    V: TextDomain + Serialize,
    S: BuildHasher,
{
}

impl<K, V> TextMap for BTreeMap<K, V>
where
    K: TextDomain + Serialize + Ord,
    V: TextDomain + Serialize,
{
}

impl<K, V, S> TextMap for IndexMap<K, V, S>
where
    K: TextDomain + Serialize + Eq + Hash,
    V: TextDomain + Serialize,
    S: BuildHasher,
{
}

impl TextMap for LtsvMap {}

impl<M: ?Sized + TextMap> TextMap for &M {}

/// An ordered map of LTSV labels to values.
///
/// # Examples
///
/// ```rust
/// use serde_ltsv::LtsvMap;
///
/// let mut map = LtsvMap::new();
/// map.insert("first".to_string(), "1".to_string());
/// map.insert("second".to_string(), "2".to_string());
///
/// // Iteration maintains insertion order
/// let keys: Vec<_> = map.keys().collect();
/// assert_eq!(keys, vec!["first", "second"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LtsvMap(IndexMap<String, String>);

impl LtsvMap {
    /// Creates an empty `LtsvMap`.
    #[must_use]
    pub fn new() -> Self {
        LtsvMap(IndexMap::new())
    }

    /// Creates an empty `LtsvMap` with the specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        LtsvMap(IndexMap::with_capacity(capacity))
    }

    /// Splits one LTSV line into its labels and values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] carrying the whole input if any field has
    /// no colon. Empty input is malformed as well.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_ltsv::LtsvMap;
    ///
    /// let map = LtsvMap::parse("hoge: fuga\tpiyo: piyo").unwrap();
    /// assert_eq!(map.get("hoge"), Some("fuga"));
    ///
    /// let err = LtsvMap::parse("hoge").unwrap_err();
    /// assert_eq!(err.to_string(), "not a ltsv: hoge");
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let mut map = LtsvMap::new();
        for field in input.split(FIELD_DELIMITER) {
            let (key, value) = field
                .trim()
                .split_once(KEY_DELIMITER)
                .ok_or_else(|| Error::malformed(input))?;
            map.insert(key.trim().to_string(), value.trim().to_string());
        }
        Ok(map)
    }

    /// Same as [`LtsvMap::parse`] for raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the bytes are not UTF-8 or not LTSV.
    pub fn parse_bytes(input: &[u8]) -> Result<Self> {
        let s = std::str::from_utf8(input)
            .map_err(|_| Error::malformed(&String::from_utf8_lossy(input)))?;
        Self::parse(s)
    }

    /// Inserts a label and value.
    ///
    /// If the label was already present its value is replaced, its position is
    /// kept, and the old value is returned.
    pub fn insert(&mut self, key: String, value: String) -> Option<String> {
        self.0.insert(key, value)
    }

    /// Returns the value for a label.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over the labels, in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns an iterator over the label/value pairs, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Serialize for LtsvMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl From<HashMap<String, String>> for LtsvMap {
    fn from(map: HashMap<String, String>) -> Self {
        LtsvMap(map.into_iter().collect())
    }
}

impl From<LtsvMap> for HashMap<String, String> {
    fn from(map: LtsvMap) -> Self {
        map.0.into_iter().collect()
    }
}

impl IntoIterator for LtsvMap {
    type Item = (String, String);
    type IntoIter = indexmap::map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(String, String)> for LtsvMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        LtsvMap(IndexMap::from_iter(iter))
    }
}
