//! Text capabilities for custom field types.
//!
//! A type that is not a string or a number can still be a record field if it
//! knows how to read itself from text ([`FromText`]) and how to write itself
//! as text ([`ToText`]). [`text_field!`](crate::text_field) then wires those
//! capabilities into [`FieldType`](crate::FieldType).
//!
//! A type may have only one of the two. Unmarshaling a field without
//! [`FromText`] reports an unmarshal error; marshaling one without [`ToText`]
//! reports a marshal error.
//!
//! ## Built-in capabilities
//!
//! | Type | Text form |
//! |------|-----------|
//! | `IpAddr`, `Ipv4Addr`, `Ipv6Addr` | standard notation |
//! | `chrono::DateTime<Utc>`, `chrono::DateTime<FixedOffset>` | RFC 3339 |
//! | `num_bigint::BigInt`, `num_bigint::BigUint` | decimal |
//!
//! ## Example
//!
//! ```rust
//! use serde_ltsv::{impl_record, text_field, to_string, unmarshal_str, BoxError, FromText, ToText};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Level(u8);
//!
//! impl FromText for Level {
//!     fn from_text(text: &[u8]) -> Result<Self, BoxError> {
//!         match text {
//!             b"info" => Ok(Level(1)),
//!             b"warn" => Ok(Level(2)),
//!             _ => Err("unknown level".into()),
//!         }
//!     }
//! }
//!
//! impl ToText for Level {
//!     fn to_text(&self) -> Result<Vec<u8>, BoxError> {
//!         match self.0 {
//!             1 => Ok(b"info".to_vec()),
//!             2 => Ok(b"warn".to_vec()),
//!             _ => Err("unknown level".into()),
//!         }
//!     }
//! }
//!
//! text_field!(Level);
//!
//! #[derive(Default)]
//! struct Event { level: Level }
//! impl_record!(Event { level });
//!
//! let mut event = Event::default();
//! unmarshal_str("level:warn", &mut event).unwrap();
//! assert_eq!(event.level, Level(2));
//! assert_eq!(to_string(&event).unwrap(), "level:warn");
//! ```

use crate::error::BoxError;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use num_bigint::{BigInt, BigUint};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Builds a value from the raw bytes of an LTSV value.
pub trait FromText: Sized {
    /// # Errors
    ///
    /// Any error is reported for the field and the field keeps its value.
    fn from_text(text: &[u8]) -> Result<Self, BoxError>;
}

/// Renders a value as the raw bytes of an LTSV value.
pub trait ToText {
    /// # Errors
    ///
    /// Any error is reported for the field and the field is left out.
    fn to_text(&self) -> Result<Vec<u8>, BoxError>;
}

/// Implements [`FieldType`](crate::FieldType) for a type with text
/// capabilities.
///
/// - `text_field!(T)` uses both [`FromText`] and [`ToText`];
/// - `text_field!(T: from)` only reads;
/// - `text_field!(T: to)` only writes.
///
/// ```rust
/// use serde_ltsv::{text_field, BoxError, FieldType, Kind, ToText};
///
/// struct Secret;
/// impl ToText for Secret {
///     fn to_text(&self) -> Result<Vec<u8>, BoxError> {
///         Ok(b"***".to_vec())
///     }
/// }
/// text_field!(Secret: to);
///
/// assert_eq!(Secret::KIND, Kind::Custom);
/// assert!(Secret::decode_text(b"x").is_none());
/// ```
#[macro_export]
macro_rules! text_field {
    (@from) => {
        fn decode_text(
            text: &[u8],
        ) -> ::std::option::Option<::std::result::Result<Self, $crate::BoxError>> {
            ::std::option::Option::Some(<Self as $crate::FromText>::from_text(text))
        }
    };
    (@to) => {
        fn encode_text(
            &self,
        ) -> ::std::option::Option<::std::result::Result<::std::vec::Vec<u8>, $crate::BoxError>> {
            ::std::option::Option::Some(<Self as $crate::ToText>::to_text(self))
        }
    };
    ($ty:ty : from) => {
        impl $crate::FieldType for $ty {
            $crate::text_field!(@from);
        }
    };
    ($ty:ty : to) => {
        impl $crate::FieldType for $ty {
            $crate::text_field!(@to);
        }
    };
    ($ty:ty) => {
        impl $crate::FieldType for $ty {
            $crate::text_field!(@from);
            $crate::text_field!(@to);
        }
    };
}

fn utf8(text: &[u8]) -> Result<&str, BoxError> {
    Ok(std::str::from_utf8(text)?)
}

macro_rules! parsed_text {
    ($($ty:ty),*) => {$(
        impl FromText for $ty {
            fn from_text(text: &[u8]) -> Result<Self, BoxError> {
                Ok(utf8(text)?.parse()?)
            }
        }

        impl ToText for $ty {
            fn to_text(&self) -> Result<Vec<u8>, BoxError> {
                Ok(self.to_string().into_bytes())
            }
        }

        text_field!($ty);
    )*};
}

parsed_text!(IpAddr, Ipv4Addr, Ipv6Addr, BigInt, BigUint);

impl FromText for DateTime<FixedOffset> {
    fn from_text(text: &[u8]) -> Result<Self, BoxError> {
        Ok(DateTime::parse_from_rfc3339(utf8(text)?)?)
    }
}

impl ToText for DateTime<FixedOffset> {
    fn to_text(&self) -> Result<Vec<u8>, BoxError> {
        Ok(self.to_rfc3339_opts(SecondsFormat::AutoSi, true).into_bytes())
    }
}

impl FromText for DateTime<Utc> {
    fn from_text(text: &[u8]) -> Result<Self, BoxError> {
        Ok(DateTime::parse_from_rfc3339(utf8(text)?)?.with_timezone(&Utc))
    }
}

impl ToText for DateTime<Utc> {
    fn to_text(&self) -> Result<Vec<u8>, BoxError> {
        Ok(self.to_rfc3339_opts(SecondsFormat::AutoSi, true).into_bytes())
    }
}

text_field!(DateTime<FixedOffset>);
text_field!(DateTime<Utc>);
