//! Field and record descriptions.
//!
//! A [`Record`] describes its fields once through [`Record::fields`]; every
//! field type implements [`FieldType`], which tells the engine how to turn
//! text into a value and back.
//!
//! ## Field kinds
//!
//! | Rust type | [`Kind`] |
//! |-----------|----------|
//! | `String` | `Text` |
//! | `i8`, `i16`, `i32`, `i64`, `isize` | `Signed { bits }` |
//! | `u8`, `u16`, `u32`, `u64`, `usize` | `Unsigned { bits }` |
//! | `f32`, `f64` | `Float { bits }` |
//! | `Option<T>` | kind of `T`, nullable |
//! | anything else | `Custom` |
//!
//! Custom types take part by implementing [`FieldType`] themselves, usually
//! through [`text_field!`](crate::text_field) on top of
//! [`FromText`](crate::FromText) and [`ToText`](crate::ToText).
//!
//! ```rust
//! use serde_ltsv::{FieldType, Kind};
//!
//! assert_eq!(<u8 as FieldType>::KIND, Kind::Unsigned { bits: 8 });
//! assert_eq!(<Option<f64> as FieldType>::KIND, Kind::Float { bits: 64 });
//! assert!(<Option<f64> as FieldType>::NULLABLE);
//! ```

use crate::error::{BoxError, FieldError};
use crate::{de, ser};

/// How a field's value is converted to and from text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Text,
    Signed { bits: u32 },
    Unsigned { bits: u32 },
    Float { bits: u32 },
    /// Conversion goes through [`FieldType::decode_text`] and
    /// [`FieldType::encode_text`].
    Custom,
}

/// A borrowed view of a field value, as seen by the encoder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldRef<'a> {
    /// A nullable field that currently holds nothing.
    Absent,
    Text(&'a str),
    Signed(i64),
    Unsigned(u64),
    Float32(f32),
    Float64(f64),
    Custom,
}

/// A value parsed by the decoder according to the field's [`Kind`].
///
/// Integers are already range-checked against the field's width and
/// `Float` values already fit the field's precision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar<'a> {
    Text(&'a str),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

/// A type that can be stored in a record field.
///
/// Every method has a default that describes an opaque type with no text
/// representation, so `impl FieldType for MyType {}` compiles and makes the
/// engine report a type error for that field at runtime.
pub trait FieldType: Sized + 'static {
    const KIND: Kind = Kind::Custom;

    /// `true` for `Option<T>`: absent keys stay `None` and `None` is never
    /// written.
    const NULLABLE: bool = false;

    /// Name used in error messages.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    fn view(&self) -> FieldRef<'_> {
        FieldRef::Custom
    }

    /// Builds a value from a scalar of this type's [`Kind`].
    fn from_scalar(_scalar: Scalar<'_>) -> Option<Self> {
        None
    }

    /// The decode-from-text capability. `None` means the type has none.
    fn decode_text(_text: &[u8]) -> Option<Result<Self, BoxError>> {
        None
    }

    /// The encode-to-text capability. `None` means the type has none.
    fn encode_text(&self) -> Option<Result<Vec<u8>, BoxError>> {
        None
    }
}

impl FieldType for String {
    const KIND: Kind = Kind::Text;

    fn type_name() -> &'static str {
        "string"
    }

    fn view(&self) -> FieldRef<'_> {
        FieldRef::Text(self)
    }

    fn from_scalar(scalar: Scalar<'_>) -> Option<Self> {
        match scalar {
            Scalar::Text(s) => Some(s.to_string()),
            _ => None,
        }
    }
}

macro_rules! signed_field {
    ($($ty:ty),*) => {$(
        impl FieldType for $ty {
            const KIND: Kind = Kind::Signed { bits: <$ty>::BITS };

            fn view(&self) -> FieldRef<'_> {
                FieldRef::Signed(*self as i64)
            }

            fn from_scalar(scalar: Scalar<'_>) -> Option<Self> {
                match scalar {
                    Scalar::Signed(v) => <$ty>::try_from(v).ok(),
                    _ => None,
                }
            }
        }
    )*};
}

macro_rules! unsigned_field {
    ($($ty:ty),*) => {$(
        impl FieldType for $ty {
            const KIND: Kind = Kind::Unsigned { bits: <$ty>::BITS };

            fn view(&self) -> FieldRef<'_> {
                FieldRef::Unsigned(*self as u64)
            }

            fn from_scalar(scalar: Scalar<'_>) -> Option<Self> {
                match scalar {
                    Scalar::Unsigned(v) => <$ty>::try_from(v).ok(),
                    _ => None,
                }
            }
        }
    )*};
}

signed_field!(i8, i16, i32, i64, isize);
unsigned_field!(u8, u16, u32, u64, usize);

impl FieldType for f32 {
    const KIND: Kind = Kind::Float { bits: 32 };

    fn view(&self) -> FieldRef<'_> {
        FieldRef::Float32(*self)
    }

    fn from_scalar(scalar: Scalar<'_>) -> Option<Self> {
        match scalar {
            // parsed at 32-bit precision, so the narrowing is exact
            Scalar::Float(v) => Some(v as f32),
            _ => None,
        }
    }
}

impl FieldType for f64 {
    const KIND: Kind = Kind::Float { bits: 64 };

    fn view(&self) -> FieldRef<'_> {
        FieldRef::Float64(*self)
    }

    fn from_scalar(scalar: Scalar<'_>) -> Option<Self> {
        match scalar {
            Scalar::Float(v) => Some(v),
            _ => None,
        }
    }
}

impl<T: FieldType> FieldType for Option<T> {
    const KIND: Kind = T::KIND;
    const NULLABLE: bool = true;

    fn type_name() -> &'static str {
        T::type_name()
    }

    fn view(&self) -> FieldRef<'_> {
        match self {
            Some(value) => value.view(),
            None => FieldRef::Absent,
        }
    }

    fn from_scalar(scalar: Scalar<'_>) -> Option<Self> {
        T::from_scalar(scalar).map(Some)
    }

    fn decode_text(text: &[u8]) -> Option<Result<Self, BoxError>> {
        T::decode_text(text).map(|result| result.map(Some))
    }

    fn encode_text(&self) -> Option<Result<Vec<u8>, BoxError>> {
        self.as_ref().and_then(T::encode_text)
    }
}

type DecodeFn<R> = Box<dyn Fn(&mut R, &str) -> Result<(), FieldError> + Send + Sync>;
type EncodeFn<R> = Box<dyn Fn(&R, &mut Vec<u8>) -> Result<bool, FieldError> + Send + Sync>;

/// One declared field of a record type `R`.
///
/// Built by [`impl_record!`](crate::impl_record); the accessors let the
/// engine read and write the field without knowing `R`'s layout.
pub struct FieldDescriptor<R> {
    pub(crate) name: &'static str,
    pub(crate) tag: &'static str,
    pub(crate) kind: Kind,
    pub(crate) nullable: bool,
    pub(crate) decode: DecodeFn<R>,
    pub(crate) encode: EncodeFn<R>,
}

impl<R: 'static> FieldDescriptor<R> {
    /// Describes the field `name` of type `F`, annotated with `tag`.
    ///
    /// `tag` follows the key annotation rules: `"-"` excludes the field,
    /// `""` derives the key from `name`, anything else names the key (only
    /// the part before the first comma counts).
    pub fn new<F: FieldType>(
        name: &'static str,
        tag: &'static str,
        get: fn(&R) -> &F,
        get_mut: fn(&mut R) -> &mut F,
    ) -> Self {
        FieldDescriptor {
            name,
            tag,
            kind: F::KIND,
            nullable: F::NULLABLE,
            decode: Box::new(move |record: &mut R, text: &str| {
                de::decode_field(get_mut(record), text)
            }),
            encode: Box::new(move |record: &R, out: &mut Vec<u8>| {
                ser::encode_field(get(record), out)
            }),
        }
    }

    /// The declared field name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The raw key annotation.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// A fixed-shape record that can be marshaled to and from LTSV.
///
/// Implement it with [`impl_record!`](crate::impl_record):
///
/// ```rust
/// use serde_ltsv::{impl_record, Record};
///
/// struct Access {
///     host: String,
///     status: u16,
///     memo: String,
/// }
/// impl_record!(Access { host, status => "code", memo => "-" });
///
/// let names: Vec<_> = Access::fields().iter().map(|f| f.name()).collect();
/// assert_eq!(names, vec!["host", "status", "memo"]);
/// ```
pub trait Record: Sized + 'static {
    /// Describes every declared field, in declaration order.
    fn fields() -> Vec<FieldDescriptor<Self>>;
}
