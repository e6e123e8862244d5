//! Error types for LTSV marshaling and unmarshaling.
//!
//! ## Error Categories
//!
//! - **Malformed input**: the raw text does not split into `key:value` pairs.
//!   The whole call fails before any field is touched.
//! - **Type mismatches**: the source or target is not a shape this crate can
//!   handle (for example a map whose values are not text).
//! - **Field errors**: one or more fields could not be converted. These are
//!   collected into [`FieldErrors`] so that one bad field never hides another.
//! - **I/O errors**: reading from or writing to a stream failed.
//!
//! ## Examples
//!
//! ```rust
//! use serde_ltsv::{impl_record, unmarshal_str, Error};
//!
//! #[derive(Default)]
//! struct Access {
//!     status: u16,
//!     size: u64,
//! }
//! impl_record!(Access { status, size });
//!
//! let mut access = Access::default();
//! let err = unmarshal_str("status:ok\tsize:512", &mut access).unwrap_err();
//!
//! // The good field is still decoded.
//! assert_eq!(access.size, 512);
//! match err {
//!     Error::Fields(errors) => assert!(errors.of_field("status").is_some()),
//!     other => panic!("unexpected error: {other}"),
//! }
//! ```

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Boxed error returned by custom text capabilities.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Represents all possible errors that can occur while marshaling or
/// unmarshaling LTSV.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The input could not be split into `key:value` pairs.
    #[error("not a ltsv: {0}")]
    Malformed(String),

    /// The source or target is not a supported shape.
    #[error("{0}")]
    TypeMismatch(String),

    /// One or more fields failed to convert.
    #[error(transparent)]
    Fields(FieldErrors),

    /// IO error during reading or writing
    #[error("IO error: {0}")]
    Io(String),

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),
}

impl Error {
    /// Creates a structural error for input that is not LTSV.
    ///
    /// The message carries the whole offending input.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_ltsv::Error;
    ///
    /// let err = Error::malformed("hoge");
    /// assert_eq!(err.to_string(), "not a ltsv: hoge");
    /// ```
    pub fn malformed(input: &str) -> Self {
        Error::Malformed(input.to_string())
    }

    /// Creates a type mismatch error for an unsupported source or target shape.
    pub fn type_mismatch<T: fmt::Display>(msg: T) -> Self {
        Error::TypeMismatch(msg.to_string())
    }

    /// Creates an I/O error for stream reading/writing failures.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }

    /// Creates a custom error with a display message.
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Returns the per-field errors if this is an aggregate error.
    #[must_use]
    pub fn fields(&self) -> Option<&FieldErrors> {
        match self {
            Error::Fields(errors) => Some(errors),
            _ => None,
        }
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// The failure of a single field.
#[derive(Debug, Clone, Error)]
pub enum FieldError {
    /// The text could not be stored in a value of the field's type.
    #[error("ltsv: cannot unmarshal {value} into value of type {type_name}")]
    Unmarshal {
        value: String,
        type_name: &'static str,
    },

    /// The field's type has no text representation.
    #[error("ltsv: failed to marshal type: {type_name}")]
    Marshal { type_name: &'static str },

    /// A custom text capability reported an error.
    #[error("{0}")]
    Text(Arc<dyn std::error::Error + Send + Sync + 'static>),
}

impl FieldError {
    pub(crate) fn unmarshal(value: impl Into<String>, type_name: &'static str) -> Self {
        FieldError::Unmarshal {
            value: value.into(),
            type_name,
        }
    }

    /// The error a custom capability returned, if this is one.
    #[must_use]
    pub fn text_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            FieldError::Text(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<BoxError> for FieldError {
    fn from(err: BoxError) -> Self {
        FieldError::Text(Arc::from(err))
    }
}

/// Per-field errors collected during a single marshal or unmarshal call,
/// keyed by declared field name in the order the fields were processed.
#[derive(Debug, Clone, Default)]
pub struct FieldErrors(IndexMap<&'static str, FieldError>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        FieldErrors(IndexMap::new())
    }

    pub(crate) fn insert(&mut self, name: &'static str, err: FieldError) {
        self.0.insert(name, err);
    }

    /// Returns the error recorded for a declared field name.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_ltsv::{impl_record, unmarshal_str};
    ///
    /// #[derive(Default)]
    /// struct S { age: u8 }
    /// impl_record!(S { age });
    ///
    /// let err = unmarshal_str("age:300", &mut S::default()).unwrap_err();
    /// let errors = err.fields().unwrap();
    /// assert_eq!(
    ///     errors.of_field("age").unwrap().to_string(),
    ///     "ltsv: cannot unmarshal number 300 into value of type u8"
    /// );
    /// ```
    #[must_use]
    pub fn of_field(&self, name: &str) -> Option<&FieldError> {
        self.0.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(field name, error)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldError)> {
        self.0.iter().map(|(name, err)| (*name, err))
    }

    /// Field names that failed.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    /// `Ok(())` when nothing failed, otherwise the aggregate as an [`Error`].
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Fields(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(no error)");
        }
        for (i, (name, err)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "field {:?}: {}", name, err)?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_aggregate_is_ok() {
        let errors = FieldErrors::new();
        assert_eq!(errors.to_string(), "(no error)");
        assert!(errors.into_result().is_ok());
    }

    #[test]
    fn test_aggregate_display_lists_fields_in_order() {
        let mut errors = FieldErrors::new();
        errors.insert("age", FieldError::unmarshal("number -", "u8"));
        errors.insert("height", FieldError::unmarshal("number x", "f64"));

        assert_eq!(
            errors.to_string(),
            "field \"age\": ltsv: cannot unmarshal number - into value of type u8\n\
             field \"height\": ltsv: cannot unmarshal number x into value of type f64"
        );
        assert_eq!(errors.names().collect::<Vec<_>>(), vec!["age", "height"]);
    }

    #[test]
    fn test_text_error_keeps_cause() {
        let cause: BoxError = "bad timestamp".into();
        let err = FieldError::from(cause);
        assert_eq!(err.to_string(), "bad timestamp");
        assert_eq!(err.text_error().unwrap().to_string(), "bad timestamp");
    }

    #[test]
    fn test_into_result_wraps_aggregate() {
        let mut errors = FieldErrors::new();
        errors.insert("size", FieldError::Marshal { type_name: "Opaque" });
        let err = errors.into_result().unwrap_err();
        assert_eq!(err.fields().map(FieldErrors::len), Some(1));
    }
}
