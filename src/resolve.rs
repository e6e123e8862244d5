//! Field-to-label resolution.
//!
//! Both directions agree on which label a field maps to:
//!
//! - a tag of `-` excludes the field from marshaling and unmarshaling;
//! - an empty tag uses the declared field name, lowercased;
//! - otherwise the tag's first comma-separated part is the label. The rest is
//!   reserved for options and ignored.
//!
//! ```rust
//! use serde_ltsv::resolve::resolve_key;
//!
//! assert_eq!(resolve_key("Weight", ""), Some("weight".to_string()));
//! assert_eq!(resolve_key("req_time", "reqtime,omitempty"), Some("reqtime".to_string()));
//! assert_eq!(resolve_key("memo", "-"), None);
//! ```

use crate::field::{Kind, Record};

const EXCLUDE_TAG: &str = "-";

/// Resolves the label for a field, or `None` if the field is excluded.
#[must_use]
pub fn resolve_key(name: &str, tag: &str) -> Option<String> {
    match tag.split(',').next().unwrap_or_default() {
        EXCLUDE_TAG => None,
        "" => Some(name.to_lowercase()),
        key => Some(key.to_string()),
    }
}

/// The resolved binding of one declared field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldBinding {
    /// Declared field name.
    pub name: &'static str,
    /// Label on the wire; `None` when the field is excluded.
    pub key: Option<String>,
    pub kind: Kind,
    pub nullable: bool,
}

impl FieldBinding {
    #[must_use]
    pub fn is_excluded(&self) -> bool {
        self.key.is_none()
    }
}

/// Resolves every declared field of `R`, in declaration order.
///
/// # Examples
///
/// ```rust
/// use serde_ltsv::{bindings, impl_record, Kind};
///
/// struct Access {
///     host: String,
///     req_time: Option<f64>,
///     memo: String,
/// }
/// impl_record!(Access { host, req_time => "reqtime", memo => "-" });
///
/// let bound = bindings::<Access>();
/// assert_eq!(bound[1].key.as_deref(), Some("reqtime"));
/// assert_eq!(bound[1].kind, Kind::Float { bits: 64 });
/// assert!(bound[1].nullable);
/// assert!(bound[2].is_excluded());
/// ```
#[must_use]
pub fn bindings<R: Record>() -> Vec<FieldBinding> {
    R::fields()
        .iter()
        .map(|field| FieldBinding {
            name: field.name,
            key: resolve_key(field.name, field.tag),
            kind: field.kind,
            nullable: field.nullable,
        })
        .collect()
}
