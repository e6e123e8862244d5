//! LTSV Format
//!
//! This module documents the LTSV (Labeled Tab-separated Values) format as
//! read and written by this library.
//!
//! # Overview
//!
//! One LTSV record is one line of `label:value` fields separated by tabs:
//!
//! ```text
//! host:127.0.0.1<TAB>ident:-<TAB>time:[10/Oct/2000:13:55:36 -0700]<TAB>status:200
//! ```
//!
//! The format is used mostly for access logs: every field carries its own
//! label, so columns can be added, removed or reordered without breaking
//! readers.
//!
//! # Syntax
//!
//! | Element | Rule |
//! |---------|------|
//! | Field separator | a single tab ([`FIELD_DELIMITER`](crate::FIELD_DELIMITER)) |
//! | Label separator | the first colon in a field ([`KEY_DELIMITER`](crate::KEY_DELIMITER)) |
//! | Label | everything before the first colon, trimmed |
//! | Value | everything after the first colon, trimmed; may contain colons |
//! | Escaping | none |
//! | Trailing delimiter | never written |
//!
//! This library does not split lines. Each call handles exactly one record;
//! stream framing is left to the caller.
//!
//! ## Reading
//!
//! - A field without a colon makes the whole record malformed
//!   ([`Error::Malformed`](crate::Error::Malformed)). Since an empty record is
//!   a single empty field, it is malformed too.
//! - A label that appears more than once keeps the value of its last
//!   occurrence.
//! - Labels the target does not know are ignored; labels the target expects
//!   but the record lacks leave the target's value alone.
//!
//! ## Writing
//!
//! - Record fields are written in declaration order. Map entries are written
//!   in the map's iteration order, which for `HashMap` is unspecified.
//! - A `None` optional field is left out entirely, with no empty label and no
//!   extra tab.
//! - Integers are written in base 10 and floats in their shortest decimal form
//!   that reads back to the same value, never in exponent notation.
//!
//! ```text
//! user:songmu<TAB>age:36<TAB>height:169.1<TAB>weight:66.6
//! ```
//!
//! # Labels
//!
//! | Declaration | Label |
//! |-------------|-------|
//! | `host` | `host` |
//! | `UserAgent` | `useragent` |
//! | `req_time => "reqtime"` | `reqtime` |
//! | `size => "size,omitempty"` | `size` |
//! | `memo => "-"` | none, the field is skipped |
//!
//! # Value Types
//!
//! | Field type | Read | Written |
//! |------------|------|---------|
//! | `String` | verbatim | verbatim |
//! | `i8`..`i64`, `isize` | base 10, range-checked | base 10 |
//! | `u8`..`u64`, `usize` | base 10, range-checked | base 10 |
//! | `f32`, `f64` | decimal, overflow is an error | shortest decimal |
//! | `Option<T>` | as `T`, wrapped in `Some` | as `T`, or nothing for `None` |
//! | [`FromText`](crate::FromText) / [`ToText`](crate::ToText) types | `from_text` | `to_text` |
//!
//! # Resources
//!
//! - LTSV home: <http://ltsv.org/>
