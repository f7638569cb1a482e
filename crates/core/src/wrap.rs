//! Default-template wrapping of raw exam records.
//!
//! Exam content arrives as loosely-typed JSON. Each record type starts from a
//! fixed template and overrides only the fields that are present with the
//! expected JSON type; everything else keeps the template value. Wrapping
//! never fails.

use serde_json::Value;

/// A canonical record that can be filled in from untyped JSON.
pub trait Wrap: Sized {
    /// The default-value template every wrapped record starts from.
    fn template() -> Self;

    /// Overlays the fields found in `raw` on top of [`Wrap::template`].
    fn wrap(raw: &Value) -> Self;
}

/// Wraps every element of a JSON array, preserving order.
///
/// Anything other than an array yields an empty list.
#[must_use]
pub fn wrap_array<T: Wrap>(raw: &Value) -> Vec<T> {
    raw.as_array()
        .map(|items| items.iter().map(T::wrap).collect())
        .unwrap_or_default()
}

pub(crate) fn str_field<'a>(raw: &'a Value, key: &str) -> Option<&'a str> {
    raw.get(key).and_then(Value::as_str)
}

pub(crate) fn bool_field(raw: &Value, key: &str) -> Option<bool> {
    raw.get(key).and_then(Value::as_bool)
}

pub(crate) fn i64_field(raw: &Value, key: &str) -> Option<i64> {
    raw.get(key).and_then(Value::as_i64)
}

/// Reads a string field, mapping blank strings to `None`.
///
/// Used by the nullable normalized records, where an empty default must not
/// compare equal to another empty default.
pub(crate) fn non_empty_str_field(raw: &Value, key: &str) -> Option<String> {
    str_field(raw, key)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}
