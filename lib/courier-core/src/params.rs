//! Key/value encoding for headers, query strings and url-encoded forms.
//!
//! Inputs come in several shapes: uniform string maps, multi-valued maps,
//! byte-valued maps, heterogeneous [`serde_json`] maps and the ordered
//! [`Params`] multimap. Every shape funnels into [`Params`] through
//! [`ToParams`], which reports one error per rejected key and keeps the rest.
//!
//! ```
//! use std::collections::HashMap;
//! use courier_core::{Params, ToParams};
//!
//! let mut params = Params::new();
//! let errors = HashMap::from([("tags", vec!["a", "b"])]).append_to(&mut params);
//!
//! assert!(errors.is_empty());
//! assert_eq!(params.to_urlencoded(), "tags=a&tags=b");
//! ```

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use bytes::Bytes;
use serde_json::Value;

use crate::{Error, Result};

// ============================================================================
// Params
// ============================================================================

/// Ordered multimap of string pairs. Keys may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair, keeping existing values for the same key.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Chaining variant of [`Params::append`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(key, value);
        self
    }

    /// First value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `key`, in insertion order.
    pub fn get_all<'a, 'k>(&'a self, key: &'k str) -> impl Iterator<Item = &'a str> + use<'a, 'k> {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` when there are no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterate over the pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Encode as `application/x-www-form-urlencoded`.
    #[must_use]
    pub fn to_urlencoded(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }

    /// Flatten any serializable struct or map into pairs.
    ///
    /// Sequences become repeated keys; nested objects and nulls are rejected.
    pub fn from_serialize<T: serde::Serialize + ?Sized>(value: &T) -> Result<Self> {
        let mut params = Self::new();
        let errors = Serialized(value).append_to(&mut params);
        if errors.is_empty() {
            Ok(params)
        } else {
            Err(Error::Invalid(errors.into_iter().collect()))
        }
    }
}

/// Serializes as a sequence of pairs, the shape form encoders expect.
impl serde::Serialize for Params {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Params {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        self.pairs
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

impl IntoIterator for Params {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

// ============================================================================
// Values
// ============================================================================

/// A value usable in a query string or url-encoded form.
///
/// Scalars render to a single value, lists to repeated values.
pub trait ParamValue {
    /// Render the value, or describe why it is rejected.
    fn to_values(&self) -> std::result::Result<Vec<String>, String>;
}

/// A value usable as a single header value.
pub trait ToHeaderValue {
    /// Render the value, or describe why it is rejected.
    fn to_header_value(&self) -> std::result::Result<String, String>;
}

macro_rules! scalar_values {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ParamValue for $ty {
                fn to_values(&self) -> std::result::Result<Vec<String>, String> {
                    Ok(vec![self.to_string()])
                }
            }

            impl ToHeaderValue for $ty {
                fn to_header_value(&self) -> std::result::Result<String, String> {
                    Ok(self.to_string())
                }
            }
        )*
    };
}

scalar_values!(
    str, String, char, bool, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32,
    f64,
);

impl<T: ParamValue + ?Sized> ParamValue for &T {
    fn to_values(&self) -> std::result::Result<Vec<String>, String> {
        (**self).to_values()
    }
}

impl<T: ToHeaderValue + ?Sized> ToHeaderValue for &T {
    fn to_header_value(&self) -> std::result::Result<String, String> {
        (**self).to_header_value()
    }
}

impl ParamValue for [String] {
    fn to_values(&self) -> std::result::Result<Vec<String>, String> {
        Ok(self.to_vec())
    }
}

impl ParamValue for [&str] {
    fn to_values(&self) -> std::result::Result<Vec<String>, String> {
        Ok(self.iter().map(ToString::to_string).collect())
    }
}

impl ParamValue for Vec<String> {
    fn to_values(&self) -> std::result::Result<Vec<String>, String> {
        self.as_slice().to_values()
    }
}

impl ParamValue for Vec<&str> {
    fn to_values(&self) -> std::result::Result<Vec<String>, String> {
        self.as_slice().to_values()
    }
}

impl ParamValue for [u8] {
    fn to_values(&self) -> std::result::Result<Vec<String>, String> {
        Ok(vec![String::from_utf8_lossy(self).into_owned()])
    }
}

impl ParamValue for Vec<u8> {
    fn to_values(&self) -> std::result::Result<Vec<String>, String> {
        self.as_slice().to_values()
    }
}

impl ParamValue for Bytes {
    fn to_values(&self) -> std::result::Result<Vec<String>, String> {
        self.as_ref().to_values()
    }
}

impl ParamValue for Value {
    fn to_values(&self) -> std::result::Result<Vec<String>, String> {
        match self {
            Value::Array(items) => items
                .iter()
                .map(|item| scalar_to_string(item).ok_or_else(|| format!("list of {}", kind(item))))
                .collect(),
            other => scalar_to_string(other)
                .map(|v| vec![v])
                .ok_or_else(|| kind(other).to_string()),
        }
    }
}

impl ToHeaderValue for Value {
    fn to_header_value(&self) -> std::result::Result<String, String> {
        scalar_to_string(self).ok_or_else(|| kind(self).to_string())
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Shapes
// ============================================================================

/// A key/value collection that can be flattened into [`Params`].
pub trait ToParams {
    /// Append every supported pair to `params`.
    ///
    /// Returns one error per rejected key; accepted keys are still appended.
    fn append_to(&self, params: &mut Params) -> Vec<Error>;
}

fn append_entries<'a, K, V>(
    entries: impl IntoIterator<Item = (&'a K, &'a V)>,
    params: &mut Params,
) -> Vec<Error>
where
    K: AsRef<str> + ?Sized + 'a,
    V: ParamValue + ?Sized + 'a,
{
    let mut errors = Vec::new();
    for (key, value) in entries {
        let key = key.as_ref();
        match value.to_values() {
            Ok(values) => {
                for value in values {
                    params.append(key, value);
                }
            }
            Err(kind) => errors.push(Error::unsupported_value(key, kind)),
        }
    }
    errors
}

impl ToParams for Params {
    fn append_to(&self, params: &mut Params) -> Vec<Error> {
        params.extend(self.iter());
        Vec::new()
    }
}

impl<T: ToParams + ?Sized> ToParams for &T {
    fn append_to(&self, params: &mut Params) -> Vec<Error> {
        (**self).append_to(params)
    }
}

impl<K, V, S> ToParams for HashMap<K, V, S>
where
    K: AsRef<str>,
    V: ParamValue,
    S: BuildHasher,
{
    fn append_to(&self, params: &mut Params) -> Vec<Error> {
        append_entries(self.iter(), params)
    }
}

impl<K: AsRef<str>, V: ParamValue> ToParams for BTreeMap<K, V> {
    fn append_to(&self, params: &mut Params) -> Vec<Error> {
        append_entries(self.iter(), params)
    }
}

impl<K: AsRef<str>, V: ParamValue> ToParams for [(K, V)] {
    fn append_to(&self, params: &mut Params) -> Vec<Error> {
        append_entries(self.iter().map(|(k, v)| (k, v)), params)
    }
}

impl<K: AsRef<str>, V: ParamValue, const N: usize> ToParams for [(K, V); N] {
    fn append_to(&self, params: &mut Params) -> Vec<Error> {
        self.as_slice().append_to(params)
    }
}

impl<K: AsRef<str>, V: ParamValue> ToParams for Vec<(K, V)> {
    fn append_to(&self, params: &mut Params) -> Vec<Error> {
        self.as_slice().append_to(params)
    }
}

impl ToParams for serde_json::Map<String, Value> {
    fn append_to(&self, params: &mut Params) -> Vec<Error> {
        append_entries(self.iter(), params)
    }
}

impl ToParams for Value {
    fn append_to(&self, params: &mut Params) -> Vec<Error> {
        match self {
            Value::Object(map) => map.append_to(params),
            other => vec![Error::UnsupportedShape(format!(
                "expected a map of values, got {}",
                kind(other)
            ))],
        }
    }
}

/// Adapter flattening any [`serde::Serialize`] value through [`serde_json`].
///
/// ```
/// use courier_core::{Params, Serialized, ToParams};
///
/// #[derive(serde::Serialize)]
/// struct Search { q: &'static str, page: u32 }
///
/// let mut params = Params::new();
/// let errors = Serialized(&Search { q: "rust", page: 2 }).append_to(&mut params);
/// assert!(errors.is_empty());
/// assert_eq!(params.get("q"), Some("rust"));
/// assert_eq!(params.get("page"), Some("2"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Serialized<'a, T: ?Sized>(pub &'a T);

impl<T: serde::Serialize + ?Sized> ToParams for Serialized<'_, T> {
    fn append_to(&self, params: &mut Params) -> Vec<Error> {
        match serde_json::to_value(self.0) {
            Ok(value) => value.append_to(params),
            Err(err) => vec![Error::JsonSerialization(err)],
        }
    }
}
