//! Field values and per-category readings.
//!
//! A probe reports one `Reading` per field it knows how to query. Each field is
//! read through its own guarded closure, so an error or panic while querying one
//! sensor leaves its siblings untouched.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder shown for a field the host could not supply.
pub const NOT_AVAILABLE: &str = "N/A";

/// A single leaf value inside a category.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// The query for this field failed or is unsupported on this host.
    Unavailable,
}

impl FieldValue {
    pub fn is_available(&self) -> bool {
        !matches!(self, FieldValue::Unavailable)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Integer(n) => write!(f, "{n}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Bool(b) => f.write_str(if *b { "Yes" } else { "No" }),
            FieldValue::Unavailable => f.write_str(NOT_AVAILABLE),
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<usize> for FieldValue {
    fn from(value: usize) -> Self {
        FieldValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        // NaN and infinities have no JSON representation.
        if value.is_finite() {
            FieldValue::Float(value)
        } else {
            FieldValue::Unavailable
        }
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        FieldValue::from(f64::from(value))
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Integer(n) => serializer.serialize_i64(*n),
            FieldValue::Float(v) => serializer.serialize_f64(*v),
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            FieldValue::Unavailable => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Integer(i64),
            Float(f64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Bool(b) => FieldValue::Bool(b),
            Raw::Integer(n) => FieldValue::Integer(n),
            Raw::Float(v) => FieldValue::Float(v),
            Raw::Text(s) if s == NOT_AVAILABLE => FieldValue::Unavailable,
            Raw::Text(s) => FieldValue::Text(s),
        })
    }
}

/// Ordered field name -> value mapping for one category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryFields {
    entries: Vec<(String, FieldValue)>,
}

impl CategoryFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field, keeping first-insertion order.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>> FromIterator<(N, FieldValue)> for CategoryFields {
    fn from_iter<I: IntoIterator<Item = (N, FieldValue)>>(iter: I) -> Self {
        let mut fields = CategoryFields::new();
        for (name, value) in iter {
            fields.insert(name, value);
        }
        fields
    }
}

impl Serialize for CategoryFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CategoryFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = CategoryFields;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut fields = CategoryFields::new();
                while let Some((name, value)) = access.next_entry::<String, FieldValue>()? {
                    if fields.get(&name).is_some() {
                        return Err(de::Error::custom(format!("duplicate field `{name}`")));
                    }
                    fields.insert(name, value);
                }
                Ok(fields)
            }
        }

        deserializer.deserialize_map(FieldsVisitor)
    }
}

/// Why a single field could not be read.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("{0}")]
    Failed(String),

    #[error("not reported by this host")]
    Missing,

    #[error("query panicked: {0}")]
    Panicked(String),
}

impl From<anyhow::Error> for ProbeError {
    fn from(e: anyhow::Error) -> Self {
        Self::Failed(format!("{e:#}"))
    }
}

/// Result of reading a single field.
pub type Reading = Result<FieldValue, ProbeError>;

/// Raw readings produced by one category probe.
#[derive(Debug, Default)]
pub struct Readings {
    entries: Vec<(&'static str, Reading)>,
}

impl Readings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a field through a fallible query.
    pub fn read<T, F>(mut self, name: &'static str, query: F) -> Self
    where
        T: Into<FieldValue>,
        F: FnOnce() -> anyhow::Result<T>,
    {
        let reading = match panic::catch_unwind(AssertUnwindSafe(query)) {
            Ok(Ok(value)) => Ok(value.into()),
            Ok(Err(err)) => Err(ProbeError::from(err)),
            Err(payload) => Err(ProbeError::Panicked(panic_message(payload.as_ref()))),
        };
        self.entries.push((name, reading));
        self
    }

    /// Read a field whose query reports absence as `None`.
    pub fn read_opt<T, F>(mut self, name: &'static str, query: F) -> Self
    where
        T: Into<FieldValue>,
        F: FnOnce() -> Option<T>,
    {
        let reading = match panic::catch_unwind(AssertUnwindSafe(query)) {
            Ok(Some(value)) => Ok(value.into()),
            Ok(None) => Err(ProbeError::Missing),
            Err(payload) => Err(ProbeError::Panicked(panic_message(payload.as_ref()))),
        };
        self.entries.push((name, reading));
        self
    }

    /// Take the reading for `name`, if the probe produced one.
    pub(crate) fn take(&mut self, name: &str) -> Option<Reading> {
        let idx = self.entries.iter().position(|(n, _)| *n == name)?;
        Some(self.entries.swap_remove(idx).1)
    }

    /// Field names the probe produced that nobody asked for.
    pub(crate) fn leftover_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(n, _)| *n)
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Round to two decimal places for display-friendly sizes and percentages.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub(crate) const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;
pub(crate) const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

pub(crate) fn bytes_to_gb(bytes: u64) -> f64 {
    round2(bytes as f64 / BYTES_PER_GIB)
}

pub(crate) fn bytes_to_mb(bytes: u64) -> f64 {
    round2(bytes as f64 / BYTES_PER_MIB)
}

/// Percentage of `used` in `total`, 0 when `total` is 0.
pub(crate) fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2((used as f64 / total as f64 * 100.0).clamp(0.0, 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_serializes_as_placeholder() {
        let json = serde_json::to_string(&FieldValue::Unavailable).unwrap();
        assert_eq!(json, "\"N/A\"");
        let back: FieldValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FieldValue::Unavailable);
    }

    #[test]
    fn numbers_keep_their_json_type() {
        let back: FieldValue = serde_json::from_str("3200").unwrap();
        assert_eq!(back, FieldValue::Integer(3200));
        let back: FieldValue = serde_json::from_str("12.5").unwrap();
        assert_eq!(back, FieldValue::Float(12.5));
        let back: FieldValue = serde_json::from_str("true").unwrap();
        assert_eq!(back, FieldValue::Bool(true));
    }

    #[test]
    fn zero_is_a_value_not_a_placeholder() {
        assert_eq!(FieldValue::from(0u64), FieldValue::Integer(0));
        assert_eq!(FieldValue::from(0.0f64), FieldValue::Float(0.0));
        assert_eq!(FieldValue::from(f64::NAN), FieldValue::Unavailable);
    }

    #[test]
    fn readings_isolate_errors_and_panics() {
        let mut readings = Readings::new()
            .read("ok", || Ok(4usize))
            .read("err", || -> anyhow::Result<u64> { anyhow::bail!("sensor offline") })
            .read("boom", || -> anyhow::Result<u64> { panic!("driver crashed") })
            .read_opt("none", || None::<String>);

        assert_eq!(readings.take("ok"), Some(Ok(FieldValue::Integer(4))));
        assert_eq!(
            readings.take("err"),
            Some(Err(ProbeError::Failed("sensor offline".to_string())))
        );
        assert_eq!(
            readings.take("boom"),
            Some(Err(ProbeError::Panicked("driver crashed".to_string())))
        );
        assert_eq!(readings.take("none"), Some(Err(ProbeError::Missing)));
        assert_eq!(readings.take("ok"), None);
    }

    #[test]
    fn category_fields_preserve_insertion_order() {
        let mut fields = CategoryFields::new();
        assert!(fields.is_empty());
        fields.insert("b", FieldValue::Integer(1));
        fields.insert("a", FieldValue::Integer(2));
        fields.insert("b", FieldValue::Integer(3));

        assert_eq!(fields.names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(fields.get("b"), Some(&FieldValue::Integer(3)));
        assert_eq!(fields.len(), 2);
        assert!(!fields.is_empty());

        let json = serde_json::to_string(&fields).unwrap();
        assert_eq!(json, r#"{"b":3,"a":2}"#);
    }

    #[test]
    fn percent_handles_empty_totals() {
        assert_eq!(percent(5, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
        assert_eq!(bytes_to_gb(3 * 1024 * 1024 * 1024), 3.0);
    }
}
