//! Raw catalog rows with named-field access
//!
//! A `MetaRow` is one record returned by a metadata query, prior to
//! conversion into a domain object. Field names follow the engine's
//! catalog column names (e.g. `TABLE_NAME`, `ORDINAL_POSITION`).

use crate::{Result, StelaError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A scalar value in a catalog row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetaValue {
    /// NULL value
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point
    Float(f64),
    /// UTF-8 string
    Text(String),
    /// DateTime with timezone (UTC)
    Timestamp(DateTime<Utc>),
}

impl MetaValue {
    /// Check if the value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, MetaValue::Null)
    }

    /// Try to get as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetaValue::Int(v) => Some(*v),
            MetaValue::Text(s) => s.parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Try to get as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Int(v) => Some(*v as f64),
            MetaValue::Float(v) => Some(*v),
            MetaValue::Text(s) => s.parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Try to get as bool. Engine catalogs report flags as text
    /// (`Y`/`N`, `YES`/`NO`, `TRUE`/`FALSE`, `1`/`0`), so those
    /// encodings decode here as well.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetaValue::Bool(v) => Some(*v),
            MetaValue::Int(v) => Some(*v != 0),
            MetaValue::Text(s) => match s.to_ascii_uppercase().as_str() {
                "Y" | "YES" | "TRUE" | "T" | "ENABLED" | "1" => Some(true),
                "N" | "NO" | "FALSE" | "F" | "DISABLED" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Try to get as a UTC timestamp
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            MetaValue::Timestamp(v) => Some(*v),
            _ => None,
        }
    }
}

impl std::fmt::Display for MetaValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetaValue::Null => write!(f, "NULL"),
            MetaValue::Bool(v) => write!(f, "{}", v),
            MetaValue::Int(v) => write!(f, "{}", v),
            MetaValue::Float(v) => write!(f, "{}", v),
            MetaValue::Text(v) => write!(f, "{}", v),
            MetaValue::Timestamp(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Text(v.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Text(v)
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Int(v)
    }
}

impl From<i32> for MetaValue {
    fn from(v: i32) -> Self {
        MetaValue::Int(v as i64)
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        MetaValue::Float(v)
    }
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Bool(v)
    }
}

impl From<DateTime<Utc>> for MetaValue {
    fn from(v: DateTime<Utc>) -> Self {
        MetaValue::Timestamp(v)
    }
}

impl<T: Into<MetaValue>> From<Option<T>> for MetaValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => MetaValue::Null,
        }
    }
}

/// One record returned by a catalog query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaRow {
    fields: HashMap<String, MetaValue>,
}

impl MetaRow {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field assignment
    pub fn with(mut self, name: &str, value: impl Into<MetaValue>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Set a field value
    pub fn set(&mut self, name: &str, value: impl Into<MetaValue>) {
        self.fields.insert(name.to_string(), value.into());
    }

    /// Raw field access
    pub fn get(&self, name: &str) -> Option<&MetaValue> {
        self.fields.get(name)
    }

    /// Whether the row carries a non-NULL value for `name`
    pub fn has(&self, name: &str) -> bool {
        self.fields.get(name).is_some_and(|v| !v.is_null())
    }

    /// Required text field
    pub fn text(&self, name: &str) -> Result<String> {
        match self.fields.get(name) {
            Some(MetaValue::Null) | None => Err(StelaError::missing_field(name)),
            Some(value) => value
                .as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| StelaError::bad_field(name, format!("expected text, got {value}"))),
        }
    }

    /// Optional text field; NULL and absent both map to `None`
    pub fn text_opt(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    /// Required integer field
    pub fn int(&self, name: &str) -> Result<i64> {
        match self.fields.get(name) {
            Some(MetaValue::Null) | None => Err(StelaError::missing_field(name)),
            Some(value) => value.as_i64().ok_or_else(|| {
                StelaError::bad_field(name, format!("expected integer, got {value}"))
            }),
        }
    }

    /// Optional integer field
    pub fn int_opt(&self, name: &str) -> Option<i64> {
        self.fields.get(name).and_then(|v| v.as_i64())
    }

    /// Boolean flag field; absent and NULL decode as `default`
    pub fn flag(&self, name: &str, default: bool) -> bool {
        self.fields
            .get(name)
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }

    /// Required boolean field
    pub fn boolean(&self, name: &str) -> Result<bool> {
        match self.fields.get(name) {
            Some(MetaValue::Null) | None => Err(StelaError::missing_field(name)),
            Some(value) => value.as_bool().ok_or_else(|| {
                StelaError::bad_field(name, format!("expected boolean flag, got {value}"))
            }),
        }
    }

    /// Optional timestamp field
    pub fn timestamp_opt(&self, name: &str) -> Option<DateTime<Utc>> {
        self.fields.get(name).and_then(|v| v.as_timestamp())
    }

    /// Number of fields in the row
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the row has no fields at all
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
