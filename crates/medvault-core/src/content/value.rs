//! Typed field values stored inside record content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The type of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// UTF-8 text.
    String,
    /// 64-bit signed integer.
    Int,
    /// 64-bit floating point.
    Double,
    /// Boolean flag.
    Bool,
    /// Point in time.
    Date,
    /// List of strings.
    StringArray,
    /// List of attachment identifiers.
    AttachmentIdList,
}

impl FieldType {
    /// Whether this type takes part in type conversion.
    pub fn is_convertible(self) -> bool {
        matches!(self, FieldType::String | FieldType::Int | FieldType::Double)
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::String => write!(f, "string"),
            FieldType::Int => write!(f, "int"),
            FieldType::Double => write!(f, "double"),
            FieldType::Bool => write!(f, "bool"),
            FieldType::Date => write!(f, "date"),
            FieldType::StringArray => write!(f, "string_array"),
            FieldType::AttachmentIdList => write!(f, "attachment_id_list"),
        }
    }
}

/// A single field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    Date(DateTime<Utc>),
    StringArray(Vec<String>),
    AttachmentIdList(Vec<[u8; 16]>),
}

impl FieldValue {
    /// The type of this value.
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::String(_) => FieldType::String,
            FieldValue::Int(_) => FieldType::Int,
            FieldValue::Double(_) => FieldType::Double,
            FieldValue::Bool(_) => FieldType::Bool,
            FieldValue::Date(_) => FieldType::Date,
            FieldValue::StringArray(_) => FieldType::StringArray,
            FieldValue::AttachmentIdList(_) => FieldType::AttachmentIdList,
        }
    }

    /// Empty strings and empty lists are empty; numbers, flags and dates never are.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::String(s) => s.is_empty(),
            FieldValue::StringArray(items) => items.is_empty(),
            FieldValue::AttachmentIdList(ids) => ids.is_empty(),
            FieldValue::Int(_)
            | FieldValue::Double(_)
            | FieldValue::Bool(_)
            | FieldValue::Date(_) => false,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Double(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}
