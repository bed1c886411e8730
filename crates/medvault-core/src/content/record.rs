//! Decrypted record content.

use super::value::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The decrypted body of a medical record.
///
/// A mapping from field id to value, tagged with the schema it was written
/// under. This is the unit that gets encrypted at rest.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordContent {
    /// Logical identifier of the governing schema.
    pub schema_id: String,
    fields: BTreeMap<String, FieldValue>,
}

impl RecordContent {
    /// Create empty content for a schema.
    pub fn new(schema_id: impl Into<String>) -> Self {
        Self {
            schema_id: schema_id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, field_id: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(field_id, value);
        self
    }

    /// Get a field value.
    pub fn get(&self, field_id: &str) -> Option<&FieldValue> {
        self.fields.get(field_id)
    }

    /// Set a field value, returning the previous one.
    pub fn set(
        &mut self,
        field_id: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.fields.insert(field_id.into(), value.into())
    }

    /// Remove a field, returning its value if it was present.
    pub fn remove(&mut self, field_id: &str) -> Option<FieldValue> {
        self.fields.remove(field_id)
    }

    /// Whether a field is present.
    pub fn contains(&self, field_id: &str) -> bool {
        self.fields.contains_key(field_id)
    }

    /// Iterate over fields in id order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether there are no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let mut content = RecordContent::new("vitals").with_field("pulse", 72i64);

        assert_eq!(content.get("pulse"), Some(&FieldValue::Int(72)));
        assert_eq!(content.set("pulse", 80i64), Some(FieldValue::Int(72)));
        assert_eq!(content.remove("pulse"), Some(FieldValue::Int(80)));
        assert_eq!(content.remove("pulse"), None);
        assert!(content.is_empty());
    }

    #[test]
    fn test_json_roundtrip() {
        let content = RecordContent::new("vitals")
            .with_field("pulse", 72i64)
            .with_field("notes", "resting");

        let json = serde_json::to_vec(&content).unwrap();
        let back: RecordContent = serde_json::from_slice(&json).unwrap();

        assert_eq!(back, content);
        assert_eq!(back.schema_id, "vitals");
        assert_eq!(back.len(), 2);
    }
}
