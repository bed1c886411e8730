//! Migration definitions and field-level transformations.

use super::error::MigrationError;
use crate::content::{convert, merge, FieldType, MergeStrategy, RecordContent};
use crate::storage::key::generate_id;
use serde::{Deserialize, Serialize};

/// Generate a unique migration ID.
pub fn generate_migration_id() -> [u8; 16] {
    generate_id()
}

/// Caller-chosen options for executing a migration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MigrationOptions {
    /// How merge conflicts between two populated fields are resolved.
    pub merge_strategy: MergeStrategy,
}

impl MigrationOptions {
    /// Options using the given merge strategy.
    pub fn with_merge_strategy(merge_strategy: MergeStrategy) -> Self {
        Self { merge_strategy }
    }
}

/// A single field-level operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FieldTransformation {
    /// Delete a field.
    Remove {
        /// Field to delete.
        field_id: String,
    },
    /// Convert a field's value to another type.
    TypeConvert {
        /// Field to convert.
        field_id: String,
        /// Target type.
        to_type: FieldType,
    },
    /// Merge one field into another, consuming the source.
    Merge {
        /// Field merged away.
        source_field_id: String,
        /// Field receiving the merged value.
        target_field_id: String,
    },
}

impl FieldTransformation {
    /// Remove a field.
    pub fn remove(field_id: impl Into<String>) -> Self {
        FieldTransformation::Remove {
            field_id: field_id.into(),
        }
    }

    /// Convert a field to a type.
    pub fn type_convert(field_id: impl Into<String>, to_type: FieldType) -> Self {
        FieldTransformation::TypeConvert {
            field_id: field_id.into(),
            to_type,
        }
    }

    /// Merge `source` into `target`.
    pub fn merge(source: impl Into<String>, target: impl Into<String>) -> Self {
        FieldTransformation::Merge {
            source_field_id: source.into(),
            target_field_id: target.into(),
        }
    }

    /// Apply this transformation to content in place.
    ///
    /// Never fails. A conversion that cannot be performed leaves the original
    /// value untouched; a merge always consumes its source field, even when
    /// nothing was produced.
    pub fn apply(&self, content: &mut RecordContent, options: &MigrationOptions) {
        match self {
            FieldTransformation::Remove { field_id } => {
                content.remove(field_id);
            }
            FieldTransformation::TypeConvert { field_id, to_type } => {
                let converted = content.get(field_id).and_then(|value| convert(value, *to_type));
                if let Some(value) = converted {
                    content.set(field_id.as_str(), value);
                }
            }
            FieldTransformation::Merge {
                source_field_id,
                target_field_id,
            } => {
                let values = [
                    content.get(source_field_id).cloned(),
                    content.get(target_field_id).cloned(),
                ];
                if let Some(merged) = merge(&values, &options.merge_strategy) {
                    content.set(target_field_id.as_str(), merged);
                }
                content.remove(source_field_id);
            }
        }
    }
}

/// One unit of schema evolution.
///
/// Immutable once built; the version ordering is checked at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMigration {
    id: [u8; 16],
    schema_id: String,
    from_version: u32,
    to_version: u32,
    transformations: Vec<FieldTransformation>,
}

impl SchemaMigration {
    /// Create a migration with a fresh ID.
    pub fn new(
        schema_id: impl Into<String>,
        from_version: u32,
        to_version: u32,
        transformations: Vec<FieldTransformation>,
    ) -> Result<Self, MigrationError> {
        if to_version <= from_version {
            return Err(MigrationError::InvalidVersionRange {
                from_version,
                to_version,
            });
        }

        Ok(Self {
            id: generate_migration_id(),
            schema_id: schema_id.into(),
            from_version,
            to_version,
            transformations,
        })
    }

    /// Replace the generated ID, e.g. to retry a migration under its old ID.
    pub fn with_id(mut self, id: [u8; 16]) -> Self {
        self.id = id;
        self
    }

    /// Migration ID.
    pub fn id(&self) -> &[u8; 16] {
        &self.id
    }

    /// Schema whose records this migration applies to.
    pub fn schema_id(&self) -> &str {
        &self.schema_id
    }

    /// Source schema version.
    pub fn from_version(&self) -> u32 {
        self.from_version
    }

    /// Target schema version.
    pub fn to_version(&self) -> u32 {
        self.to_version
    }

    /// Ordered transformations.
    pub fn transformations(&self) -> &[FieldTransformation] {
        &self.transformations
    }

    /// Apply every transformation, left to right, to the same content.
    pub fn apply(&self, content: &mut RecordContent, options: &MigrationOptions) {
        for transformation in &self.transformations {
            transformation.apply(content, options);
        }
    }
}
