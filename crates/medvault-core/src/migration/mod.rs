//! Migration engine for MedVault.
//!
//! Evolves already-encrypted records when their schema changes:
//! - Read-only preview of affected records and conversion risks
//! - Durable checkpoint of every candidate before mutation
//! - Sequential decrypt / transform / re-encrypt / save per record
//! - Rollback from the checkpoint when any record fails
//!
//! # Example
//!
//! ```ignore
//! use medvault_core::migration::{FieldTransformation, MigrationOptions, SchemaMigration};
//! use medvault_core::FieldType;
//!
//! let migration = SchemaMigration::new(
//!     "vitals",
//!     1,
//!     2,
//!     vec![FieldTransformation::type_convert("pulse", FieldType::Int)],
//! )?;
//!
//! let preview = engine.preview(&migration, &owner_id, &primary_key)?;
//! if !preview.has_warnings() {
//!     let options = MigrationOptions::default();
//!     let result = engine.execute(&migration, &owner_id, &primary_key, &options, &mut |_| {})?;
//!     assert!(result.is_success());
//! }
//! ```

pub mod checkpoint;
pub mod error;
pub mod executor;
pub mod observer;
pub mod report;
pub mod transform;

// Checkpoint types
pub use checkpoint::{CheckpointStore, MigrationCheckpoint, SledCheckpointStore};

// Error types
pub use error::{CheckpointError, MigrationError};

// Engine
pub use executor::MigrationEngine;

// Observer types
pub use observer::{
    MemoryObserver, MigrationEvent, MigrationObserver, NullObserver, TracingObserver,
};

// Report types
pub use report::{MigrationPreview, MigrationProgress, MigrationRecordError, MigrationResult};

// Transformation model
pub use transform::{generate_migration_id, FieldTransformation, MigrationOptions, SchemaMigration};
