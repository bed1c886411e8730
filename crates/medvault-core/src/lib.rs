//! MedVault Core - Encrypted record storage and schema migration.
//!
//! This crate provides the storage, encryption and migration layers used by
//! MedVault to evolve already-encrypted records when their schema changes.

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod content;
pub mod crypto;
pub mod error;
pub mod migration;
pub mod storage;
pub mod vault;

pub use content::{
    convert, is_conversion_supported, merge, FieldType, FieldValue, MergeStrategy, RecordContent,
};
pub use crypto::{
    CodecError, ContentCodec, ContentKey, KeyError, KeyResolver, SealedJsonCodec, SledKeyStore,
};
pub use error::Error;
pub use migration::{
    CheckpointError, CheckpointStore, FieldTransformation, MemoryObserver, MigrationCheckpoint,
    MigrationEngine, MigrationError, MigrationEvent, MigrationObserver, MigrationOptions,
    MigrationPreview, MigrationProgress, MigrationRecordError, MigrationResult, NullObserver,
    SchemaMigration, SledCheckpointStore, TracingObserver,
};
pub use storage::{MedicalRecord, RecordStore, SledRecordStore, StorageConfig};
pub use vault::{Vault, VaultError};
