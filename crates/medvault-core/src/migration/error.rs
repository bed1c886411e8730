//! Migration-specific error types.

use crate::crypto::{CodecError, KeyError};
use thiserror::Error;

/// Errors that abort a whole migration call.
///
/// Failures confined to one record never appear here; they are collected
/// into the result as [`MigrationRecordError`](super::MigrationRecordError).
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The target version is not newer than the source version.
    #[error("invalid version range: {from_version} -> {to_version}, target must be newer")]
    InvalidVersionRange {
        /// Source schema version.
        from_version: u32,
        /// Target schema version.
        to_version: u32,
    },

    /// The owner's content key could not be resolved.
    #[error("key unavailable: {0}")]
    KeyUnavailable(#[from] KeyError),

    /// The owner's records could not be fetched.
    #[error("failed to fetch records: {0}")]
    Fetch(#[source] crate::error::Error),

    /// The checkpoint could not be created.
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// Checkpoint store errors.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// A checkpoint already exists for this migration.
    #[error("checkpoint already exists for migration {migration_id:02x?}")]
    AlreadyExists {
        /// The conflicting migration ID.
        migration_id: [u8; 16],
    },

    /// No checkpoint exists for this migration.
    #[error("no checkpoint for migration {migration_id:02x?}")]
    NotFound {
        /// The requested migration ID.
        migration_id: [u8; 16],
    },

    /// A record could not be written back during restore.
    #[error("failed to restore record {record_id:02x?}: {source}")]
    Restore {
        /// The record that failed to restore.
        record_id: [u8; 16],
        /// The underlying store error.
        #[source]
        source: crate::error::Error,
    },

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] crate::error::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}

/// Why a single record failed to migrate.
#[derive(Debug, Error)]
pub(crate) enum RecordFailure {
    #[error("decryption failed: {0}")]
    Decrypt(#[source] CodecError),

    #[error("encryption failed: {0}")]
    Encrypt(#[source] CodecError),

    #[error("save failed: {0}")]
    Save(#[source] crate::error::Error),
}
