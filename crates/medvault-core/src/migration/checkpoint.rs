//! Pre-migration checkpoints.
//!
//! A checkpoint snapshots every candidate record, still encrypted and
//! unmodified, before the first mutation. It is the compensating-transaction
//! mechanism that lets a partly failed migration be undone.

use super::error::CheckpointError;
use crate::error::Error;
use crate::storage::key::current_timestamp;
use crate::storage::{MedicalRecord, RecordStore};
use rkyv::{Archive, Deserialize, Serialize};
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
};
use sled::{Db, Tree};
use std::sync::Arc;
use tracing::warn;

/// A durable snapshot of records taken before a migration.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct MigrationCheckpoint {
    /// Migration this checkpoint belongs to.
    pub migration_id: [u8; 16],
    /// Owner of the snapshotted records.
    pub owner_id: [u8; 16],
    /// Schema being migrated.
    pub schema_id: String,
    /// When the checkpoint was taken (microseconds since epoch).
    pub created_at: u64,
    /// Pre-migration records, in processing order.
    pub records: Vec<MedicalRecord>,
}

impl MigrationCheckpoint {
    /// Create a new checkpoint stamped with the current time.
    pub fn new(
        migration_id: [u8; 16],
        owner_id: [u8; 16],
        schema_id: impl Into<String>,
        records: Vec<MedicalRecord>,
    ) -> Self {
        Self {
            migration_id,
            owner_id,
            schema_id: schema_id.into(),
            created_at: current_timestamp(),
            records,
        }
    }

    /// Serialize the checkpoint to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CheckpointError> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| CheckpointError::Serialization(e.to_string()))
    }

    /// Deserialize a checkpoint from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CheckpointError> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| CheckpointError::Deserialization(e.to_string()))
    }
}

/// Durable checkpoint storage keyed by migration ID.
pub trait CheckpointStore: Send + Sync {
    /// Snapshot records for a migration.
    ///
    /// Fails with `AlreadyExists` if a checkpoint is already present; never
    /// overwrites.
    fn create(
        &self,
        migration_id: &[u8; 16],
        owner_id: &[u8; 16],
        schema_id: &str,
        records: &[MedicalRecord],
    ) -> Result<(), CheckpointError>;

    /// Write every snapshotted record back, in snapshot order.
    ///
    /// Does not delete the checkpoint.
    fn restore(&self, migration_id: &[u8; 16]) -> Result<Vec<MedicalRecord>, CheckpointError>;

    /// Delete a checkpoint. Deleting a missing checkpoint is not an error.
    fn delete(&self, migration_id: &[u8; 16]) -> Result<(), CheckpointError>;

    /// Whether a checkpoint exists.
    fn has_checkpoint(&self, migration_id: &[u8; 16]) -> Result<bool, CheckpointError>;
}

/// Checkpoint store backed by a sled tree.
pub struct SledCheckpointStore {
    tree: Tree,
    records: Arc<dyn RecordStore>,
}

impl SledCheckpointStore {
    /// Tree name for checkpoints.
    pub const TREE_NAME: &'static str = "checkpoints";

    const KEY_PREFIX: &'static [u8] = b"checkpoint:";

    /// Open or create the checkpoint store. Restores go through `records`.
    pub fn open(db: &Db, records: Arc<dyn RecordStore>) -> Result<Self, CheckpointError> {
        let tree = db.open_tree(Self::TREE_NAME).map_err(Error::from)?;
        Ok(Self { tree, records })
    }

    /// Load a checkpoint without restoring it.
    pub fn load(
        &self,
        migration_id: &[u8; 16],
    ) -> Result<Option<MigrationCheckpoint>, CheckpointError> {
        let key = Self::checkpoint_key(migration_id);
        match self.tree.get(key).map_err(Error::from)? {
            Some(bytes) => Ok(Some(MigrationCheckpoint::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// List every retained checkpoint, e.g. after a failed rollback.
    pub fn list(&self) -> Result<Vec<MigrationCheckpoint>, CheckpointError> {
        let mut checkpoints = Vec::new();
        for entry in self.tree.scan_prefix(Self::KEY_PREFIX) {
            let (_, value) = entry.map_err(Error::from)?;
            checkpoints.push(MigrationCheckpoint::from_bytes(&value)?);
        }
        Ok(checkpoints)
    }

    fn flush(&self) -> Result<(), CheckpointError> {
        self.tree.flush().map_err(Error::from)?;
        Ok(())
    }

    /// Drop a checkpoint whose flush failed, so a failed create leaves
    /// nothing behind. Returns the flush error.
    fn discard_unflushed(&self, key: &[u8], err: CheckpointError) -> CheckpointError {
        if let Err(remove_err) = self.tree.remove(key) {
            warn!(error = %remove_err, "Failed to discard unflushed checkpoint");
        }
        err
    }

    fn checkpoint_key(id: &[u8; 16]) -> Vec<u8> {
        let mut key = Vec::with_capacity(Self::KEY_PREFIX.len() + 16);
        key.extend_from_slice(Self::KEY_PREFIX);
        key.extend_from_slice(id);
        key
    }
}

impl CheckpointStore for SledCheckpointStore {
    fn create(
        &self,
        migration_id: &[u8; 16],
        owner_id: &[u8; 16],
        schema_id: &str,
        records: &[MedicalRecord],
    ) -> Result<(), CheckpointError> {
        let key = Self::checkpoint_key(migration_id);
        let value = MigrationCheckpoint::new(*migration_id, *owner_id, schema_id, records.to_vec())
            .to_bytes()?;

        // Existence check and insert commit together.
        let result = self
            .tree
            .transaction(|tx| -> ConflictableTransactionResult<(), CheckpointError> {
                if tx.get(key.as_slice())?.is_some() {
                    return Err(ConflictableTransactionError::Abort(CheckpointError::AlreadyExists {
                        migration_id: *migration_id,
                    }));
                }
                tx.insert(key.as_slice(), value.as_slice())?;
                Ok(())
            });

        match result {
            Ok(()) => self.flush().map_err(|e| self.discard_unflushed(&key, e)),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(CheckpointError::Storage(Error::Storage(e))),
        }
    }

    fn restore(&self, migration_id: &[u8; 16]) -> Result<Vec<MedicalRecord>, CheckpointError> {
        let checkpoint = self.load(migration_id)?.ok_or(CheckpointError::NotFound {
            migration_id: *migration_id,
        })?;

        for record in &checkpoint.records {
            self.records
                .save(record)
                .map_err(|source| CheckpointError::Restore {
                    record_id: record.id,
                    source,
                })?;
        }

        Ok(checkpoint.records)
    }

    fn delete(&self, migration_id: &[u8; 16]) -> Result<(), CheckpointError> {
        let key = Self::checkpoint_key(migration_id);
        self.tree.remove(key).map_err(Error::from)?;
        self.flush()
    }

    fn has_checkpoint(&self, migration_id: &[u8; 16]) -> Result<bool, CheckpointError> {
        let key = Self::checkpoint_key(migration_id);
        Ok(self.tree.contains_key(key).map_err(Error::from)?)
    }
}
