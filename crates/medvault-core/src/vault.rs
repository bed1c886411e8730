//! Vault - one sled database holding records, keys and checkpoints.

use crate::content::RecordContent;
use crate::crypto::{
    CodecError, ContentCodec, ContentKey, KeyError, KeyResolver, SealedJsonCodec, SledKeyStore,
};
use crate::error::Error;
use crate::migration::{CheckpointError, MigrationEngine, SledCheckpointStore};
use crate::storage::{MedicalRecord, SledRecordStore, StorageConfig};
use sled::Db;
use std::sync::Arc;
use thiserror::Error as ThisError;
use tracing::info;

/// Vault-level errors.
#[derive(Debug, ThisError)]
pub enum VaultError {
    /// Storage error.
    #[error(transparent)]
    Storage(#[from] Error),

    /// Key error.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// Encryption error.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Checkpoint error.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

/// The sled-backed vault.
///
/// Owns the database and the concrete stores. Records are always written
/// encrypted under the owner's key.
pub struct Vault {
    db: Db,
    records: Arc<SledRecordStore>,
    checkpoints: Arc<SledCheckpointStore>,
    keys: Arc<SledKeyStore>,
    codec: Arc<SealedJsonCodec>,
}

impl Vault {
    /// Open or create a vault with the given configuration.
    pub fn open(config: StorageConfig) -> Result<Self, VaultError> {
        let db = config.to_sled_config().open().map_err(Error::from)?;
        let records = Arc::new(SledRecordStore::open(&db)?);
        let checkpoints = Arc::new(SledCheckpointStore::open(&db, records.clone())?);
        let keys = Arc::new(SledKeyStore::open(&db)?);

        if db.was_recovered() {
            let retained = checkpoints.list()?.len();
            info!(retained_checkpoints = retained, "Vault recovered from disk");
        }

        Ok(Self {
            db,
            records,
            checkpoints,
            keys,
            codec: Arc::new(SealedJsonCodec::new()),
        })
    }

    /// Get the underlying sled database.
    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Record store.
    pub fn records(&self) -> &Arc<SledRecordStore> {
        &self.records
    }

    /// Checkpoint store.
    pub fn checkpoints(&self) -> &Arc<SledCheckpointStore> {
        &self.checkpoints
    }

    /// Key store.
    pub fn keys(&self) -> &Arc<SledKeyStore> {
        &self.keys
    }

    /// Generate a key for a new owner, sealed under their primary key.
    pub fn enroll_owner(
        &self,
        owner_id: &[u8; 16],
        primary_key: &ContentKey,
    ) -> Result<(), VaultError> {
        self.keys.enroll(owner_id, primary_key)?;
        Ok(())
    }

    /// Encrypt and store new content for an owner.
    pub fn create_record(
        &self,
        owner_id: &[u8; 16],
        primary_key: &ContentKey,
        content: &RecordContent,
    ) -> Result<MedicalRecord, VaultError> {
        let key = self.keys.retrieve(owner_id, primary_key)?;
        let encrypted = self.codec.encrypt(content, &key)?;
        Ok(self.records.insert_new(owner_id, encrypted)?)
    }

    /// Fetch and decrypt a record.
    pub fn read_record(
        &self,
        owner_id: &[u8; 16],
        record_id: &[u8; 16],
        primary_key: &ContentKey,
    ) -> Result<Option<(MedicalRecord, RecordContent)>, VaultError> {
        let Some(record) = self.records.fetch(owner_id, record_id)? else {
            return Ok(None);
        };
        let key = self.keys.retrieve(owner_id, primary_key)?;
        let content = self.codec.decrypt(&record.encrypted_content, &key)?;
        Ok(Some((record, content)))
    }

    /// Build a migration engine over this vault's stores.
    pub fn migration_engine(&self) -> MigrationEngine {
        MigrationEngine::new(
            self.records.clone(),
            self.checkpoints.clone(),
            self.codec.clone(),
            self.keys.clone(),
        )
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), VaultError> {
        self.db.flush().map_err(Error::from)?;
        Ok(())
    }
}
