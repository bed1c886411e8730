//! Record store implementation.

use super::key::RecordKey;
use super::MedicalRecord;
use crate::error::Error;
use sled::{Db, Tree};

/// Tree name for encrypted records.
pub const RECORDS_TREE: &str = "records";

/// Keyed storage for encrypted medical records.
///
/// Every call is independently durable; there is no multi-record
/// transaction at this level.
pub trait RecordStore: Send + Sync {
    /// Fetch every record belonging to an owner.
    fn fetch_all(&self, owner_id: &[u8; 16]) -> Result<Vec<MedicalRecord>, Error>;

    /// Insert or overwrite a record. Last writer wins.
    fn save(&self, record: &MedicalRecord) -> Result<(), Error>;
}

/// Record store backed by a sled tree.
pub struct SledRecordStore {
    tree: Tree,
}

impl SledRecordStore {
    /// Open or create the record tree in the given database.
    pub fn open(db: &Db) -> Result<Self, Error> {
        let tree = db.open_tree(RECORDS_TREE)?;
        Ok(Self { tree })
    }

    /// Fetch a single record.
    pub fn fetch(
        &self,
        owner_id: &[u8; 16],
        record_id: &[u8; 16],
    ) -> Result<Option<MedicalRecord>, Error> {
        let key = RecordKey::new(*owner_id, *record_id);
        match self.tree.get(key.encode())? {
            Some(bytes) => Ok(Some(MedicalRecord::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Create and store a new record for an owner.
    pub fn insert_new(
        &self,
        owner_id: &[u8; 16],
        encrypted_content: Vec<u8>,
    ) -> Result<MedicalRecord, Error> {
        let record = MedicalRecord::new(*owner_id, encrypted_content);
        self.save(&record)?;
        Ok(record)
    }

    /// Remove a record. Returns whether it existed.
    pub fn remove(&self, owner_id: &[u8; 16], record_id: &[u8; 16]) -> Result<bool, Error> {
        let key = RecordKey::new(*owner_id, *record_id);
        Ok(self.tree.remove(key.encode())?.is_some())
    }

    /// Count the records of an owner without decoding them.
    pub fn count(&self, owner_id: &[u8; 16]) -> Result<usize, Error> {
        let mut count = 0;
        for entry in self.tree.scan_prefix(RecordKey::owner_prefix(owner_id)) {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.tree.flush()?;
        Ok(())
    }
}

impl RecordStore for SledRecordStore {
    /// Records are returned oldest first, ties broken by id.
    fn fetch_all(&self, owner_id: &[u8; 16]) -> Result<Vec<MedicalRecord>, Error> {
        let mut records = Vec::new();
        for entry in self.tree.scan_prefix(RecordKey::owner_prefix(owner_id)) {
            let (key_bytes, value_bytes) = entry?;
            let key = RecordKey::decode(&key_bytes).ok_or(Error::InvalidKey)?;
            let record = MedicalRecord::from_bytes(&value_bytes)?;

            if record.id != key.record_id || record.owner_id != key.owner_id {
                return Err(Error::InvalidData(format!(
                    "record {} stored under mismatched key",
                    hex::encode(record.id)
                )));
            }
            records.push(record);
        }

        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    fn save(&self, record: &MedicalRecord) -> Result<(), Error> {
        let key = RecordKey::new(record.owner_id, record.id);
        self.tree.insert(key.encode(), record.to_bytes()?)?;
        Ok(())
    }
}
