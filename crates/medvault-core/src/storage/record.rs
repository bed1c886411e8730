//! Medical record type for stored values.

use super::key::{current_timestamp, generate_id};
use crate::error::Error;
use rkyv::{Archive, Deserialize, Serialize};

/// A stored medical record.
///
/// The content is always held encrypted; only the migration engine and the
/// record views ever see the decrypted form, transiently.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct MedicalRecord {
    /// Record identifier.
    pub id: [u8; 16],

    /// Owning entity (family member) identifier.
    pub owner_id: [u8; 16],

    /// Encrypted record content.
    pub encrypted_content: Vec<u8>,

    /// Creation timestamp in microseconds since Unix epoch.
    pub created_at: u64,

    /// Last update timestamp in microseconds since Unix epoch.
    pub updated_at: u64,

    /// Monotonically incremented on every write.
    pub version: u64,

    /// Link to the record this one superseded, if any.
    pub previous_version_id: Option<[u8; 16]>,
}

impl MedicalRecord {
    /// Create a new record at version 1.
    pub fn new(owner_id: [u8; 16], encrypted_content: Vec<u8>) -> Self {
        let now = current_timestamp();
        Self {
            id: generate_id(),
            owner_id,
            encrypted_content,
            created_at: now,
            updated_at: now,
            version: 1,
            previous_version_id: None,
        }
    }

    /// Replace the content, bumping the version and refreshing `updated_at`.
    ///
    /// The record id and owner are never changed.
    pub fn revise(&mut self, encrypted_content: Vec<u8>) {
        self.encrypted_content = encrypted_content;
        self.version += 1;
        self.updated_at = current_timestamp().max(self.updated_at);
    }

    /// Serialize the record to bytes using rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a record from bytes using rkyv.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}
