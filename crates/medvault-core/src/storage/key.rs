//! Record key encoding and identifier helpers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Size of an identifier in bytes.
pub const ID_SIZE: usize = 16;

/// Total record key size.
pub const KEY_SIZE: usize = ID_SIZE * 2;

/// A record key combining owner ID and record ID.
///
/// Key format: `[owner_id (16 bytes)][record_id (16 bytes)]`
///
/// Grouping by owner first lets a prefix scan return every record belonging
/// to one owner.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordKey {
    /// Owning entity (e.g. a family member profile).
    pub owner_id: [u8; ID_SIZE],

    /// Record identifier.
    pub record_id: [u8; ID_SIZE],
}

impl RecordKey {
    /// Create a new record key.
    pub fn new(owner_id: [u8; ID_SIZE], record_id: [u8; ID_SIZE]) -> Self {
        Self {
            owner_id,
            record_id,
        }
    }

    /// Encode the key to bytes.
    pub fn encode(&self) -> [u8; KEY_SIZE] {
        let mut buf = [0u8; KEY_SIZE];
        buf[..ID_SIZE].copy_from_slice(&self.owner_id);
        buf[ID_SIZE..].copy_from_slice(&self.record_id);
        buf
    }

    /// Decode a key from bytes.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != KEY_SIZE {
            return None;
        }

        let mut owner_id = [0u8; ID_SIZE];
        owner_id.copy_from_slice(&bytes[..ID_SIZE]);

        let mut record_id = [0u8; ID_SIZE];
        record_id.copy_from_slice(&bytes[ID_SIZE..]);

        Some(Self {
            owner_id,
            record_id,
        })
    }

    /// Get the prefix for scanning all records of an owner.
    pub fn owner_prefix(owner_id: &[u8; ID_SIZE]) -> [u8; ID_SIZE] {
        *owner_id
    }
}

impl fmt::Debug for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordKey")
            .field("owner_id", &hex::encode(self.owner_id))
            .field("record_id", &hex::encode(self.record_id))
            .finish()
    }
}

/// Get current timestamp in microseconds since Unix epoch.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Generate a new unique identifier.
///
/// The first eight bytes are a big-endian nanosecond timestamp, the rest a
/// process-wide counter mixed with random bits, so ids stay unique even when
/// generated within the same clock tick.
pub fn generate_id() -> [u8; ID_SIZE] {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let counter = COUNTER.fetch_add(1, Ordering::SeqCst);
    let salt: u32 = rand::random();

    let mut id = [0u8; ID_SIZE];
    id[..8].copy_from_slice(&now.to_be_bytes());
    id[8..12].copy_from_slice(&(counter as u32).to_be_bytes());
    id[12..].copy_from_slice(&salt.to_be_bytes());
    id
}
