//! Encryption and key management errors.

use thiserror::Error;

/// Content codec errors.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The authentication tag did not verify: wrong key or tampered data.
    #[error("authentication failed: wrong key or corrupted data")]
    Authentication,

    /// The envelope is truncated or of an unknown version.
    #[error("malformed envelope: {0}")]
    Malformed(String),

    /// Content could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The cipher refused to seal the payload.
    #[error("encryption failed")]
    Encryption,
}

impl CodecError {
    /// Whether this is a bad-key / corrupt-data condition rather than a
    /// serialization failure.
    pub fn is_bad_key_or_corrupt(&self) -> bool {
        matches!(self, CodecError::Authentication | CodecError::Malformed(_))
    }
}

/// Key resolution errors.
#[derive(Debug, Error)]
pub enum KeyError {
    /// No usable key exists for the owner under the supplied primary key.
    #[error("key not available for owner {owner_id:02x?}")]
    KeyNotAvailable {
        /// The owner whose key was requested.
        owner_id: [u8; 16],
    },

    /// A key is already enrolled for this owner.
    #[error("key already enrolled for owner {owner_id:02x?}")]
    AlreadyEnrolled {
        /// The owner that already has a key.
        owner_id: [u8; 16],
    },

    /// A new owner key could not be sealed.
    #[error("failed to seal owner key: {0}")]
    Sealing(#[source] CodecError),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] crate::error::Error),
}
