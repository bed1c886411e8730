//! Record content codec.

use super::error::CodecError;
use super::key::ContentKey;
use super::seal;
use crate::content::RecordContent;
use zeroize::Zeroizing;

/// Encrypts and decrypts record content under a caller-supplied key.
pub trait ContentCodec: Send + Sync {
    /// Serialize and encrypt content.
    fn encrypt(&self, content: &RecordContent, key: &ContentKey) -> Result<Vec<u8>, CodecError>;

    /// Decrypt and deserialize content.
    fn decrypt(&self, bytes: &[u8], key: &ContentKey) -> Result<RecordContent, CodecError>;
}

/// JSON content inside a sealed envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct SealedJsonCodec;

impl SealedJsonCodec {
    /// Create a new codec.
    pub fn new() -> Self {
        Self
    }
}

impl ContentCodec for SealedJsonCodec {
    fn encrypt(&self, content: &RecordContent, key: &ContentKey) -> Result<Vec<u8>, CodecError> {
        let json = serde_json::to_vec(content)
            .map(Zeroizing::new)
            .map_err(|e| CodecError::Serialization(e.to_string()))?;
        seal::seal(key, &json)
    }

    fn decrypt(&self, bytes: &[u8], key: &ContentKey) -> Result<RecordContent, CodecError> {
        let json = seal::open(key, bytes)?;
        serde_json::from_slice(&json).map_err(|e| CodecError::Serialization(e.to_string()))
    }
}
