//! Symmetric key material.

use rand::RngCore;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of a content key in bytes.
pub const KEY_LEN: usize = 32;

/// A 256-bit symmetric key.
///
/// Never printed: `Debug` is redacted. Wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ContentKey([u8; KEY_LEN]);

impl ContentKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Derive a key from arbitrary secret material with a fixed context.
    pub fn derive(context: &str, material: &[u8]) -> Self {
        Self(blake3::derive_key(context, material))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentKey(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_random() {
        assert_ne!(ContentKey::generate(), ContentKey::generate());
    }

    #[test]
    fn test_derive_is_deterministic() {
        let a = ContentKey::derive("medvault test", b"secret");
        let b = ContentKey::derive("medvault test", b"secret");
        let c = ContentKey::derive("medvault other", b"secret");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_zeroize_clears_bytes() {
        let mut key = ContentKey::from_bytes([0x5a; KEY_LEN]);
        key.zeroize();
        assert_eq!(key.as_bytes(), &[0u8; KEY_LEN]);
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = ContentKey::from_bytes([0x41; KEY_LEN]);
        let printed = format!("{:?}", key);
        assert!(!printed.contains("41"));
        assert!(printed.contains("redacted"));
    }
}
