//! Per-owner key storage.

use super::error::KeyError;
use super::key::{ContentKey, KEY_LEN};
use super::seal;
use crate::error::Error;
use sled::{Db, Tree};
use zeroize::Zeroize;

/// Tree name for wrapped owner keys.
pub const KEYS_TREE: &str = "keys";

/// Resolves the content key governing an owner's records.
pub trait KeyResolver: Send + Sync {
    /// Retrieve the owner's key, unlocked with the caller's primary key.
    fn retrieve(
        &self,
        owner_id: &[u8; 16],
        primary_key: &ContentKey,
    ) -> Result<ContentKey, KeyError>;
}

/// Owner keys stored in sled, each sealed under the primary key.
pub struct SledKeyStore {
    tree: Tree,
}

impl SledKeyStore {
    /// Open or create the key tree.
    pub fn open(db: &Db) -> Result<Self, KeyError> {
        let tree = db.open_tree(KEYS_TREE).map_err(Error::from)?;
        Ok(Self { tree })
    }

    /// Generate and store a new key for an owner.
    ///
    /// Fails with `AlreadyEnrolled` rather than replacing an existing key,
    /// which would orphan every record encrypted under it.
    pub fn enroll(
        &self,
        owner_id: &[u8; 16],
        primary_key: &ContentKey,
    ) -> Result<ContentKey, KeyError> {
        let owner_key = ContentKey::generate();
        let wrapped = seal::seal(primary_key, owner_key.as_bytes()).map_err(KeyError::Sealing)?;

        let swapped = self
            .tree
            .compare_and_swap(owner_id, None::<&[u8]>, Some(wrapped))
            .map_err(Error::from)?;

        match swapped {
            Ok(()) => Ok(owner_key),
            Err(_) => Err(KeyError::AlreadyEnrolled {
                owner_id: *owner_id,
            }),
        }
    }

    /// Whether an owner has a key.
    pub fn is_enrolled(&self, owner_id: &[u8; 16]) -> Result<bool, KeyError> {
        Ok(self.tree.contains_key(owner_id).map_err(Error::from)?)
    }

    /// Remove an owner's key. Records encrypted under it become unreadable.
    pub fn revoke(&self, owner_id: &[u8; 16]) -> Result<bool, KeyError> {
        Ok(self.tree.remove(owner_id).map_err(Error::from)?.is_some())
    }
}

impl KeyResolver for SledKeyStore {
    fn retrieve(
        &self,
        owner_id: &[u8; 16],
        primary_key: &ContentKey,
    ) -> Result<ContentKey, KeyError> {
        let not_available = || KeyError::KeyNotAvailable {
            owner_id: *owner_id,
        };

        let wrapped = self
            .tree
            .get(owner_id)
            .map_err(Error::from)?
            .ok_or_else(not_available)?;

        let raw = seal::open(primary_key, &wrapped).map_err(|_| not_available())?;
        if raw.len() != KEY_LEN {
            return Err(not_available());
        }

        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&raw);
        let key = ContentKey::from_bytes(bytes);
        bytes.zeroize();
        Ok(key)
    }
}
