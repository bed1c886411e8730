//! Encryption for record content and per-owner keys.
//!
//! Record bodies are serialized to JSON and sealed with an authenticated
//! envelope. Each owner has its own content key, itself stored sealed under
//! the caller's primary key.

mod codec;
mod error;
mod key;
mod keystore;

pub mod seal;

pub use codec::{ContentCodec, SealedJsonCodec};
pub use error::{CodecError, KeyError};
pub use key::{ContentKey, KEY_LEN};
pub use keystore::{KeyResolver, SledKeyStore, KEYS_TREE};
