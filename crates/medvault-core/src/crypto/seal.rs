//! Authenticated sealing of byte payloads.
//!
//! Envelope layout: `[version (1)][nonce (24)][ciphertext + tag (16)]`.
//!
//! Payloads are sealed with XChaCha20-Poly1305 under a fresh random nonce.
//! The version byte and nonce are bound in as associated data.

use super::error::CodecError;
use super::key::ContentKey;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use zeroize::Zeroizing;

/// Current envelope version.
pub const ENVELOPE_VERSION: u8 = 2;

/// Nonce length in bytes.
pub const NONCE_LEN: usize = 24;

/// Authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

const HEADER_LEN: usize = 1 + NONCE_LEN;

/// Seal a payload under a key with a fresh random nonce.
pub fn seal(key: &ContentKey, plaintext: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    seal_with_nonce(key, &nonce, plaintext)
}

fn seal_with_nonce(
    key: &ContentKey,
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(HEADER_LEN + plaintext.len() + TAG_LEN);
    out.push(ENVELOPE_VERSION);
    out.extend_from_slice(nonce);

    let ciphertext = cipher(key)
        .encrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad: &out,
            },
        )
        .map_err(|_| CodecError::Encryption)?;

    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Verify and open a sealed payload.
///
/// The plaintext is wiped from memory when dropped.
pub fn open(key: &ContentKey, sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>, CodecError> {
    if sealed.len() < HEADER_LEN + TAG_LEN {
        return Err(CodecError::Malformed(format!(
            "envelope too short: {} bytes",
            sealed.len()
        )));
    }
    if sealed[0] != ENVELOPE_VERSION {
        return Err(CodecError::Malformed(format!(
            "unsupported envelope version {}",
            sealed[0]
        )));
    }

    let (header, ciphertext) = sealed.split_at(HEADER_LEN);
    let plaintext = cipher(key)
        .decrypt(
            XNonce::from_slice(&header[1..]),
            Payload {
                msg: ciphertext,
                aad: header,
            },
        )
        .map_err(|_| CodecError::Authentication)?;

    Ok(Zeroizing::new(plaintext))
}

fn cipher(key: &ContentKey) -> XChaCha20Poly1305 {
    XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()))
}
