//! Password-based authenticated encryption of opaque buffers.
//!
//! Blob layout is `salt(16) ‖ nonce(12) ‖ ciphertext ‖ tag(16)` with no
//! prefix or version byte. Every file written so far depends on these
//! constants; changing any of them makes existing data unreadable.

use std::fmt;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use taskvault_core::storage::CryptoError;
use zeroize::Zeroizing;

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const KEY_LEN: usize = 32;
pub const PBKDF2_ROUNDS: u32 = 100_000;

/// Smallest blob that can possibly decrypt (empty ciphertext plus tag).
pub const MIN_BLOB_LEN: usize = SALT_LEN + NONCE_LEN + TAG_LEN;

/// AES-256-GCM with a PBKDF2-HMAC-SHA256 key derived per blob.
pub struct CryptoService {
    password: Zeroizing<String>,
}

impl CryptoService {
    pub fn new(password: impl Into<Zeroizing<String>>) -> Self {
        Self {
            password: password.into(),
        }
    }

    /// Encrypt under a fresh salt and nonce; identical inputs never produce
    /// identical output.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if plaintext.is_empty() {
            return Err(CryptoError::EmptyInput);
        }

        let mut salt = [0u8; SALT_LEN];
        fill_random(&mut salt)?;
        let mut nonce = [0u8; NONCE_LEN];
        fill_random(&mut nonce)?;

        let cipher = self.cipher_for(&salt)?;
        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| CryptoError::Cipher {
                reason: format!("encrypt failed: {e}"),
            })?;

        let mut blob = Vec::with_capacity(SALT_LEN + NONCE_LEN + sealed.len());
        blob.extend_from_slice(&salt);
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&sealed);
        Ok(blob)
    }

    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if blob.len() < MIN_BLOB_LEN {
            return Err(CryptoError::MalformedInput { len: blob.len() });
        }

        let (salt, rest) = blob.split_at(SALT_LEN);
        let (nonce, sealed) = rest.split_at(NONCE_LEN);

        let cipher = self.cipher_for(salt)?;
        cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CryptoError::Authentication)
    }

    /// Check that `blob` opens under this password. Empty input passes.
    pub fn validate_password(&self, blob: &[u8]) -> Result<(), CryptoError> {
        if blob.is_empty() {
            return Ok(());
        }
        self.decrypt(blob).map(|plaintext| drop(Zeroizing::new(plaintext)))
    }

    fn cipher_for(&self, salt: &[u8]) -> Result<Aes256Gcm, CryptoError> {
        let key = self.derive_key(salt);
        Aes256Gcm::new_from_slice(&key[..]).map_err(|e| CryptoError::Cipher {
            reason: format!("cipher init failed: {e}"),
        })
    }

    fn derive_key(&self, salt: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        pbkdf2_hmac::<Sha256>(self.password.as_bytes(), salt, PBKDF2_ROUNDS, &mut key[..]);
        key
    }
}

impl fmt::Debug for CryptoService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoService")
            .field("password", &"[REDACTED]")
            .finish()
    }
}

fn fill_random(buf: &mut [u8]) -> Result<(), CryptoError> {
    OsRng.try_fill_bytes(buf).map_err(|e| CryptoError::Random {
        reason: e.to_string(),
    })
}
