use std::{io, time::Duration};

use thiserror::Error;

/// Failures of the authenticated encryption layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("plaintext cannot be empty")]
    EmptyInput,
    #[error("encrypted data too short: {len} bytes")]
    MalformedInput { len: usize },
    /// Tag verification failed. Wrong password and tampered data look the same.
    #[error("decryption failed: invalid data or wrong password")]
    Authentication,
    #[error("cipher failure: {reason}")]
    Cipher { reason: String },
    #[error("random generator failure: {reason}")]
    Random { reason: String },
}

/// Errors produced by document store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Payload rejected before any I/O took place.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },
    #[error("encryption password must be at least {min} characters (got {actual})")]
    WeakPassword { min: usize, actual: usize },
    #[error("timed out after {waited:?} acquiring storage lock")]
    LockTimeout { waited: Duration },
    #[error("file not found: {name}")]
    NotFound { name: String },
    #[error("source file does not exist: {name}")]
    SourceMissing { name: String },
    #[error("no data file exists to back up")]
    NoData,
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("backup {name} is corrupted or encrypted with a different key")]
    Integrity { name: String },
    #[error("encryption self-test failed: {reason}")]
    SelfTest { reason: String },
    #[error("configured key cannot decrypt the existing data file")]
    WrongKey,
}

impl StoreError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        StoreError::Io {
            context: context.into(),
            source,
        }
    }

    /// True when the failure came from AEAD tag verification.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            StoreError::Crypto(CryptoError::Authentication)
                | StoreError::Integrity { .. }
                | StoreError::WrongKey
        )
    }
}
