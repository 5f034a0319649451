//! Encrypted document persistence on local disk.
//! AES-256-GCM under a PBKDF2-derived key, `flock`-guarded read/modify/write,
//! atomic replacement and timestamped backups with a retention sweep.

pub mod crypto;
pub mod encrypted_storage;
pub mod file_manager;
pub mod password_source;

pub use encrypted_storage::EncryptedStorage;
