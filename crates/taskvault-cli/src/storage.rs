use crate::config::{Config, KeySource, KEY_ENV};
use color_eyre::Result;
use taskvault_storage::{
    password_source::{EnvPasswordSource, KeyringPasswordSource, PasswordSource},
    EncryptedStorage,
};
use tracing::debug;

const KEYRING_SERVICE: &str = "taskvault";
const KEYRING_ACCOUNT: &str = "document-key";

/// Password source selected by `key_source`.
pub fn password_source(config: &Config) -> Box<dyn PasswordSource> {
    match config.key_source {
        KeySource::Env => Box::new(EnvPasswordSource::new(KEY_ENV)),
        KeySource::Keyring => Box::new(KeyringPasswordSource::new(KEYRING_SERVICE, KEYRING_ACCOUNT)),
    }
}

/// Build storage from config and run its startup checks.
pub fn store_from_config(config: &Config) -> Result<EncryptedStorage> {
    let password = password_source(config).password()?;
    open_with_password(config, password)
}

fn open_with_password(
    config: &Config,
    password: zeroize::Zeroizing<String>,
) -> Result<EncryptedStorage> {
    debug!(root = ?config.data_dir, "initializing encrypted storage");
    let storage = EncryptedStorage::new(&config.data_dir, password)?;
    storage.set_retention_days(config.retention_days)?;
    storage.initialize()?;
    Ok(storage)
}

/// Helper for tests to open storage rooted at a temp dir with a fixed password.
#[cfg(test)]
pub fn test_store(root: impl Into<std::path::PathBuf>) -> EncryptedStorage {
    let config = Config {
        data_dir: root.into(),
        ..Config::default()
    };
    open_with_password(&config, zeroize::Zeroizing::new("t".repeat(40))).expect("open test store")
}
