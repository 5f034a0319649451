use std::{
    path::PathBuf,
    sync::atomic::{AtomicU32, Ordering},
    time::Duration,
};

use taskvault_core::storage::{
    DocumentFormat, DocumentStore, JsonFormat, PruneReport, RestoreReport, SaveReport,
    StorageInfo, StorageWarning, StoreError,
};
use tracing::{debug, info, instrument, warn};
use zeroize::Zeroizing;

use crate::{
    crypto::CryptoService,
    file_manager::FileManager,
    password_source::{check_strength, PasswordError},
};

pub const DATA_FILE: &str = "tasks.enc";
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

const SELF_TEST_PLAINTEXT: &[u8] = br#"{"test": true}"#;

/// Encrypted, locked and backed-up store for a single document.
///
/// Every operation holds the directory lock for its whole duration, so loads,
/// saves, backups and restores observe a single total order across threads
/// and processes.
pub struct EncryptedStorage<F: DocumentFormat = JsonFormat> {
    files: FileManager,
    crypto: CryptoService,
    format: F,
    retention_days: AtomicU32,
}

impl EncryptedStorage {
    /// Open the store in `data_dir`. Passwords shorter than 32 characters are
    /// rejected before anything touches the disk.
    pub fn new(
        data_dir: impl Into<PathBuf>,
        password: impl Into<Zeroizing<String>>,
    ) -> Result<Self, StoreError> {
        let password = password.into();
        check_strength(&password).map_err(|err| match err {
            PasswordError::TooShort { min, actual } => StoreError::WeakPassword { min, actual },
            other => StoreError::InvalidArgument {
                reason: other.to_string(),
            },
        })?;

        Ok(Self {
            files: FileManager::new(data_dir),
            crypto: CryptoService::new(password),
            format: JsonFormat,
            retention_days: AtomicU32::new(DEFAULT_RETENTION_DAYS),
        })
    }
}

impl<F: DocumentFormat> EncryptedStorage<F> {
    pub fn with_format<G: DocumentFormat>(self, format: G) -> EncryptedStorage<G> {
        EncryptedStorage {
            files: self.files,
            crypto: self.crypto,
            format,
            retention_days: self.retention_days,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.files = self.files.with_lock_timeout(timeout);
        self
    }

    /// Builder form of [`set_retention_days`](Self::set_retention_days).
    pub fn with_retention_days(self, days: u32) -> Result<Self, StoreError> {
        self.set_retention_days(days)?;
        Ok(self)
    }

    pub fn retention_days(&self) -> u32 {
        self.retention_days.load(Ordering::Relaxed)
    }

    pub fn set_retention_days(&self, days: u32) -> Result<(), StoreError> {
        if days == 0 {
            return Err(StoreError::InvalidArgument {
                reason: "retention days must be at least 1".to_string(),
            });
        }
        self.retention_days.store(days, Ordering::Relaxed);
        Ok(())
    }

    /// Decrypted document, or the format's empty document before the first save.
    #[instrument(skip_all)]
    pub fn load_data(&self) -> Result<Vec<u8>, StoreError> {
        let _lock = self.files.lock()?;

        let blob = match self.files.read_file(DATA_FILE) {
            Ok(blob) => blob,
            Err(StoreError::NotFound { .. }) => {
                debug!("no data file yet, returning empty document");
                return Ok(self.format.empty_document().to_vec());
            }
            Err(err) => return Err(err),
        };
        Ok(self.crypto.decrypt(&blob)?)
    }

    /// Replace the document.
    ///
    /// The previous document is backed up first and expired backups are
    /// pruned afterwards; failures of either only add warnings to the report.
    #[instrument(skip_all, fields(len = document.len()))]
    pub fn save_data(&self, document: &[u8]) -> Result<SaveReport, StoreError> {
        if document.is_empty() {
            return Err(StoreError::InvalidInput {
                reason: "data cannot be empty".to_string(),
            });
        }
        self.format
            .validate(document)
            .map_err(|reason| StoreError::InvalidInput { reason })?;

        let _lock = self.files.lock()?;
        let mut report = SaveReport::default();

        if self.files.file_exists(DATA_FILE) {
            match self.files.create_backup(DATA_FILE) {
                Ok(name) => {
                    info!(backup = %name, "created backup");
                    report.backup = Some(name);
                }
                Err(err) => {
                    warn!("failed to create backup: {err}");
                    report.warnings.push(StorageWarning::BackupFailed {
                        reason: err.to_string(),
                    });
                }
            }
        }

        let blob = self.crypto.encrypt(document)?;
        self.files.write_file(DATA_FILE, &blob)?;

        match self.files.delete_old_backups(self.retention_days()) {
            Ok(mut pruned) => {
                report.pruned = std::mem::take(&mut pruned.deleted);
                report.warnings.extend(pruned.into_warnings());
            }
            Err(err) => {
                warn!("failed to clean up old backups: {err}");
                report.warnings.push(StorageWarning::PruneFailed {
                    reason: err.to_string(),
                });
            }
        }

        Ok(report)
    }

    #[instrument(skip_all)]
    pub fn create_manual_backup(&self) -> Result<String, StoreError> {
        let _lock = self.files.lock()?;

        if !self.files.file_exists(DATA_FILE) {
            return Err(StoreError::NoData);
        }
        let name = self.files.create_backup(DATA_FILE)?;
        info!(backup = %name, "created manual backup");
        Ok(name)
    }

    pub fn list_backups(&self) -> Result<Vec<String>, StoreError> {
        self.files.list_backups()
    }

    /// Make a backup's blob the live document again.
    ///
    /// The backup must decrypt under the current password; nothing is changed
    /// otherwise. The blob is copied as-is, not re-encrypted.
    #[instrument(skip_all, fields(backup = %name))]
    pub fn restore_from_backup(&self, name: &str) -> Result<RestoreReport, StoreError> {
        if name.is_empty() {
            return Err(StoreError::InvalidArgument {
                reason: "backup name cannot be empty".to_string(),
            });
        }

        let _lock = self.files.lock()?;
        let blob = self.files.read_backup(name)?;

        if let Err(err) = self.crypto.decrypt(&blob).map(Zeroizing::new) {
            warn!("refusing to restore unreadable backup: {err}");
            return Err(StoreError::Integrity {
                name: name.to_string(),
            });
        }

        let mut report = RestoreReport {
            restored: name.to_string(),
            ..RestoreReport::default()
        };
        if self.files.file_exists(DATA_FILE) {
            match self.files.create_backup(DATA_FILE) {
                Ok(safety) => {
                    info!(backup = %safety, "created backup of current data");
                    report.safety_backup = Some(safety);
                }
                Err(err) => {
                    warn!("failed to backup current data: {err}");
                    report.warnings.push(StorageWarning::BackupFailed {
                        reason: err.to_string(),
                    });
                }
            }
        }

        self.files.write_file(DATA_FILE, &blob)?;
        info!("restored data file from backup");
        Ok(report)
    }

    /// Check that the configured password opens the current data file.
    pub fn validate_encryption_key(&self) -> Result<(), StoreError> {
        let _lock = self.files.lock()?;

        match self.files.read_file(DATA_FILE) {
            Ok(blob) => Ok(self.crypto.validate_password(&blob)?),
            Err(StoreError::NotFound { .. }) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Startup check: clear interrupted writes, prove the cipher round-trips,
    /// and prove the password opens existing data.
    #[instrument(skip_all)]
    pub fn initialize(&self) -> Result<(), StoreError> {
        let _lock = self.files.lock()?;

        let removed = self.files.remove_orphaned_temp_files();
        if !removed.is_empty() {
            warn!(files = ?removed, "removed temp files left by interrupted writes");
        }

        self.self_test()?;

        match self.validate_encryption_key() {
            Ok(()) => {
                debug!("storage initialized");
                Ok(())
            }
            Err(StoreError::Crypto(err)) => {
                warn!("encryption key validation failed: {err}");
                Err(StoreError::WrongKey)
            }
            Err(err) => Err(err),
        }
    }

    /// Diagnostic snapshot. Takes no lock and never writes.
    pub fn storage_info(&self) -> StorageInfo {
        let (backup_count, backup_error) = match self.files.list_backups() {
            Ok(backups) => (backups.len(), None),
            Err(err) => (0, Some(err.to_string())),
        };

        StorageInfo {
            data_file_exists: self.files.file_exists(DATA_FILE),
            retention_days: self.retention_days(),
            backup_count,
            backup_error,
            file_size_bytes: self.files.file_size(DATA_FILE),
        }
    }

    /// Run a retention sweep outside of a save.
    pub fn prune_backups(&self) -> Result<PruneReport, StoreError> {
        let _lock = self.files.lock()?;
        self.files.delete_old_backups(self.retention_days())
    }

    fn self_test(&self) -> Result<(), StoreError> {
        let sealed = self
            .crypto
            .encrypt(SELF_TEST_PLAINTEXT)
            .map_err(|e| StoreError::SelfTest {
                reason: format!("failed to test encryption: {e}"),
            })?;
        let opened = self
            .crypto
            .decrypt(&sealed)
            .map_err(|e| StoreError::SelfTest {
                reason: format!("failed to test decryption: {e}"),
            })?;

        if opened != SELF_TEST_PLAINTEXT {
            return Err(StoreError::SelfTest {
                reason: "decrypted test data does not match".to_string(),
            });
        }
        Ok(())
    }
}

impl<F: DocumentFormat> DocumentStore for EncryptedStorage<F> {
    fn load(&self) -> Result<Vec<u8>, StoreError> {
        self.load_data()
    }

    fn save(&self, document: &[u8]) -> Result<SaveReport, StoreError> {
        self.save_data(document)
    }
}

impl<F: DocumentFormat> std::fmt::Debug for EncryptedStorage<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedStorage")
            .field("files", &self.files)
            .field("format", &self.format.name())
            .field("retention_days", &self.retention_days())
            .finish_non_exhaustive()
    }
}
