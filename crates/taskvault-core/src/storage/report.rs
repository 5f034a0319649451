use serde::Serialize;

/// Secondary failure that degraded an operation without failing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageWarning {
    /// Pre-write or pre-restore backup could not be taken.
    BackupFailed { reason: String },
    /// Retention sweep failed as a whole.
    PruneFailed { reason: String },
    /// A single expired backup could not be removed.
    BackupNotDeleted { name: String, reason: String },
}

impl std::fmt::Display for StorageWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageWarning::BackupFailed { reason } => write!(f, "backup failed: {reason}"),
            StorageWarning::PruneFailed { reason } => {
                write!(f, "failed to clean up old backups: {reason}")
            }
            StorageWarning::BackupNotDeleted { name, reason } => {
                write!(f, "could not delete expired backup {name}: {reason}")
            }
        }
    }
}

/// Outcome of a successful save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    /// Backup of the previous document, if one existed and was copied.
    pub backup: Option<String>,
    /// Backups removed by the retention sweep.
    pub pruned: Vec<String>,
    pub warnings: Vec<StorageWarning>,
}

impl SaveReport {
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Outcome of a successful restore.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub restored: String,
    /// Copy of the document that was replaced.
    pub safety_backup: Option<String>,
    pub warnings: Vec<StorageWarning>,
}

/// Result of a retention sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub deleted: Vec<String>,
    /// Expired backups that could not be removed, with the reason.
    pub failed: Vec<(String, String)>,
}

impl PruneReport {
    pub fn into_warnings(self) -> Vec<StorageWarning> {
        self.failed
            .into_iter()
            .map(|(name, reason)| StorageWarning::BackupNotDeleted { name, reason })
            .collect()
    }
}

/// Read-only diagnostic snapshot of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageInfo {
    pub data_file_exists: bool,
    pub retention_days: u32,
    pub backup_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,
}
