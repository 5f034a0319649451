//! Exclusive, crash-consistent file I/O inside one data directory.
//!
//! Layout: `data_dir/` holds the document and the `.lock` file,
//! `data_dir/backups/` holds timestamped copies. Nothing here knows what the
//! bytes mean.

use std::{
    cell::RefCell,
    ffi::OsStr,
    fs::{self, DirBuilder, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use taskvault_core::storage::{PruneReport, StoreError};
use tracing::{debug, warn};

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);
pub const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(10);
pub const LOCK_FILE_NAME: &str = ".lock";
pub const BACKUP_DIR_NAME: &str = "backups";
pub const BACKUP_EXTENSION: &str = "enc";

const TEMP_SUFFIX: &str = ".tmp";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub struct FileManager {
    data_dir: PathBuf,
    backup_dir: PathBuf,
    lock_timeout: Duration,
    held: ReentrantMutex<RefCell<HeldLock>>,
}

// Locked `.lock` handle plus the number of live guards on the owning thread.
#[derive(Default)]
struct HeldLock {
    file: Option<File>,
    depth: usize,
}

/// Exclusive access to the data directory. The OS lock is released when the
/// last live guard of the holding thread is dropped, in whatever order.
#[must_use = "the storage lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a> {
    held: ReentrantMutexGuard<'a, RefCell<HeldLock>>,
}

impl FileManager {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            backup_dir: data_dir.join(BACKUP_DIR_NAME),
            data_dir,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            held: ReentrantMutex::new(RefCell::new(HeldLock::default())),
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Acquire the directory lock, waiting at most the configured timeout.
    ///
    /// Re-entrant: a thread that already holds the lock through this manager
    /// gets a nested guard immediately. Other threads wait on the in-process
    /// mutex, other processes (and other managers) on the `flock`.
    pub fn lock(&self) -> Result<LockGuard<'_>, StoreError> {
        let started = Instant::now();
        let held = self
            .held
            .try_lock_for(self.lock_timeout)
            .ok_or_else(|| StoreError::LockTimeout {
                waited: started.elapsed(),
            })?;

        if held.borrow().file.is_some() {
            held.borrow_mut().depth += 1;
            return Ok(LockGuard { held });
        }

        self.ensure_dirs()?;
        let lock_path = self.data_dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| StoreError::io("failed to open lock file", e))?;

        loop {
            if os_lock::try_lock_exclusive(&file)
                .map_err(|e| StoreError::io("failed to acquire file lock", e))?
            {
                break;
            }
            if started.elapsed() >= self.lock_timeout {
                return Err(StoreError::LockTimeout {
                    waited: started.elapsed(),
                });
            }
            thread::sleep(LOCK_POLL_INTERVAL);
        }

        debug!(dir = %self.data_dir.display(), "storage lock acquired");
        *held.borrow_mut() = HeldLock {
            file: Some(file),
            depth: 1,
        };
        Ok(LockGuard { held })
    }

    pub fn read_file(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.data_dir.join(plain_name(name)?);
        read_existing(&path, name)
    }

    /// Replace `name` atomically: write `name.tmp`, then rename over `name`.
    pub fn write_file(&self, name: &str, data: &[u8]) -> Result<(), StoreError> {
        let path = self.data_dir.join(plain_name(name)?);
        self.ensure_dirs()?;
        write_atomic(&path, data)
    }

    pub fn read_backup(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.backup_dir.join(plain_name(name)?);
        read_existing(&path, name)
    }

    /// Copy `name` verbatim into `backups/` under a timestamped name.
    ///
    /// Two backups taken within the same second share a name; the later one
    /// replaces the earlier.
    pub fn create_backup(&self, name: &str) -> Result<String, StoreError> {
        let source = self.data_dir.join(plain_name(name)?);
        let data = match fs::read(&source) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::SourceMissing {
                    name: name.to_string(),
                })
            }
            Err(err) => return Err(StoreError::io("failed to read source file", err)),
        };

        let backup_name = backup_name_for(name, Local::now().naive_local());
        self.ensure_dirs()?;
        write_atomic(&self.backup_dir.join(&backup_name), &data)?;
        debug!(backup = %backup_name, "backup written");
        Ok(backup_name)
    }

    /// Backup file names, oldest first. Empty when no backup was ever taken.
    pub fn list_backups(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.backup_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::io("failed to read backup directory", err)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io("failed to read backup directory", e))?;
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if is_file && Path::new(name).extension() == Some(OsStr::new(BACKUP_EXTENSION)) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Remove backups last modified more than `retention_days` ago.
    ///
    /// Individual deletion failures are reported, never returned as errors.
    pub fn delete_old_backups(&self, retention_days: u32) -> Result<PruneReport, StoreError> {
        if retention_days == 0 {
            return Err(StoreError::InvalidArgument {
                reason: "retention days must be positive".to_string(),
            });
        }

        let cutoff = Utc::now() - chrono::Duration::days(i64::from(retention_days));
        let mut report = PruneReport::default();

        for name in self.list_backups()? {
            let path = self.backup_dir.join(&name);
            let modified = match fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(modified) => DateTime::<Utc>::from(modified),
                Err(err) => {
                    warn!(backup = %name, "failed to read backup age: {err}");
                    report.failed.push((name, err.to_string()));
                    continue;
                }
            };
            if modified >= cutoff {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => report.deleted.push(name),
                Err(err) => {
                    warn!(backup = %name, "failed to delete expired backup: {err}");
                    report.failed.push((name, err.to_string()));
                }
            }
        }

        if !report.deleted.is_empty() {
            debug!(count = report.deleted.len(), "expired backups removed");
        }
        Ok(report)
    }

    pub fn file_exists(&self, name: &str) -> bool {
        match plain_name(name) {
            Ok(name) => self.data_dir.join(name).exists(),
            Err(_) => false,
        }
    }

    pub fn file_size(&self, name: &str) -> Option<u64> {
        let name = plain_name(name).ok()?;
        fs::metadata(self.data_dir.join(name)).ok().map(|m| m.len())
    }

    /// Delete `*.tmp` leftovers of writes interrupted before their rename.
    pub fn remove_orphaned_temp_files(&self) -> Vec<String> {
        let mut removed = Vec::new();
        for dir in [&self.data_dir, &self.backup_dir] {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let file_name = entry.file_name();
                let Some(name) = file_name.to_str() else {
                    continue;
                };
                if !name.ends_with(TEMP_SUFFIX) || !entry.path().is_file() {
                    continue;
                }
                match fs::remove_file(entry.path()) {
                    Ok(()) => removed.push(name.to_string()),
                    Err(err) => warn!(file = %name, "failed to remove orphaned temp file: {err}"),
                }
            }
        }
        removed
    }

    fn ensure_dirs(&self) -> Result<(), StoreError> {
        create_private_dir(&self.data_dir)
            .map_err(|e| StoreError::io("failed to create data directory", e))?;
        create_private_dir(&self.backup_dir)
            .map_err(|e| StoreError::io("failed to create backup directory", e))
    }
}

impl std::fmt::Debug for FileManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileManager")
            .field("data_dir", &self.data_dir)
            .field("lock_timeout", &self.lock_timeout)
            .finish_non_exhaustive()
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.held.borrow_mut();
        held.depth = held.depth.saturating_sub(1);
        if held.depth > 0 {
            return;
        }
        if let Some(file) = held.file.take() {
            if let Err(err) = os_lock::unlock(&file) {
                warn!("failed to release file lock: {err}");
            }
            debug!("storage lock released");
        }
    }
}

impl std::fmt::Debug for LockGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("depth", &self.held.borrow().depth)
            .finish_non_exhaustive()
    }
}

/// `{stem}_backup_{YYYYMMDD_HHMMSS}.{ext}`
pub fn backup_name_for(name: &str, at: NaiveDateTime) -> String {
    let path = Path::new(name);
    let stem = path.file_stem().and_then(OsStr::to_str).unwrap_or(name);
    let ext = path
        .extension()
        .and_then(OsStr::to_str)
        .unwrap_or(BACKUP_EXTENSION);
    format!("{stem}_backup_{}.{ext}", at.format(BACKUP_TIMESTAMP_FORMAT))
}

fn plain_name(name: &str) -> Result<&str, StoreError> {
    let invalid = |reason: &str| StoreError::InvalidArgument {
        reason: format!("{reason}: {name:?}"),
    };
    if name.is_empty() {
        return Err(invalid("file name cannot be empty"));
    }
    if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
        return Err(invalid("file name must not contain path components"));
    }
    Ok(name)
}

fn read_existing(path: &Path, name: &str) -> Result<Vec<u8>, StoreError> {
    fs::read(path).map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound {
                name: name.to_string(),
            }
        } else {
            StoreError::io(format!("failed to read file {name}"), err)
        }
    })
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(TEMP_SUFFIX);
    let tmp = PathBuf::from(tmp);

    let result = write_private_file(&tmp, data)
        .map_err(|e| StoreError::io("failed to write temporary file", e))
        .and_then(|()| {
            fs::rename(&tmp, path).map_err(|e| StoreError::io("failed to rename temporary file", e))
        });
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_private_file(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()
}

fn create_private_dir(path: &Path) -> io::Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(path)
}

#[cfg(unix)]
mod os_lock {
    use std::{fs::File, io, os::unix::io::AsRawFd};

    /// Non-blocking exclusive `flock`; `Ok(false)` while another holder has it.
    pub fn try_lock_exclusive(file: &File) -> io::Result<bool> {
        let ret = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if ret == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => Ok(false),
            _ => Err(err),
        }
    }

    pub fn unlock(file: &File) -> io::Result<()> {
        let ret = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
        if ret == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

// Cross-process exclusion relies on `flock`; refuse rather than run unguarded.
#[cfg(not(unix))]
mod os_lock {
    use std::{fs::File, io};

    pub fn try_lock_exclusive(_file: &File) -> io::Result<bool> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "advisory file locks are not supported on this platform",
        ))
    }

    pub fn unlock(_file: &File) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::SystemTime};

    use chrono::NaiveDate;

    use super::*;

    fn aged_backup(fm: &FileManager, name: &str, age: Duration) {
        let path = fm.backup_dir().join(name);
        fs::write(&path, b"blob").expect("write backup");
        let file = File::options().write(true).open(&path).expect("open");
        file.set_modified(SystemTime::now() - age)
            .expect("set mtime");
    }

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    #[test]
    fn lock_creates_directory_layout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fm = FileManager::new(dir.path().join("data"));

        let guard = fm.lock().expect("lock");
        assert!(fm.data_dir().join(LOCK_FILE_NAME).exists());
        assert!(fm.backup_dir().is_dir());
        drop(guard);
    }

    #[test]
    fn lock_is_reentrant_for_the_holder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fm = FileManager::new(dir.path()).with_lock_timeout(Duration::from_millis(100));

        let outer = fm.lock().expect("outer");
        let inner = fm.lock().expect("inner");
        drop(inner);

        // still held by the outer guard
        let other = FileManager::new(dir.path()).with_lock_timeout(Duration::from_millis(50));
        assert!(matches!(other.lock(), Err(StoreError::LockTimeout { .. })));

        drop(outer);
        other.lock().map(drop).expect("released after outer guard");
    }

    #[test]
    fn lock_survives_out_of_order_guard_drops() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fm = FileManager::new(dir.path());
        let other = FileManager::new(dir.path()).with_lock_timeout(Duration::from_millis(50));

        let outer = fm.lock().expect("outer");
        let inner = fm.lock().expect("inner");
        drop(outer);

        let err = other.lock().map(drop).expect_err("inner guard still holds the lock");
        assert!(matches!(err, StoreError::LockTimeout { .. }));

        drop(inner);
        other.lock().map(drop).expect("released after last guard");
    }

    #[test]
    fn panicking_holder_releases_lock() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().to_path_buf();

        let outcome = thread::spawn(move || {
            let fm = FileManager::new(root);
            let _guard = fm.lock().expect("lock");
            panic!("holder failed mid-operation");
        })
        .join();
        assert!(outcome.is_err());

        let other = FileManager::new(dir.path()).with_lock_timeout(Duration::from_millis(50));
        other.lock().map(drop).expect("lock after holder panicked");
    }

    #[test]
    fn second_manager_times_out_while_lock_is_held() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = FileManager::new(dir.path());
        let second = FileManager::new(dir.path()).with_lock_timeout(Duration::from_millis(100));

        let guard = first.lock().expect("first lock");
        let started = Instant::now();
        let err = second.lock().expect_err("second lock must time out");
        assert!(matches!(err, StoreError::LockTimeout { .. }));
        assert!(started.elapsed() >= Duration::from_millis(100));

        drop(guard);
        second.lock().map(drop).expect("lock after release");
    }

    #[test]
    fn other_threads_wait_for_the_holder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fm = Arc::new(FileManager::new(dir.path()).with_lock_timeout(Duration::from_millis(50)));

        let guard = fm.lock().expect("lock");
        let contender = Arc::clone(&fm);
        let result = thread::spawn(move || contender.lock().map(drop))
            .join()
            .expect("join");
        assert!(matches!(result, Err(StoreError::LockTimeout { .. })));

        drop(guard);
        let contender = Arc::clone(&fm);
        thread::spawn(move || contender.lock().map(drop))
            .join()
            .expect("join")
            .expect("lock after release");
    }

    #[test]
    fn write_replaces_content_without_leaving_temp_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fm = FileManager::new(dir.path());

        fm.write_file("tasks.enc", b"first").expect("write");
        fm.write_file("tasks.enc", b"second").expect("overwrite");

        assert_eq!(fm.read_file("tasks.enc").expect("read"), b"second");
        assert!(!dir.path().join("tasks.enc.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn written_files_are_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let fm = FileManager::new(dir.path().join("data"));
        fm.write_file("tasks.enc", b"blob").expect("write");

        let file_mode = fs::metadata(fm.data_dir().join("tasks.enc"))
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(file_mode & 0o777, 0o600);
        let dir_mode = fs::metadata(fm.backup_dir())
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(dir_mode & 0o077, 0);
    }

    #[test]
    fn orphaned_temp_file_does_not_affect_current_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fm = FileManager::new(dir.path());
        fm.write_file("tasks.enc", b"committed").expect("write");

        // a writer that died between the temp write and the rename
        fs::write(dir.path().join("tasks.enc.tmp"), b"half-writ").expect("orphan");

        assert_eq!(fm.read_file("tasks.enc").expect("read"), b"committed");
        assert_eq!(fm.remove_orphaned_temp_files(), vec!["tasks.enc.tmp"]);
        assert!(!dir.path().join("tasks.enc.tmp").exists());
    }

    #[test]
    fn failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fm = FileManager::new(dir.path());
        // a non-empty directory cannot be replaced by a file
        fs::create_dir_all(dir.path().join("tasks.enc").join("child")).expect("dir");

        let err = fm.write_file("tasks.enc", b"data").expect_err("rename must fail");
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(!dir.path().join("tasks.enc.tmp").exists());
    }

    #[test]
    fn read_missing_file_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fm = FileManager::new(dir.path());

        let err = fm.read_file("tasks.enc").expect_err("missing");
        assert!(matches!(err, StoreError::NotFound { ref name } if name == "tasks.enc"));
        assert!(!fm.file_exists("tasks.enc"));
        assert_eq!(fm.file_size("tasks.enc"), None);
    }

    #[test]
    fn rejects_names_with_path_components() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fm = FileManager::new(dir.path());

        for name in ["", ".", "..", "../tasks.enc", "backups/x.enc", "a\\b"] {
            let err = fm.read_backup(name).expect_err("unsafe name");
            assert!(matches!(err, StoreError::InvalidArgument { .. }), "{name:?}");
            assert!(!fm.file_exists(name));
        }
    }

    #[test]
    fn backup_name_uses_stem_timestamp_and_extension() {
        let at = NaiveDate::from_ymd_opt(2026, 1, 2)
            .and_then(|d| d.and_hms_opt(3, 4, 5))
            .expect("valid timestamp");
        assert_eq!(
            backup_name_for("tasks.enc", at),
            "tasks_backup_20260102_030405.enc"
        );
        assert_eq!(backup_name_for("tasks", at), "tasks_backup_20260102_030405.enc");
    }

    #[test]
    fn create_backup_copies_bytes_verbatim() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fm = FileManager::new(dir.path());
        fm.write_file("tasks.enc", b"ciphertext").expect("write");

        let name = fm.create_backup("tasks.enc").expect("backup");
        assert!(name.starts_with("tasks_backup_"));
        assert!(name.ends_with(".enc"));
        assert_eq!(name.len(), "tasks_backup_YYYYMMDD_HHMMSS.enc".len());
        assert_eq!(fm.read_backup(&name).expect("read backup"), b"ciphertext");
        assert_eq!(fm.list_backups().expect("list"), vec![name]);
    }

    #[test]
    fn create_backup_requires_source() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fm = FileManager::new(dir.path());

        let err = fm.create_backup("tasks.enc").expect_err("no source");
        assert!(matches!(err, StoreError::SourceMissing { .. }));
    }

    #[test]
    fn list_backups_is_empty_without_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fm = FileManager::new(dir.path().join("never-created"));
        assert!(fm.list_backups().expect("list").is_empty());
    }

    #[test]
    fn list_backups_filters_and_sorts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fm = FileManager::new(dir.path());
        fm.lock().map(drop).expect("layout");

        for name in [
            "tasks_backup_20260301_000000.enc",
            "tasks_backup_20260101_000000.enc",
            "tasks_backup_20260201_000000.enc.tmp",
            "notes.txt",
        ] {
            fs::write(fm.backup_dir().join(name), b"x").expect("write");
        }
        fs::create_dir(fm.backup_dir().join("nested.enc")).expect("dir");

        assert_eq!(
            fm.list_backups().expect("list"),
            vec![
                "tasks_backup_20260101_000000.enc",
                "tasks_backup_20260301_000000.enc",
            ]
        );
    }

    #[test]
    fn delete_old_backups_keeps_recent_ones() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fm = FileManager::new(dir.path());
        fm.lock().map(drop).expect("layout");

        aged_backup(&fm, "tasks_backup_old.enc", 40 * DAY);
        aged_backup(&fm, "tasks_backup_recent.enc", 5 * DAY);

        let report = fm.delete_old_backups(30).expect("prune");
        assert_eq!(report.deleted, vec!["tasks_backup_old.enc"]);
        assert!(report.failed.is_empty());
        assert_eq!(
            fm.list_backups().expect("list"),
            vec!["tasks_backup_recent.enc"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn delete_old_backups_reports_unreadable_entries() {
        use std::os::unix::fs::PermissionsExt;

        // root ignores directory permissions
        if unsafe { libc::geteuid() } == 0 {
            return;
        }

        let dir = tempfile::tempdir().expect("tempdir");
        let fm = FileManager::new(dir.path());
        fm.lock().map(drop).expect("layout");
        aged_backup(&fm, "tasks_backup_old.enc", 40 * DAY);

        // listable but not searchable: names are visible, metadata is not
        fs::set_permissions(fm.backup_dir(), fs::Permissions::from_mode(0o400))
            .expect("chmod");
        let report = fm.delete_old_backups(30);
        fs::set_permissions(fm.backup_dir(), fs::Permissions::from_mode(0o700))
            .expect("restore mode");

        let report = report.expect("prune");
        assert!(report.deleted.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "tasks_backup_old.enc");
    }

    #[cfg(not(unix))]
    #[test]
    fn lock_is_refused_without_advisory_locks() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fm = FileManager::new(dir.path());

        let err = fm.lock().map(drop).expect_err("no cross-process lock available");
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn delete_old_backups_rejects_zero_days() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fm = FileManager::new(dir.path());

        let err = fm.delete_old_backups(0).expect_err("zero days");
        assert!(matches!(err, StoreError::InvalidArgument { .. }));
    }
}
