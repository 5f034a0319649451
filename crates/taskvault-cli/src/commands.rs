use std::{
    fs,
    io::{self, Read, Write},
    path::Path,
};

use color_eyre::{eyre::WrapErr, Result};
use taskvault_core::storage::{DocumentStore, RestoreReport, SaveReport};
use taskvault_storage::EncryptedStorage;

/// Write the decrypted document to `output`, or stdout when absent.
pub fn load(store: &dyn DocumentStore, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let mut file = fs::File::create(path)
                .wrap_err_with(|| format!("failed to create {}", path.display()))?;
            let written = load_into(store, &mut file)?;
            println!("Wrote {written} bytes to {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            load_into(store, &mut stdout)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

/// Save the document read from `input`, or stdin when absent.
pub fn save(store: &dyn DocumentStore, input: Option<&Path>) -> Result<()> {
    let report = match input {
        Some(path) => {
            let mut file = fs::File::open(path)
                .wrap_err_with(|| format!("failed to open {}", path.display()))?;
            save_from(store, &mut file)?
        }
        None => save_from(store, &mut io::stdin().lock())?,
    };
    for line in describe_save(&report) {
        println!("{line}");
    }
    Ok(())
}

pub fn load_into<S, W>(store: &S, out: &mut W) -> Result<usize>
where
    S: DocumentStore + ?Sized,
    W: Write,
{
    let document = store.load()?;
    out.write_all(&document)?;
    out.flush()?;
    Ok(document.len())
}

pub fn save_from<S, R>(store: &S, input: &mut R) -> Result<SaveReport>
where
    S: DocumentStore + ?Sized,
    R: Read,
{
    let mut document = Vec::new();
    input
        .read_to_end(&mut document)
        .wrap_err("failed to read document")?;
    Ok(store.save(&document)?)
}

pub fn backup(storage: &EncryptedStorage) -> Result<()> {
    let name = storage.create_manual_backup()?;
    println!("Created backup {name}");
    Ok(())
}

pub fn list_backups(storage: &EncryptedStorage) -> Result<()> {
    let backups = storage.list_backups()?;
    if backups.is_empty() {
        println!("No backups yet. Create one with `taskvault backup`.");
        return Ok(());
    }
    for name in backups {
        println!("{name}");
    }
    Ok(())
}

pub fn restore(storage: &EncryptedStorage, name: &str) -> Result<()> {
    let report = storage.restore_from_backup(name)?;
    for line in describe_restore(&report) {
        println!("{line}");
    }
    Ok(())
}

pub fn prune(storage: &EncryptedStorage) -> Result<()> {
    let report = storage.prune_backups()?;
    if report.deleted.is_empty() && report.failed.is_empty() {
        println!(
            "No backups older than {} days.",
            storage.retention_days()
        );
    }
    for name in &report.deleted {
        println!("Deleted {name}");
    }
    for warning in report.into_warnings() {
        println!("warning: {warning}");
    }
    Ok(())
}

pub fn info(storage: &EncryptedStorage) -> Result<()> {
    let rendered = serde_json::to_string_pretty(&storage.storage_info())?;
    println!("{rendered}");
    Ok(())
}

fn describe_save(report: &SaveReport) -> Vec<String> {
    let mut lines = vec!["Saved.".to_string()];
    if let Some(backup) = &report.backup {
        lines.push(format!("Previous version backed up as {backup}"));
    }
    if !report.pruned.is_empty() {
        lines.push(format!("Removed {} expired backup(s)", report.pruned.len()));
    }
    lines.extend(report.warnings.iter().map(|w| format!("warning: {w}")));
    lines
}

fn describe_restore(report: &RestoreReport) -> Vec<String> {
    let mut lines = vec![format!("Restored from {}", report.restored)];
    if let Some(safety) = &report.safety_backup {
        lines.push(format!("Replaced data saved as {safety}"));
    }
    lines.extend(report.warnings.iter().map(|w| format!("warning: {w}")));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage;
    use taskvault_core::storage::{InMemoryDocumentStore, StorageWarning};

    #[test]
    fn load_from_fresh_store_writes_empty_list() {
        let store = InMemoryDocumentStore::new();
        let mut out = Vec::new();
        let written = load_into(&store, &mut out).expect("load");
        assert_eq!(out, b"[]");
        assert_eq!(written, 2);
    }

    #[test]
    fn save_then_load_round_trips() {
        let store = InMemoryDocumentStore::new();
        let doc = br#"[{"id":1,"title":"water plants","done":false}]"#;

        save_from(&store, &mut &doc[..]).expect("save");
        let mut out = Vec::new();
        load_into(&store, &mut out).expect("load");
        assert_eq!(out, doc);
    }

    #[test]
    fn save_rejects_invalid_json() {
        let store = InMemoryDocumentStore::new();
        let err = save_from(&store, &mut &b"{not json"[..]).expect_err("invalid");
        assert!(err.to_string().contains("invalid"), "{err}");

        let mut out = Vec::new();
        load_into(&store, &mut out).expect("load");
        assert_eq!(out, b"[]");
    }

    #[test]
    fn works_through_trait_object() {
        let dir = tempfile::tempdir().expect("tempdir");
        let encrypted = storage::test_store(dir.path());
        let store: &dyn DocumentStore = &encrypted;

        save_from(store, &mut &b"[1,2,3]"[..]).expect("first save");
        let report = save_from(store, &mut &b"[4]"[..]).expect("second save");
        assert!(report.backup.is_some());

        let mut out = Vec::new();
        load_into(store, &mut out).expect("load");
        assert_eq!(out, b"[4]");
    }

    #[test]
    fn describes_degraded_save() {
        let report = SaveReport {
            backup: Some("tasks_backup_20240101_120000.enc".into()),
            pruned: vec!["old.enc".into()],
            warnings: vec![StorageWarning::PruneFailed {
                reason: "permission denied".into(),
            }],
        };
        let lines = describe_save(&report);
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("tasks_backup_20240101_120000.enc"));
        assert!(lines[3].starts_with("warning: failed to clean up old backups"));
    }

    #[test]
    fn describes_restore_without_safety_backup() {
        let report = RestoreReport {
            restored: "tasks_backup_20240101_120000.enc".into(),
            safety_backup: None,
            warnings: Vec::new(),
        };
        assert_eq!(
            describe_restore(&report),
            vec!["Restored from tasks_backup_20240101_120000.enc".to_string()]
        );
    }
}
