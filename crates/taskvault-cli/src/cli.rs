use std::path::PathBuf;

use clap::{Parser, Subcommand};
use taskvault_storage::password_source::GENERATED_PASSWORD_CHARS;

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "taskvault",
    about = "Encrypted, backed-up storage for a task list document",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Check the key and directory layout, then print storage info.
    Init,
    /// Print the decrypted document.
    Load {
        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Encrypt and store a document, backing up the previous one.
    Save {
        /// Read from this file instead of stdin.
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Snapshot the current data file.
    Backup,
    /// List backup file names.
    Backups,
    /// Replace the data file with a named backup.
    Restore {
        /// Backup file name as shown by `backups`.
        name: String,
    },
    /// Delete backups older than the retention window.
    Prune,
    /// Print storage info as JSON.
    Info,
    /// Print a random password suitable for TASK_ENCRYPTION_KEY.
    GenKey {
        #[arg(short, long, default_value_t = GENERATED_PASSWORD_CHARS)]
        length: usize,
    },
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version and exit.
    Version,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}
