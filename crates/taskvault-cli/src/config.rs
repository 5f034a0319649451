use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use color_eyre::{eyre::eyre, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use taskvault_storage::encrypted_storage::DEFAULT_RETENTION_DAYS;
use tracing::info;

/// Environment variable holding the document password.
pub const KEY_ENV: &str = "TASK_ENCRYPTION_KEY";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const RETENTION_ENV: &str = "BACKUP_RETENTION_DAYS";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
pub const KEY_SOURCE_ENV: &str = "TASKVAULT_KEY_SOURCE";

/// Effective configuration: defaults, then `~/.config/taskvault/config.toml`
/// (platform-specific), then environment variables.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Directory holding `tasks.enc`, `.lock` and `backups/`.
    pub data_dir: PathBuf,
    /// Backups older than this many days are pruned after each save.
    pub retention_days: u32,
    pub log_level: LogLevel,
    /// Where the document password comes from.
    pub key_source: KeySource,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            retention_days: DEFAULT_RETENTION_DAYS,
            log_level: LogLevel::default(),
            key_source: KeySource::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = color_eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(eyre!(
                "invalid {LOG_LEVEL_ENV} {other:?}, must be one of: debug, info, warn, error"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KeySource {
    /// `TASK_ENCRYPTION_KEY`
    #[default]
    Env,
    /// OS keychain; a password is generated on first use.
    Keyring,
}

impl FromStr for KeySource {
    type Err = color_eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "env" => Ok(KeySource::Env),
            "keyring" => Ok(KeySource::Keyring),
            other => Err(eyre!(
                "invalid {KEY_SOURCE_ENV} {other:?}, must be env or keyring"
            )),
        }
    }
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Env => f.write_str("env"),
            KeySource::Keyring => f.write_str("keyring"),
        }
    }
}

impl Config {
    /// Apply environment overrides through `lookup` and validate the result.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(dir) = lookup(DATA_DIR_ENV) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(days) = lookup(RETENTION_ENV) {
            self.retention_days = days
                .trim()
                .parse()
                .map_err(|_| eyre!("invalid {RETENTION_ENV} {days:?}, expected a whole number of days"))?;
        }
        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            self.log_level = level.parse()?;
        }
        if let Some(source) = lookup(KEY_SOURCE_ENV) {
            self.key_source = source.parse()?;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(eyre!("data directory cannot be empty"));
        }
        if self.retention_days < 1 {
            return Err(eyre!("backup retention days must be at least 1"));
        }
        Ok(())
    }

    /// Log the effective settings; the key itself is never printed.
    pub fn log_summary(&self) {
        info!(
            data_dir = %self.data_dir.display(),
            retention_days = self.retention_days,
            log_level = self.log_level.as_str(),
            key_source = %self.key_source,
            "configuration loaded (encryption key: [CONFIGURED])"
        );
    }
}

/// Load config from the default path and the process environment.
pub fn load() -> Result<Config> {
    let path = default_path()?;
    load_from_path(path)?.with_overrides(|key| std::env::var(key).ok())
}

/// Load config from a given path; if missing or empty, return defaults.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = toml::from_str(&contents)?;
    Ok(cfg)
}

/// Resolve the default config path (platform aware).
pub fn default_path() -> Result<PathBuf> {
    let base = config_dir().ok_or_else(|| eyre!("no config dir available"))?;
    Ok(base.join("taskvault").join("config.toml"))
}

/// Write the given config to the default path unless a file is already there.
pub fn write_default_if_missing(config: &Config) -> Result<PathBuf> {
    write_if_missing(config, &default_path()?)
}

fn write_if_missing(config: &Config, path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(path.to_path_buf())
}
