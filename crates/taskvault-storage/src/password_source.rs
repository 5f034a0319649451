use rand::{rngs::OsRng, Rng};
use thiserror::Error;
use zeroize::Zeroizing;

/// Shortest password the store accepts.
pub const MIN_PASSWORD_CHARS: usize = 32;

/// Length of passwords generated for the keyring.
pub const GENERATED_PASSWORD_CHARS: usize = 48;

const PASSWORD_CHARSET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PasswordError {
    #[error("{var} environment variable is required")]
    Missing { var: String },
    #[error("encryption key must be at least {min} characters long (got {actual})")]
    TooShort { min: usize, actual: usize },
    #[error("keyring error: {0}")]
    Keyring(String),
}

/// Provides the document password (environment in services, OS keychain on
/// workstations, fixed value in tests).
pub trait PasswordSource: Send + Sync {
    fn password(&self) -> Result<Zeroizing<String>, PasswordError>;
}

/// Reads the password from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvPasswordSource {
    var: String,
}

impl EnvPasswordSource {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl PasswordSource for EnvPasswordSource {
    fn password(&self) -> Result<Zeroizing<String>, PasswordError> {
        let value = Zeroizing::new(std::env::var(&self.var).unwrap_or_default());
        if value.is_empty() {
            return Err(PasswordError::Missing {
                var: self.var.clone(),
            });
        }
        check_strength(&value)?;
        Ok(value)
    }
}

/// OS keyring-backed source. Generates and stores a password on first use.
pub struct KeyringPasswordSource {
    service: String,
    account: String,
}

impl KeyringPasswordSource {
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }
}

impl PasswordSource for KeyringPasswordSource {
    fn password(&self) -> Result<Zeroizing<String>, PasswordError> {
        let entry = keyring::Entry::new(&self.service, &self.account)
            .map_err(|e| PasswordError::Keyring(e.to_string()))?;

        match entry.get_password() {
            Ok(existing) => {
                let existing = Zeroizing::new(existing);
                check_strength(&existing)?;
                Ok(existing)
            }
            Err(keyring::Error::NoEntry) => {
                let generated = generate_password(GENERATED_PASSWORD_CHARS);
                entry
                    .set_password(&generated)
                    .map_err(|e| PasswordError::Keyring(e.to_string()))?;
                Ok(generated)
            }
            Err(err) => Err(PasswordError::Keyring(err.to_string())),
        }
    }
}

/// Fixed password for tests and ephemeral sessions.
#[derive(Clone)]
pub struct StaticPasswordSource {
    password: Zeroizing<String>,
}

impl StaticPasswordSource {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: Zeroizing::new(password.into()),
        }
    }
}

impl PasswordSource for StaticPasswordSource {
    fn password(&self) -> Result<Zeroizing<String>, PasswordError> {
        check_strength(&self.password)?;
        Ok(self.password.clone())
    }
}

/// Reject passwords shorter than [`MIN_PASSWORD_CHARS`] characters.
pub fn check_strength(password: &str) -> Result<(), PasswordError> {
    let actual = password.chars().count();
    if actual < MIN_PASSWORD_CHARS {
        return Err(PasswordError::TooShort {
            min: MIN_PASSWORD_CHARS,
            actual,
        });
    }
    Ok(())
}

/// Random password drawn from the OS generator; never shorter than
/// [`MIN_PASSWORD_CHARS`].
pub fn generate_password(length: usize) -> Zeroizing<String> {
    let length = length.max(MIN_PASSWORD_CHARS);
    let mut rng = OsRng;
    let password = (0..length)
        .map(|_| char::from(PASSWORD_CHARSET[rng.gen_range(0..PASSWORD_CHARSET.len())]))
        .collect();
    Zeroizing::new(password)
}
