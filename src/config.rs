//! Client configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::{AppError, Result};

/// Keyring service under which device passwords are stored.
pub const KEYRING_SERVICE: &str = "tr64c-session";

/// Environment variable consulted when the keyring has no password.
pub const PASSWORD_ENV: &str = "TR64C_PASSWORD";

/// Grace period `Session::close` gives the child to honour `exit`.
pub const DEFAULT_CLOSE_GRACE: Duration = Duration::from_secs(2);

fn default_timeout_ms() -> u64 {
    1000
}

/// Client configuration parsed from a TOML file.
///
/// The password is never read from the file; see [`ClientConfig::load_credentials`].
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ClientConfig {
    /// Path to the `tr64c` executable.
    pub executable: PathBuf,
    /// Network timeout handed to `tr64c` via `-t`, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Additional `-v` flags for interactive sessions.
    #[serde(default)]
    pub verbose: u8,
    /// Action description cache file passed via `-c`.
    #[serde(default)]
    pub cache: Option<PathBuf>,
    /// Device user name passed via `-u`.
    #[serde(default)]
    pub user: Option<String>,
    /// Upper bound for one request/response exchange; 0 means no bound.
    #[serde(default)]
    pub read_timeout_seconds: u64,
    /// Device password (populated at runtime).
    #[serde(skip)]
    pub password: Option<String>,
}

impl ClientConfig {
    /// Configuration with defaults for everything but the executable.
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            timeout_ms: default_timeout_ms(),
            verbose: 0,
            cache: None,
            user: None,
            read_timeout_seconds: 0,
            password: None,
        }
    }

    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read, contains
    /// invalid TOML, or fails validation.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the device password from the OS keychain with env-var fallback.
    ///
    /// The keyring account is the configured user name, or `default` when no
    /// user is configured. A missing password is not an error; devices
    /// without authentication only accept unauthenticated actions.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the keychain lookup task panics.
    pub async fn load_credentials(&mut self) -> Result<()> {
        let account = self.user.clone().unwrap_or_else(|| "default".into());
        self.password = load_password(&account).await?;
        Ok(())
    }

    /// Per-exchange timeout, `None` when unbounded.
    #[must_use]
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_seconds > 0).then(|| Duration::from_secs(self.read_timeout_seconds))
    }

    /// Session settings for `host` derived from this configuration.
    #[must_use]
    pub fn session(&self, host: impl Into<String>) -> SessionConfig {
        SessionConfig {
            executable: self.executable.clone(),
            host: host.into(),
            timeout_ms: self.timeout_ms,
            user: self.user.clone(),
            password: self.password.clone(),
            cache: self.cache.clone(),
            verbose: self.verbose,
            read_timeout: self.read_timeout(),
            close_grace: DEFAULT_CLOSE_GRACE,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.executable.as_os_str().is_empty() {
            return Err(AppError::Config("executable must not be empty".into()));
        }

        if self.timeout_ms == 0 {
            return Err(AppError::Config(
                "timeout_ms must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("executable", &self.executable)
            .field("timeout_ms", &self.timeout_ms)
            .field("verbose", &self.verbose)
            .field("cache", &self.cache)
            .field("user", &self.user)
            .field("read_timeout_seconds", &self.read_timeout_seconds)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}

/// Settings for one interactive session against one device.
#[derive(Clone)]
pub struct SessionConfig {
    /// Path to the `tr64c` executable.
    pub executable: PathBuf,
    /// Device URL or host passed via `-o`.
    pub host: String,
    /// Network timeout handed to `tr64c`, in milliseconds.
    pub timeout_ms: u64,
    /// Optional user name.
    pub user: Option<String>,
    /// Optional password.
    pub password: Option<String>,
    /// Optional action description cache file.
    pub cache: Option<PathBuf>,
    /// Additional `-v` flags.
    pub verbose: u8,
    /// Upper bound for one exchange.
    pub read_timeout: Option<Duration>,
    /// How long `close` waits for the child after sending `exit`.
    pub close_grace: Duration,
}

impl SessionConfig {
    /// Defaults for `host` using `executable`.
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>, host: impl Into<String>) -> Self {
        ClientConfig::new(executable).session(host)
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("executable", &self.executable)
            .field("host", &self.host)
            .field("timeout_ms", &self.timeout_ms)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("cache", &self.cache)
            .field("verbose", &self.verbose)
            .field("read_timeout", &self.read_timeout)
            .field("close_grace", &self.close_grace)
            .finish()
    }
}

/// Load a password from the OS keychain, falling back to [`PASSWORD_ENV`].
async fn load_password(account: &str) -> Result<Option<String>> {
    let key = account.to_owned();

    // keyring is synchronous I/O.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(Some(value)),
        Ok(_) => {
            warn!(account, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            debug!(account, ?err, "keychain lookup failed, trying env var");
        }
    }

    match env::var(PASSWORD_ENV) {
        Ok(value) if !value.is_empty() => Ok(Some(value)),
        _ => {
            debug!(account, "no device password configured");
            Ok(None)
        }
    }
}
