//! Configuration for the modx tools.
//!
//! Settings live in `~/.modx/config.toml` unless `MODX_CONFIG_PATH` points
//! elsewhere. The site list and the credential file default to siblings of
//! the config file:
//!
//! ```text
//! ~/.modx/
//! ├── config.toml        # this file
//! ├── sites.json         # configured sites
//! └── credentials.toml   # bearer tokens, mode 0600
//! ```
//!
//! Every value can be overridden from the environment; see the `ENV_*`
//! constants.

use crate::error::{ModxError, Result};
use crate::store::write_atomic;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const ENV_CONFIG_PATH: &str = "MODX_CONFIG_PATH";
pub const ENV_LOG_LEVEL: &str = "MODX_LOG_LEVEL";
pub const ENV_HTTP_TIMEOUT_MS: &str = "MODX_HTTP_TIMEOUT_MS";
pub const ENV_SITES_FILE: &str = "MODX_SITES_FILE";
pub const ENV_CREDENTIALS_FILE: &str = "MODX_CREDENTIALS_FILE";

/// Default deadline for a single remote call.
pub const DEFAULT_TIMEOUT_MS: u64 = 8000;

const SITES_FILE: &str = "sites.json";
const CREDENTIALS_FILE: &str = "credentials.toml";
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModxConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Optional User-Agent header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sites_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: None,
        }
    }
}

/// Transport settings handed to every remote client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub timeout: Duration,
    /// When false, a 3xx answer is an error instead of being followed
    pub follow_redirects: bool,
    pub user_agent: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            follow_redirects: true,
            user_agent: None,
        }
    }
}

impl ClientOptions {
    /// Same options with redirect following turned off.
    pub fn without_redirects(&self) -> Self {
        Self {
            follow_redirects: false,
            ..self.clone()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ModxConfig {
    /// Load configuration from the default location
    pub async fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_path()?).await
    }

    /// Load configuration from a specific path, then apply environment overrides
    pub async fn load_from_path(path: &Path) -> Result<Self> {
        debug!("Loading configuration from: {}", path.display());

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ModxError::config(format!("Failed to read config file: {}", e)))?;

        let mut config: Self = toml::from_str(&content)
            .map_err(|e| ModxError::config(format!("Failed to parse config file: {}", e)))?;

        config.merge_env_vars()?;
        config.validate()?;

        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load the file at `path`, writing defaults there first if it is missing
    pub async fn load_or_create(path: &Path) -> Result<Self> {
        if tokio::fs::try_exists(path).await? {
            Self::load_from_path(path).await
        } else {
            info!("Creating default configuration at {}", path.display());
            let mut config = Self::default();
            config.save_to_path(path).await?;
            config.merge_env_vars()?;
            config.validate()?;
            Ok(config)
        }
    }

    /// Load or create the configuration at the default location
    pub async fn load_or_create_default() -> Result<Self> {
        Self::load_or_create(&Self::config_path()?).await
    }

    /// Save configuration atomically (temp file, then rename)
    pub async fn save_to_path(&self, path: &Path) -> Result<()> {
        debug!("Saving configuration to: {}", path.display());
        self.validate()?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ModxError::config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ModxError::config(format!("Failed to serialize config: {}", e)))?;

        write_atomic(path, content.as_bytes())
            .await
            .map_err(|e| ModxError::config(format!("Failed to write config file: {}", e)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !VALID_LOG_LEVELS.contains(&self.general.log_level.as_str()) {
            return Err(ModxError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.general.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        if self.http.timeout_ms == 0 {
            return Err(ModxError::config("timeout_ms must be greater than 0"));
        }

        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn merge_env_vars(&mut self) -> Result<()> {
        self.merge_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn merge_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            debug!("Overriding log_level from environment: {}", level);
            self.general.log_level = level;
        }

        if let Some(timeout) = lookup(ENV_HTTP_TIMEOUT_MS) {
            self.http.timeout_ms = timeout.trim().parse().map_err(|_| {
                ModxError::config(format!(
                    "{} must be a number of milliseconds, got '{}'",
                    ENV_HTTP_TIMEOUT_MS, timeout
                ))
            })?;
        }

        if let Some(path) = lookup(ENV_SITES_FILE) {
            self.storage.sites_file = Some(PathBuf::from(path));
        }

        if let Some(path) = lookup(ENV_CREDENTIALS_FILE) {
            self.storage.credentials_file = Some(PathBuf::from(path));
        }

        Ok(())
    }

    /// Transport options derived from the `[http]` section
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_millis(self.http.timeout_ms),
            follow_redirects: true,
            user_agent: self.http.user_agent.clone(),
        }
    }

    /// Path of the site list
    pub fn sites_path(&self) -> Result<PathBuf> {
        match &self.storage.sites_file {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::base_dir()?.join(SITES_FILE)),
        }
    }

    /// Path of the credential file
    pub fn credentials_path(&self) -> Result<PathBuf> {
        match &self.storage.credentials_file {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::base_dir()?.join(CREDENTIALS_FILE)),
        }
    }

    /// Directory holding the config file (`~/.modx` by default)
    pub fn base_dir() -> Result<PathBuf> {
        if let Ok(config_path) = std::env::var(ENV_CONFIG_PATH) {
            if let Some(parent) = PathBuf::from(config_path).parent() {
                return Ok(parent.to_path_buf());
            }
        }

        let base_dirs = BaseDirs::new()
            .ok_or_else(|| ModxError::config("Could not determine home directory"))?;

        Ok(base_dirs.home_dir().join(".modx"))
    }

    /// Configuration file path (`~/.modx/config.toml` by default)
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(config_path) = std::env::var(ENV_CONFIG_PATH) {
            return Ok(PathBuf::from(config_path));
        }

        Ok(Self::base_dir()?.join("config.toml"))
    }
}
