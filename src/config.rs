//! Settings for the service client and the local collection
//!
//! Loaded from `<config_dir>/studyforge/config.toml` (or an explicit path),
//! then overridden by `STUDYFORGE_*` environment variables.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::{InputLimits, RequestOptions};
use crate::study_sets::STUDY_SETS_KEY;

pub const ENV_API_URL: &str = "STUDYFORGE_API_URL";
pub const ENV_DATA_DIR: &str = "STUDYFORGE_DATA_DIR";
pub const ENV_TIMEOUT_MS: &str = "STUDYFORGE_TIMEOUT_MS";
pub const ENV_MAX_RETRIES: &str = "STUDYFORGE_MAX_RETRIES";

const APP_DIR_NAME: &str = "studyforge";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Data directory not found")]
    DataDirNotFound,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    /// Per-attempt timeout
    pub timeout_ms: u64,
    pub max_retries: u32,
    /// Base retry delay, doubled for each further retry
    pub retry_delay_ms: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_ms: 60_000,
            max_retries: 2,
            retry_delay_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Defaults to `<data_local_dir>/studyforge`
    pub data_dir: Option<PathBuf>,
    pub storage_key: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            storage_key: STUDY_SETS_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub storage: StorageSettings,
    pub limits: InputLimits,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api: ApiSettings::default(),
            storage: StorageSettings::default(),
            limits: InputLimits::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load settings from `path` (or the default location), apply
    /// environment overrides and validate.
    ///
    /// A missing file at the default location yields defaults; an explicit
    /// path that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        settings.apply_env_overrides()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup` (an environment-like key → value source)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api.base_url = url;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.storage.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(value) = lookup(ENV_TIMEOUT_MS) {
            self.api.timeout_ms = parse_number(ENV_TIMEOUT_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_RETRIES) {
            self.api.max_retries = parse_number(ENV_MAX_RETRIES, &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.api.base_url.trim();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "api.base_url must start with http:// or https://: {}",
                url
            )));
        }
        if self.api.timeout_ms < 1 {
            return Err(ConfigError::Invalid(
                "api.timeout_ms must be at least 1".to_string(),
            ));
        }
        if self.storage.storage_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "storage.storage_key cannot be empty".to_string(),
            ));
        }
        self.limits
            .check()
            .map_err(|e| ConfigError::Invalid(format!("limits: {}", e)))
    }

    pub fn request_options(&self) -> RequestOptions {
        RequestOptions::default()
            .with_timeout(Duration::from_millis(self.api.timeout_ms))
            .with_max_retries(self.api.max_retries)
            .with_retry_delay(Duration::from_millis(self.api.retry_delay_ms))
    }

    /// Directory the collection is persisted in
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.storage.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_local_dir()
                .map(|p| p.join(APP_DIR_NAME))
                .ok_or(ConfigError::DataDirNotFound),
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} must be a number, got '{}'", key, value)))
}
