//! Configuration module for upsync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! environment overrides, validation, defaults, and a builder pattern for
//! programmatic use.
//!
//! Precedence, lowest first: built-in defaults, YAML file, environment,
//! command-line flags (applied by the daemon).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::newtypes::RemotePath;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for upsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub remote: RemoteConfig,
    pub logging: LoggingConfig,
}

/// Local scanning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Local directory whose new files are mirrored.
    pub local_folder: PathBuf,
    /// Seconds of idle time between two ticks.
    pub poll_interval: u64,
    /// Delete local files once they are confirmed on the remote.
    pub clear_downloads: bool,
}

/// Remote backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Which backend to talk to.
    pub drive_type: DriveType,
    /// Credentials file handed to the backend's session setup.
    pub auth_key_path: PathBuf,
    /// Remote root: a folder name for GOOGLE, an absolute path for SYNOLOGY.
    pub folder: String,
    /// Extra attempts for a failed remote listing (0 disables retrying).
    pub list_retries: u32,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// DriveType
// ---------------------------------------------------------------------------

/// Supported remote backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DriveType {
    /// Google Drive v3
    #[default]
    Google,
    /// Synology File Station
    Synology,
}

impl DriveType {
    /// Canonical upper-case name, as used in `DRIVE_TYPE`
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "GOOGLE",
            Self::Synology => "SYNOLOGY",
        }
    }
}

impl fmt::Display for DriveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriveType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GOOGLE" => Ok(Self::Google),
            "SYNOLOGY" => Ok(Self::Synology),
            _ => Err(ConfigError::UnknownDriveType(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.poll_interval"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors raised while assembling the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Unknown drive type \"{0}\" (expected GOOGLE or SYNOLOGY)")]
    UnknownDriveType(String),

    #[error("Invalid value \"{value}\" for {var}: {reason}")]
    InvalidEnv {
        var: String,
        value: String,
        reason: String,
    },

    #[error("Invalid configuration: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/upsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("upsync")
            .join("config.yaml")
    }

    /// Overlay environment variables read through `lookup`.
    ///
    /// Unset and empty variables leave the current value untouched. The
    /// legacy names `LOCAL_FOLDER_PATH` and `REMOTE_FOLDER_NAME` are honoured
    /// when the primary name is unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(value) = get("DRIVE_TYPE") {
            self.remote.drive_type = value.parse()?;
        }
        if let Some(value) = get("LOCAL_FOLDER").or_else(|| get("LOCAL_FOLDER_PATH")) {
            self.sync.local_folder = PathBuf::from(value);
        }
        if let Some(value) = get("AUTH_KEY_PATH") {
            self.remote.auth_key_path = PathBuf::from(value);
        }
        if let Some(value) = get("REMOTE_FOLDER").or_else(|| get("REMOTE_FOLDER_NAME")) {
            self.remote.folder = value;
        }
        if let Some(value) = get("CLEAR_DOWNLOADS") {
            self.sync.clear_downloads = parse_bool("CLEAR_DOWNLOADS", &value)?;
        }
        if let Some(value) = get("POLL_INTERVAL") {
            self.sync.poll_interval = parse_number("POLL_INTERVAL", &value)?;
        }
        if let Some(value) = get("LIST_RETRIES") {
            self.remote.list_retries = parse_number("LIST_RETRIES", &value)?;
        }
        if let Some(value) = get("LOG_LEVEL") {
            self.logging.level = value.trim().to_ascii_lowercase();
        }

        Ok(())
    }
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var: var.to_string(),
            value: value.to_string(),
            reason: "expected a boolean".into(),
        }),
    }
}

fn parse_number<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnv {
            var: var.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            local_folder: PathBuf::from("./folder_sync"),
            poll_interval: 3,
            clear_downloads: false,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            drive_type: DriveType::default(),
            auth_key_path: PathBuf::from("./auth/key.json"),
            folder: "from_server".to_string(),
            list_retries: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        if self.sync.poll_interval == 0 {
            errors.push(ValidationError {
                field: "sync.poll_interval".into(),
                message: "must be greater than 0".into(),
            });
        }

        if !self.sync.local_folder.is_dir() {
            errors.push(ValidationError {
                field: "sync.local_folder".into(),
                message: format!(
                    "directory does not exist: {}",
                    self.sync.local_folder.display()
                ),
            });
        }

        // --- remote ---
        match self.remote.drive_type {
            DriveType::Google => {
                if self.remote.folder.trim().is_empty() {
                    errors.push(ValidationError {
                        field: "remote.folder".into(),
                        message: "folder name must not be empty".into(),
                    });
                }
            }
            DriveType::Synology => {
                if let Err(e) = RemotePath::new(self.remote.folder.as_str()) {
                    errors.push(ValidationError {
                        field: "remote.folder".into(),
                        message: e.to_string(),
                    });
                }
            }
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid log level '{}'; expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }

    /// Validate, turning any findings into a single [`ConfigError`].
    pub fn ensure_valid(&self) -> Result<(), ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and lets callers override individual fields.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder pre-populated with default values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn local_folder(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.sync.local_folder = path.into();
        self
    }

    pub fn poll_interval(mut self, seconds: u64) -> Self {
        self.config.sync.poll_interval = seconds;
        self
    }

    pub fn clear_downloads(mut self, enabled: bool) -> Self {
        self.config.sync.clear_downloads = enabled;
        self
    }

    pub fn drive_type(mut self, drive_type: DriveType) -> Self {
        self.config.remote.drive_type = drive_type;
        self
    }

    pub fn auth_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.remote.auth_key_path = path.into();
        self
    }

    pub fn remote_folder(mut self, folder: impl Into<String>) -> Self {
        self.config.remote.folder = folder.into();
        self
    }

    pub fn list_retries(mut self, retries: u32) -> Self {
        self.config.remote.list_retries = retries;
        self
    }

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
