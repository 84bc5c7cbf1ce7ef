//! Configuration types.
//!
//! All types implement [`Default`] for compile-time fallback values.

use super::ConfigError;
use crate::protocol::{SentinelSet, DEFAULT_PREFIX};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default runtime-home subdirectory name.
pub const DEFAULT_RUNTIME_SUBDIR: &str = "lua";

/// Main configuration structure.
///
/// This is the unified configuration after merging all layers.
///
/// # Example
///
/// ```
/// use blockvm_runtime::config::WorkerConfig;
///
/// let config = WorkerConfig::default();
/// assert_eq!(config.protocol.prefix, "BLOCKVM_INTERPRETER");
/// assert_eq!(config.runtime.subdir, "lua");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Control protocol settings.
    pub protocol: ProtocolConfig,

    /// Script runtime settings.
    pub runtime: RuntimeConfig,

    /// Log output settings.
    pub logging: LoggingConfig,
}

impl WorkerConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes to TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserializes from TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Merges another config into this one.
    ///
    /// Values in `other` that differ from defaults override values in `self`.
    pub fn merge(&mut self, other: &Self) {
        self.protocol.merge(&other.protocol);
        self.runtime.merge(&other.runtime);
        self.logging.merge(&other.logging);
    }

    /// Checks that the merged values are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an empty prefix, a prefix
    /// containing whitespace, or an empty runtime subdirectory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_prefix(&self.protocol.prefix)
            .map_err(|m| ConfigError::invalid_value("protocol.prefix", m))?;
        if self.runtime.subdir.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "runtime.subdir",
                "must not be empty",
            ));
        }
        Ok(())
    }

    /// Sentinel vocabulary derived from `protocol.prefix`.
    #[must_use]
    pub fn sentinels(&self) -> SentinelSet {
        SentinelSet::with_prefix(&self.protocol.prefix)
    }
}

/// Returns why `prefix` cannot be used as a sentinel prefix.
pub(crate) fn validate_prefix(prefix: &str) -> Result<(), &'static str> {
    if prefix.is_empty() {
        Err("must not be empty")
    } else if prefix.chars().any(char::is_whitespace) {
        Err("must not contain whitespace")
    } else {
        Ok(())
    }
}

/// Control protocol configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Prefix every sentinel token is derived from.
    pub prefix: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.into(),
        }
    }
}

impl ProtocolConfig {
    fn merge(&mut self, other: &Self) {
        let default = Self::default();

        if other.prefix != default.prefix {
            self.prefix = other.prefix.clone();
        }
    }
}

/// Script runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Explicit runtime home. Must exist when set.
    pub home: Option<PathBuf>,

    /// Directory name probed next to the executable and the working
    /// directory when no explicit home is set.
    pub subdir: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            home: None,
            subdir: DEFAULT_RUNTIME_SUBDIR.into(),
        }
    }
}

impl RuntimeConfig {
    fn merge(&mut self, other: &Self) {
        let default = Self::default();

        if other.home.is_some() {
            self.home = other.home.clone();
        }
        if other.subdir != default.subdir {
            self.subdir = other.subdir.clone();
        }
    }

    /// Explicit home with `~` expanded.
    #[must_use]
    pub fn resolved_home(&self) -> Option<PathBuf> {
        self.home.as_deref().map(expand_tilde)
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`warn`, `info`, `blockvm_runtime=debug`, ...).
    pub level: Option<String>,

    /// Log file. Logs go to stderr when unset.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    fn merge(&mut self, other: &Self) {
        if other.level.is_some() {
            self.level = other.level.clone();
        }
        if other.file.is_some() {
            self.file = other.file.clone();
        }
    }

    /// Log file with `~` expanded.
    #[must_use]
    pub fn resolved_file(&self) -> Option<PathBuf> {
        self.file.as_deref().map(expand_tilde)
    }
}

/// Expands `~` to home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
