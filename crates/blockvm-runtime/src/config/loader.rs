//! Configuration loader with hierarchical merging.
//!
//! # Load Order
//!
//! 1. Default values (compile-time)
//! 2. Global config (`~/.blockvm/config.toml`)
//! 3. Project config (`<root>/.blockvm/config.toml`)
//! 4. Explicit config file (`--config`), which must exist
//! 5. Environment variables (`BLOCKVM_*`)
//!
//! Each layer overrides the previous.

use super::types::validate_prefix;
use super::{
    default_config_path, ConfigError, WorkerConfig, PROJECT_CONFIG_DIR, PROJECT_CONFIG_FILE,
};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Helper macro for optional string/path environment variables.
macro_rules! parse_env_some {
    ($field:expr, $var:literal) => {
        if let Ok(val) = std::env::var($var) {
            if val.is_empty() {
                return Err(ConfigError::invalid_env_var($var, "must not be empty"));
            }
            $field = Some(val.into());
        }
    };
}

/// Configuration loader with builder pattern.
///
/// # Example
///
/// ```no_run
/// use blockvm_runtime::config::ConfigLoader;
///
/// let config = ConfigLoader::new()
///     .with_project_root("/path/to/project")
///     .skip_env_vars()
///     .load()?;
/// # Ok::<(), blockvm_runtime::config::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    /// Global config file path (defaults to ~/.blockvm/config.toml).
    global_config_path: Option<PathBuf>,

    /// Project root directory.
    project_root: Option<PathBuf>,

    /// Explicitly requested config file.
    explicit_file: Option<PathBuf>,

    /// Skip environment variable loading.
    skip_env: bool,

    /// Skip global config loading.
    skip_global: bool,

    /// Skip project config loading.
    skip_project: bool,
}

impl ConfigLoader {
    /// Creates a new loader with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a custom global config path.
    #[must_use]
    pub fn with_global_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    /// Sets the project root directory.
    ///
    /// Project config will be loaded from `<project_root>/.blockvm/config.toml`.
    #[must_use]
    pub fn with_project_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_root = Some(path.into());
        self
    }

    /// Adds an explicit config file layered above the project config.
    ///
    /// Unlike the global and project files, this one must exist.
    #[must_use]
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_file = Some(path.into());
        self
    }

    /// Skips environment variable loading.
    ///
    /// Useful for testing with deterministic config.
    #[must_use]
    pub fn skip_env_vars(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Skips global config loading.
    #[must_use]
    pub fn skip_global_config(mut self) -> Self {
        self.skip_global = true;
        self
    }

    /// Skips project config loading.
    #[must_use]
    pub fn skip_project_config(mut self) -> Self {
        self.skip_project = true;
        self
    }

    /// Loads and merges configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any config file exists but cannot be
    /// read or parsed, if the explicit file is missing, or if an
    /// environment variable holds an unusable value. Missing global and
    /// project files are silently ignored.
    pub fn load(&self) -> Result<WorkerConfig, ConfigError> {
        let mut config = WorkerConfig::default();

        if !self.skip_global {
            let global_path = self
                .global_config_path
                .clone()
                .unwrap_or_else(default_config_path);

            if let Some(global_config) = load_file(&global_path)? {
                debug!(path = %global_path.display(), "Loaded global config");
                config.merge(&global_config);
            }
        }

        if !self.skip_project {
            if let Some(ref project_root) = self.project_root {
                let project_config_path = project_root
                    .join(PROJECT_CONFIG_DIR)
                    .join(PROJECT_CONFIG_FILE);

                if let Some(project_config) = load_file(&project_config_path)? {
                    debug!(
                        path = %project_config_path.display(),
                        project = %project_root.display(),
                        "Loaded project config"
                    );
                    config.merge(&project_config);
                }
            }
        }

        if let Some(ref path) = self.explicit_file {
            let explicit = load_file(path)?.ok_or_else(|| ConfigError::not_found(path))?;
            debug!(path = %path.display(), "Loaded explicit config");
            config.merge(&explicit);
        }

        if !self.skip_env {
            apply_env_vars(&mut config)?;
        }

        Ok(config)
    }
}

/// Loads a config file, returning None if it doesn't exist.
fn load_file(path: &Path) -> Result<Option<WorkerConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    let config =
        WorkerConfig::from_toml(&content).map_err(|e| ConfigError::parse_toml(path, e))?;

    Ok(Some(config))
}

/// Applies environment variable overrides.
fn apply_env_vars(config: &mut WorkerConfig) -> Result<(), ConfigError> {
    if let Ok(val) = std::env::var("BLOCKVM_PROTOCOL_PREFIX") {
        validate_prefix(&val)
            .map_err(|m| ConfigError::invalid_env_var("BLOCKVM_PROTOCOL_PREFIX", m))?;
        config.protocol.prefix = val;
    }

    parse_env_some!(config.runtime.home, "BLOCKVM_RUNTIME_HOME");
    parse_env_some!(config.logging.level, "BLOCKVM_LOG_LEVEL");
    parse_env_some!(config.logging.file, "BLOCKVM_LOG_FILE");

    Ok(())
}
