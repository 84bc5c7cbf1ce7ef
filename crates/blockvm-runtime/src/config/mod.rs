//! Worker configuration with hierarchical layering.
//!
//! # Architecture
//!
//! ```text
//! Priority (highest to lowest):
//!
//! ┌─────────────────────────────────────────────┐
//! │  1. Command line (ConfigResolver)           │  Per invocation
//! ├─────────────────────────────────────────────┤
//! │  2. Environment Variables (BLOCKVM_*)       │  Runtime override
//! ├─────────────────────────────────────────────┤
//! │  3. Explicit file (--config)                │  Must exist
//! ├─────────────────────────────────────────────┤
//! │  4. Project Config (.blockvm/config.toml)   │  Project-specific
//! ├─────────────────────────────────────────────┤
//! │  5. Global Config (~/.blockvm/config.toml)  │  User defaults
//! ├─────────────────────────────────────────────┤
//! │  6. Default Values (compile-time)           │  Fallback
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Config Field | Type |
//! |----------|--------------|------|
//! | `BLOCKVM_PROTOCOL_PREFIX` | `protocol.prefix` | String |
//! | `BLOCKVM_RUNTIME_HOME` | `runtime.home` | PathBuf |
//! | `BLOCKVM_LOG_LEVEL` | `logging.level` | String |
//! | `BLOCKVM_LOG_FILE` | `logging.file` | PathBuf |
//!
//! # Example Configuration
//!
//! ```toml
//! # ~/.blockvm/config.toml
//!
//! [protocol]
//! prefix = "PAKIKI_PYTHON_INTERPRETER"
//!
//! [runtime]
//! home = "/opt/blockvm/lua"
//! subdir = "lua"
//!
//! [logging]
//! level = "info"
//! file = "/tmp/blockvm.log"
//! ```

mod error;
mod loader;
mod resolver;
mod types;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use resolver::{ConfigResolver, NoOpResolver};
pub use types::{LoggingConfig, ProtocolConfig, RuntimeConfig, WorkerConfig};

/// Default global config directory.
pub fn default_config_dir() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".blockvm")
}

/// Default global config file path.
pub fn default_config_path() -> std::path::PathBuf {
    default_config_dir().join("config.toml")
}

/// Project config directory name.
pub const PROJECT_CONFIG_DIR: &str = ".blockvm";

/// Project config file name.
pub const PROJECT_CONFIG_FILE: &str = "config.toml";
