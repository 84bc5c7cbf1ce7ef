//! Runtime-home discovery.
//!
//! The runtime home is the directory `require` searches for Lua modules.
//! Discovery tries a list of [`HomeStrategy`] values in order and the
//! first one that yields an existing directory wins.
//!
//! ```text
//! 1. ConfiguredHome   runtime.home            (missing => error)
//! 2. ExeRelative      <exe dir>/<subdir>
//! 3. BundleResources  <exe dir>/../Resources/<subdir>   (macOS)
//! 4. WorkingDir       <cwd>/<subdir>
//! ```

use blockvm_runtime::config::RuntimeConfig;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

/// Runtime-home discovery errors.
#[derive(Debug, Error)]
pub enum HomeError {
    /// An explicitly configured home does not exist.
    #[error("runtime home '{path}' does not exist")]
    Missing { path: PathBuf },

    /// An explicitly configured home is not a directory.
    #[error("runtime home '{path}' is not a directory")]
    NotADirectory { path: PathBuf },
}

/// One way of locating the runtime home.
pub trait HomeStrategy: fmt::Debug {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Returns the home if this strategy finds one.
    ///
    /// # Errors
    ///
    /// Only strategies that must succeed return errors; the rest report
    /// "not found" as `Ok(None)`.
    fn locate(&self) -> Result<Option<PathBuf>, HomeError>;
}

/// Explicit home from configuration.
#[derive(Debug, Clone)]
pub struct ConfiguredHome(pub PathBuf);

impl HomeStrategy for ConfiguredHome {
    fn name(&self) -> &'static str {
        "configured"
    }

    fn locate(&self) -> Result<Option<PathBuf>, HomeError> {
        let path = &self.0;
        if !path.exists() {
            return Err(HomeError::Missing { path: path.clone() });
        }
        if !path.is_dir() {
            return Err(HomeError::NotADirectory { path: path.clone() });
        }
        Ok(Some(path.clone()))
    }
}

/// `<dir of the running executable>/<subdir>`.
#[derive(Debug, Clone)]
pub struct ExeRelative {
    pub subdir: String,
}

impl HomeStrategy for ExeRelative {
    fn name(&self) -> &'static str {
        "exe-relative"
    }

    fn locate(&self) -> Result<Option<PathBuf>, HomeError> {
        Ok(exe_dir().and_then(|dir| existing_dir(dir.join(&self.subdir))))
    }
}

/// App-bundle layout: `<exe dir>/../Resources/<subdir>`.
#[derive(Debug, Clone)]
pub struct BundleResources {
    pub subdir: String,
}

impl HomeStrategy for BundleResources {
    fn name(&self) -> &'static str {
        "bundle-resources"
    }

    fn locate(&self) -> Result<Option<PathBuf>, HomeError> {
        Ok(exe_dir()
            .and_then(|dir| dir.parent().map(Path::to_path_buf))
            .and_then(|contents| existing_dir(contents.join("Resources").join(&self.subdir))))
    }
}

/// `<base>/<subdir>`, where base defaults to the working directory.
#[derive(Debug, Clone)]
pub struct WorkingDir {
    pub base: Option<PathBuf>,
    pub subdir: String,
}

impl HomeStrategy for WorkingDir {
    fn name(&self) -> &'static str {
        "working-dir"
    }

    fn locate(&self) -> Result<Option<PathBuf>, HomeError> {
        let base = match &self.base {
            Some(base) => Some(base.clone()),
            None => std::env::current_dir().ok(),
        };
        Ok(base.and_then(|base| existing_dir(base.join(&self.subdir))))
    }
}

/// Ordered list of strategies.
#[derive(Debug, Default)]
pub struct HomeDiscovery {
    strategies: Vec<Box<dyn HomeStrategy>>,
}

impl HomeDiscovery {
    /// Discovery with no strategies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a strategy.
    #[must_use]
    pub fn with(mut self, strategy: impl HomeStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Standard strategy list for `config`.
    ///
    /// A configured home replaces every other strategy.
    #[must_use]
    pub fn from_config(config: &RuntimeConfig) -> Self {
        if let Some(home) = config.resolved_home() {
            return Self::new().with(ConfiguredHome(home));
        }
        let subdir = config.subdir.clone();
        let discovery = Self::new().with(ExeRelative {
            subdir: subdir.clone(),
        });
        #[cfg(target_os = "macos")]
        let discovery = discovery.with(BundleResources {
            subdir: subdir.clone(),
        });
        discovery.with(WorkingDir { base: None, subdir })
    }

    /// Runs the strategies in order.
    ///
    /// # Errors
    ///
    /// Propagates the first strategy error.
    pub fn discover(&self) -> Result<Option<PathBuf>, HomeError> {
        for strategy in &self.strategies {
            if let Some(home) = strategy.locate()? {
                debug!(strategy = strategy.name(), home = %home.display(), "runtime home found");
                return Ok(Some(home));
            }
            trace!(strategy = strategy.name(), "no runtime home");
        }
        Ok(None)
    }

    /// Names of the configured strategies, in order.
    #[must_use]
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

fn exe_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let exe = exe.canonicalize().unwrap_or(exe);
    exe.parent().map(Path::to_path_buf)
}

fn existing_dir(path: PathBuf) -> Option<PathBuf> {
    path.is_dir().then_some(path)
}
