//! The Lua script engine.

use crate::context::LuaContext;
use crate::error::LuaEngineError;
use crate::home::HomeDiscovery;
use blockvm_runtime::config::RuntimeConfig;
use blockvm_runtime::{EngineError, ScriptEngine};
use parking_lot::Mutex;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Destination of script output (`print`).
pub type OutputSink = Arc<Mutex<Box<dyn Write + Send>>>;

/// Allocates one fresh Lua state per session.
pub struct LuaEngine {
    home: Option<PathBuf>,
    output: OutputSink,
    contexts_created: u64,
}

impl LuaEngine {
    /// Engine printing to stdout, without a runtime home.
    #[must_use]
    pub fn new() -> Self {
        Self {
            home: None,
            output: Arc::new(Mutex::new(Box::new(std::io::stdout()))),
            contexts_created: 0,
        }
    }

    /// Builds an engine from runtime configuration, discovering the home.
    ///
    /// # Errors
    ///
    /// Returns [`LuaEngineError::Home`] if a configured home is missing.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self, LuaEngineError> {
        let engine = Self::new();
        match HomeDiscovery::from_config(config).discover()? {
            Some(home) => Ok(engine.with_home(home)),
            None => {
                warn!(
                    subdir = %config.subdir,
                    "no runtime home found, running with the built-in library only"
                );
                Ok(engine)
            }
        }
    }

    /// Sets the directory `require` searches.
    #[must_use]
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        info!(home = %home.display(), "runtime home");
        self.home = Some(home);
        self
    }

    /// Sends script output to `writer`.
    #[must_use]
    pub fn with_output(self, writer: impl Write + Send + 'static) -> Self {
        self.with_output_sink(Arc::new(Mutex::new(Box::new(writer))))
    }

    /// Sends script output to a shared sink.
    #[must_use]
    pub fn with_output_sink(mut self, sink: OutputSink) -> Self {
        self.output = sink;
        self
    }

    /// Runtime home, if one was found.
    #[must_use]
    pub fn home(&self) -> Option<&Path> {
        self.home.as_deref()
    }

    /// Number of states created so far.
    #[must_use]
    pub fn contexts_created(&self) -> u64 {
        self.contexts_created
    }
}

impl Default for LuaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LuaEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LuaEngine")
            .field("home", &self.home)
            .field("contexts_created", &self.contexts_created)
            .finish_non_exhaustive()
    }
}

impl ScriptEngine for LuaEngine {
    type Context = LuaContext;

    fn create_context(&mut self) -> Result<LuaContext, EngineError> {
        let context = LuaContext::new(self.home.as_deref(), Arc::clone(&self.output))?;
        self.contexts_created += 1;
        debug!(contexts = self.contexts_created, "lua state created");
        Ok(context)
    }

    fn destroy_context(&mut self, context: &mut LuaContext) {
        context.close();
    }
}
