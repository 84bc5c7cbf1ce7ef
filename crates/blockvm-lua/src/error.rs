//! Error types for the Lua engine.

use crate::home::HomeError;
use thiserror::Error;

/// Errors raised while building the engine or a session state.
#[derive(Debug, Error)]
pub enum LuaEngineError {
    /// Lua state setup failed.
    #[error("lua error: {0}")]
    Lua(#[from] mlua::Error),

    /// Runtime home discovery failed.
    #[error(transparent)]
    Home(#[from] HomeError),
}

impl From<LuaEngineError> for blockvm_runtime::EngineError {
    fn from(err: LuaEngineError) -> Self {
        blockvm_runtime::EngineError::ContextAllocation(err.to_string())
    }
}
