//! Execution engine capability.
//!
//! The interpreter is an external collaborator. This module fixes the
//! interface the protocol needs from it and nothing more:
//!
//! - [`ScriptEngine`] allocates and releases isolated contexts.
//! - [`ExecutionContext`] compiles and runs units against a namespace.
//! - [`Fault`] is the pending error of one failed call.
//!
//! A fault is *returned* by the call that raised it and consumed by
//! [`check_error`](crate::report::check_error). There is no process-wide
//! error flag to poll, so a stale error cannot be reported twice.

use blockvm_types::Frame;
use thiserror::Error;

/// Errors raised by the engine itself (not by user code).
#[derive(Debug, Error)]
pub enum EngineError {
    /// A new isolated context could not be allocated.
    #[error("failed to allocate execution context: {0}")]
    ContextAllocation(String),

    /// The engine was used after it was shut down.
    #[error("engine unavailable: {0}")]
    Unavailable(String),
}

/// Allocates and releases isolated execution contexts.
pub trait ScriptEngine {
    /// The isolated interpreter type.
    type Context: ExecutionContext;

    /// Allocates a fresh context with an empty top-level namespace.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the engine cannot allocate a context.
    fn create_context(&mut self) -> Result<Self::Context, EngineError>;

    /// Tears a context down. The value is dropped right after this call.
    ///
    /// Must not fail and must tolerate a context whose last block raised.
    fn destroy_context(&mut self, context: &mut Self::Context);
}

/// One isolated interpreter instance.
pub trait ExecutionContext {
    /// A compiled, not yet executed, unit of source.
    type Unit;
    /// Handle to the persistent top-level namespace.
    type Namespace: Clone;
    /// Pending error produced by a failed compile or execute.
    type Fault: Fault;

    /// Returns a handle to this context's top-level namespace.
    fn namespace(&self) -> Self::Namespace;

    /// Compiles `source` as a whole-module unit tagged with `filename`.
    ///
    /// # Errors
    ///
    /// Returns the compile fault.
    fn compile(&self, source: &str, filename: &str) -> Result<Self::Unit, Self::Fault>;

    /// Runs `unit` with `namespace` as both its read and write scope.
    ///
    /// # Errors
    ///
    /// Returns the runtime fault.
    fn execute(&self, unit: Self::Unit, namespace: &Self::Namespace) -> Result<(), Self::Fault>;
}

/// A raised error, normalized to a value plus a traceback.
pub trait Fault {
    /// Renders the raised value to its display string.
    ///
    /// # Errors
    ///
    /// Returns a description of why the value could not be rendered.
    fn render(&self) -> Result<String, String>;

    /// Traceback frames, outermost first.
    fn traceback(&self) -> Vec<Frame>;
}
