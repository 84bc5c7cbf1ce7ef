//! Session lifecycle.
//!
//! A session is one isolated execution context plus its top-level
//! namespace. [`SessionManager`] is the only owner of the engine and the
//! only component that switches the active context. It does so through
//! a scoped guard: [`Session`] tears its context down and restores the
//! previously active context when dropped, on every exit path.
//!
//! ```text
//! begin_session()                     drop(Session)
//!   engine.create_context()  ──────►    engine.destroy_context()
//!   active = Some(new id)                active = previous
//! ```
//!
//! The guard mutably borrows the manager, so a second session cannot be
//! opened while one is live.

use crate::engine::{EngineError, ExecutionContext, ScriptEngine};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// Session lifecycle errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The engine could not allocate a new isolated context.
    ///
    /// Fatal for the worker: no further sessions are servable.
    #[error("cannot start session: {0}")]
    Allocation(#[from] EngineError),
}

/// Monotonic identifier of a session within one worker process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Raw sequence number (1-based).
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Owns the engine and hands out one [`Session`] at a time.
#[derive(Debug)]
pub struct SessionManager<E: ScriptEngine> {
    engine: E,
    active: Option<SessionId>,
    last_id: u64,
}

impl<E: ScriptEngine> SessionManager<E> {
    /// Takes ownership of `engine`.
    #[must_use]
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            active: None,
            last_id: 0,
        }
    }

    /// Allocates a new isolated context and makes it the active one.
    ///
    /// Returns the session guard together with its namespace.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Allocation`] when the engine cannot
    /// allocate a context.
    pub fn begin_session(
        &mut self,
    ) -> Result<
        (
            Session<'_, E>,
            <E::Context as ExecutionContext>::Namespace,
        ),
        SessionError,
    > {
        let context = self.engine.create_context()?;
        self.last_id += 1;
        let id = SessionId(self.last_id);
        let previous = self.active.replace(id);
        let namespace = context.namespace();
        info!(session = %id, "session started");

        let session = Session {
            manager: self,
            context,
            id,
            previous,
            ended: false,
        };
        Ok((session, namespace))
    }

    /// Identifier of the live session, if any.
    #[must_use]
    pub fn active(&self) -> Option<SessionId> {
        self.active
    }

    /// Number of sessions started so far.
    #[must_use]
    pub fn sessions_started(&self) -> u64 {
        self.last_id
    }

    /// Borrows the engine.
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Returns the engine, consuming the manager.
    #[must_use]
    pub fn into_engine(self) -> E {
        self.engine
    }
}

/// Scoped handle to the live session.
///
/// Dropping it ends the session exactly once.
pub struct Session<'m, E: ScriptEngine> {
    manager: &'m mut SessionManager<E>,
    context: E::Context,
    id: SessionId,
    previous: Option<SessionId>,
    ended: bool,
}

impl<E: ScriptEngine> Session<'_, E> {
    /// Session identifier.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The isolated context blocks run in.
    #[must_use]
    pub fn context(&self) -> &E::Context {
        &self.context
    }

    /// Ends the session now instead of at scope exit.
    pub fn end(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;
        self.manager.engine.destroy_context(&mut self.context);
        self.manager.active = self.previous;
        debug!(session = %self.id, "session torn down");
    }
}

impl<E: ScriptEngine> Drop for Session<'_, E> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<E: ScriptEngine> fmt::Debug for Session<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("previous", &self.previous)
            .field("ended", &self.ended)
            .finish_non_exhaustive()
    }
}
