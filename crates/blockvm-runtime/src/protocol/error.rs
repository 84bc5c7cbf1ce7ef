//! Protocol errors.

use crate::session::SessionError;
use std::io;
use thiserror::Error;

/// Errors that end the protocol loop.
///
/// Per-block failures are not errors at this level: they are reported on
/// the diagnostic channel and the worker keeps running.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The session could not be started.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// An output channel could not be written.
    #[error("failed to write {channel} channel: {source}")]
    Emit {
        channel: &'static str,
        #[source]
        source: io::Error,
    },
}

impl ProtocolError {
    /// Creates an emit error for `channel`.
    pub fn emit(channel: &'static str, source: io::Error) -> Self {
        Self::Emit { channel, source }
    }

    /// Returns `true` if no session could be started.
    #[must_use]
    pub fn is_startup_failure(&self) -> bool {
        matches!(self, Self::Session(_))
    }
}
