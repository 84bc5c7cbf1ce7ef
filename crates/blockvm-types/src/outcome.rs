//! Block and session results.

use crate::ErrorReport;
use serde::{Deserialize, Serialize};

/// Result of running one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The block compiled and ran to completion.
    Success,
    /// The block failed to compile or raised while running.
    Failure(ErrorReport),
}

impl ExecutionOutcome {
    /// Returns `true` on success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns the error report of a failed block.
    #[must_use]
    pub fn report(&self) -> Option<&ErrorReport> {
        match self {
            Self::Success => None,
            Self::Failure(report) => Some(report),
        }
    }
}

/// What the worker should do once a session has ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Only this session ended; the worker stays up for another one.
    Continue,
    /// The worker should exit.
    Stop,
}

/// The input event that ended a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminator {
    /// End-of-script sentinel.
    EndOfScript,
    /// End-of-interpreter sentinel.
    EndOfInterpreter,
    /// The control stream closed without a terminating sentinel.
    EndOfInput,
    /// A block failed before any terminator was read. The rest of the
    /// script, terminator included, is still pending on the stream.
    BlockFailure,
}

impl Terminator {
    /// Maps the terminator onto the worker verdict.
    ///
    /// A closed stream degrades to end-of-script. A block failure never
    /// observed a terminator, so it continues as well.
    #[must_use]
    pub fn verdict(self) -> Verdict {
        match self {
            Self::EndOfInterpreter => Verdict::Stop,
            Self::EndOfScript | Self::EndOfInput | Self::BlockFailure => Verdict::Continue,
        }
    }

    /// Returns `true` when the terminating sentinel was actually read.
    #[must_use]
    pub fn is_sentinel(self) -> bool {
        matches!(self, Self::EndOfScript | Self::EndOfInterpreter)
    }
}
