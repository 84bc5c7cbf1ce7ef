//! Sentinel vocabulary.
//!
//! Sentinel strings are a contract with one specific caller, so they are
//! configuration: every token is derived from a prefix.

use blockvm_types::Terminator;

/// Prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "BLOCKVM_INTERPRETER";

/// Control signal recognized on the input channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Execute the accumulated block.
    EndOfBlock,
    /// End the session, keep the worker.
    EndOfScript,
    /// End the session and the worker.
    EndOfInterpreter,
}

impl Signal {
    /// The session terminator this signal stands for, if any.
    #[must_use]
    pub fn terminator(self) -> Option<Terminator> {
        match self {
            Self::EndOfBlock => None,
            Self::EndOfScript => Some(Terminator::EndOfScript),
            Self::EndOfInterpreter => Some(Terminator::EndOfInterpreter),
        }
    }
}

/// Complete set of input and output sentinel lines.
///
/// # Example
///
/// ```
/// use blockvm_runtime::{SentinelSet, Signal};
///
/// let sentinels = SentinelSet::with_prefix("ACME");
/// assert_eq!(sentinels.ready(), "ACME_READY");
/// assert_eq!(sentinels.classify("ACME_END_OF_BLOCK"), Some(Signal::EndOfBlock));
/// assert_eq!(sentinels.classify("acme_end_of_block"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelSet {
    end_of_block: String,
    end_of_script: String,
    end_interpreter: String,
    ready: String,
    script_finished: String,
    error: String,
}

impl SentinelSet {
    /// Derives every sentinel from `prefix`.
    #[must_use]
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            end_of_block: format!("{prefix}_END_OF_BLOCK"),
            end_of_script: format!("{prefix}_END_OF_SCRIPT"),
            end_interpreter: format!("{prefix}_END_INTERPRETER"),
            ready: format!("{prefix}_READY"),
            script_finished: format!("{prefix}_SCRIPT_FINISHED"),
            error: format!("{prefix}_ERROR"),
        }
    }

    /// Classifies an input line. Matching is exact and case-sensitive.
    #[must_use]
    pub fn classify(&self, line: &str) -> Option<Signal> {
        if line == self.end_of_block {
            Some(Signal::EndOfBlock)
        } else if line == self.end_of_script {
            Some(Signal::EndOfScript)
        } else if line == self.end_interpreter {
            Some(Signal::EndOfInterpreter)
        } else {
            None
        }
    }

    /// End-of-block input line.
    #[must_use]
    pub fn end_of_block(&self) -> &str {
        &self.end_of_block
    }

    /// End-of-script input line.
    #[must_use]
    pub fn end_of_script(&self) -> &str {
        &self.end_of_script
    }

    /// End-of-interpreter input line.
    #[must_use]
    pub fn end_interpreter(&self) -> &str {
        &self.end_interpreter
    }

    /// Event emitted after each completed block.
    #[must_use]
    pub fn ready(&self) -> &str {
        &self.ready
    }

    /// Event emitted once at session end.
    #[must_use]
    pub fn script_finished(&self) -> &str {
        &self.script_finished
    }

    /// Marker line opening a diagnostic report.
    #[must_use]
    pub fn error(&self) -> &str {
        &self.error
    }
}

impl Default for SentinelSet {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_vocabulary() {
        let s = SentinelSet::default();
        assert_eq!(s.end_of_block(), "BLOCKVM_INTERPRETER_END_OF_BLOCK");
        assert_eq!(s.end_of_script(), "BLOCKVM_INTERPRETER_END_OF_SCRIPT");
        assert_eq!(s.end_interpreter(), "BLOCKVM_INTERPRETER_END_INTERPRETER");
        assert_eq!(s.script_finished(), "BLOCKVM_INTERPRETER_SCRIPT_FINISHED");
        assert_eq!(s.error(), "BLOCKVM_INTERPRETER_ERROR");
    }

    #[test]
    fn classify_requires_exact_match() {
        let s = SentinelSet::with_prefix("P");
        assert_eq!(s.classify("P_END_OF_SCRIPT"), Some(Signal::EndOfScript));
        assert_eq!(s.classify("P_END_INTERPRETER"), Some(Signal::EndOfInterpreter));
        assert_eq!(s.classify(" P_END_OF_SCRIPT"), None);
        assert_eq!(s.classify("P_END_OF_SCRIPT "), None);
        assert_eq!(s.classify("P_READY"), None);
    }

    #[test]
    fn terminators() {
        assert_eq!(Signal::EndOfBlock.terminator(), None);
        assert_eq!(
            Signal::EndOfInterpreter.terminator(),
            Some(Terminator::EndOfInterpreter)
        );
    }
}
