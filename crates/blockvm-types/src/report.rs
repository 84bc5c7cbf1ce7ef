//! Structured error reports.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One `(filename, line)` entry of a traceback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Frame {
    /// Filename of the code object executing in this frame.
    pub filename: String,
    /// 1-based line number.
    pub line: u32,
}

impl Frame {
    /// Creates a frame.
    #[must_use]
    pub fn new(filename: impl Into<String>, line: u32) -> Self {
        Self {
            filename: filename.into(),
            line,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.filename, self.line)
    }
}

/// A failed block: the rendered error value plus its traceback.
///
/// Frames are ordered outermost first. An empty frame list is valid and
/// is what a compile failure produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Display string of the raised value.
    pub message: String,
    /// Traceback, outermost frame first.
    pub frames: Vec<Frame>,
}

impl ErrorReport {
    /// Creates a report without frames.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            frames: Vec::new(),
        }
    }

    /// Attaches a traceback.
    #[must_use]
    pub fn with_frames(mut self, frames: Vec<Frame>) -> Self {
        self.frames = frames;
        self
    }

    /// Returns `true` if the report carries at least one frame.
    #[must_use]
    pub fn has_traceback(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Innermost frame, where the failure was raised.
    #[must_use]
    pub fn innermost(&self) -> Option<&Frame> {
        self.frames.last()
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        for frame in &self.frames {
            write!(f, "\n  at {frame}")?;
        }
        Ok(())
    }
}
