//! Event and diagnostic output.

use super::error::ProtocolError;
use super::sentinel::SentinelSet;
use blockvm_types::ErrorReport;
use std::io::Write;

const EVENT_CHANNEL: &str = "event";
const DIAGNOSTIC_CHANNEL: &str = "diagnostic";

/// Writes lifecycle events and error diagnostics.
///
/// Events (`READY`, `SCRIPT_FINISHED`) and diagnostics (`ERROR`, message,
/// frames) go to separate writers. Every record is flushed immediately
/// so the caller can react without waiting for buffers to fill.
#[derive(Debug)]
pub struct Emitter<E, D> {
    events: E,
    diagnostics: D,
    sentinels: SentinelSet,
}

impl<E: Write, D: Write> Emitter<E, D> {
    /// Creates an emitter over the two channels.
    pub fn new(events: E, diagnostics: D, sentinels: SentinelSet) -> Self {
        Self {
            events,
            diagnostics,
            sentinels,
        }
    }

    /// Emits the "ready for next block" event.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Emit`] if the event channel fails.
    pub fn ready(&mut self) -> Result<(), ProtocolError> {
        write_event(&mut self.events, self.sentinels.ready())
    }

    /// Emits the "script finished" event.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Emit`] if the event channel fails.
    pub fn script_finished(&mut self) -> Result<(), ProtocolError> {
        write_event(&mut self.events, self.sentinels.script_finished())
    }

    /// Emits one diagnostic report: marker, message, then one
    /// `filename:line` per frame, outermost first.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Emit`] if the diagnostic channel fails.
    pub fn report(&mut self, report: &ErrorReport) -> Result<(), ProtocolError> {
        write_report(&mut self.diagnostics, self.sentinels.error(), report)
            .map_err(|e| ProtocolError::emit(DIAGNOSTIC_CHANNEL, e))
    }

    /// Sentinel vocabulary in use.
    #[must_use]
    pub fn sentinels(&self) -> &SentinelSet {
        &self.sentinels
    }

    /// Returns the underlying writers.
    pub fn into_inner(self) -> (E, D) {
        (self.events, self.diagnostics)
    }
}

fn write_event(out: &mut impl Write, line: &str) -> Result<(), ProtocolError> {
    writeln!(out, "{line}")
        .and_then(|()| out.flush())
        .map_err(|e| ProtocolError::emit(EVENT_CHANNEL, e))
}

fn write_report(out: &mut impl Write, marker: &str, report: &ErrorReport) -> std::io::Result<()> {
    writeln!(out, "{marker}")?;
    writeln!(out, "{}", report.message)?;
    for frame in &report.frames {
        writeln!(out, "{frame}")?;
    }
    out.flush()
}
