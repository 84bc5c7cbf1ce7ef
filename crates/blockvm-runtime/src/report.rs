//! Error reporting.
//!
//! Turns a pending [`Fault`] into an [`ErrorReport`]. Never fails: a value
//! that cannot be rendered still yields a best-effort report.

use crate::engine::Fault;
use blockvm_types::ErrorReport;
use tracing::warn;

/// Message used when the raised value cannot be rendered.
pub const UNPRINTABLE_MESSAGE: &str = "<unprintable error object>";

/// Drains a pending fault into a report.
///
/// Returns `None` when nothing is pending.
///
/// # Example
///
/// ```
/// use blockvm_runtime::check_error;
/// use blockvm_runtime::testing::FakeFault;
///
/// assert!(check_error::<FakeFault>(None).is_none());
///
/// let report = check_error(Some(FakeFault::compile("bad token"))).unwrap();
/// assert_eq!(report.message, "bad token");
/// assert!(report.frames.is_empty());
/// ```
#[must_use]
pub fn check_error<F: Fault>(pending: Option<F>) -> Option<ErrorReport> {
    pending.map(report_fault)
}

/// Converts a fault into a report, consuming it.
#[must_use]
pub fn report_fault<F: Fault>(fault: F) -> ErrorReport {
    let message = fault.render().unwrap_or_else(|e| {
        warn!(error = %e, "failed to render error value");
        UNPRINTABLE_MESSAGE.to_string()
    });

    // Line numbers are positive; anything else is not a real frame.
    let frames = fault
        .traceback()
        .into_iter()
        .filter(|frame| frame.line > 0)
        .collect();

    ErrorReport::new(message).with_frames(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeFault;
    use blockvm_types::Frame;

    #[test]
    fn nothing_pending() {
        assert!(check_error::<FakeFault>(None).is_none());
    }

    #[test]
    fn runtime_fault_keeps_frame_order() {
        let fault = FakeFault::runtime(
            "boom",
            vec![Frame::new("main.lua", 3), Frame::new("lib.lua", 7)],
        );
        let report = check_error(Some(fault)).unwrap();
        assert_eq!(report.message, "boom");
        assert_eq!(
            report.frames,
            vec![Frame::new("main.lua", 3), Frame::new("lib.lua", 7)]
        );
    }

    #[test]
    fn unrenderable_value_yields_best_effort_message() {
        let fault = FakeFault::unprintable(vec![Frame::new("m.lua", 1)]);
        let report = report_fault(fault);
        assert_eq!(report.message, UNPRINTABLE_MESSAGE);
        assert_eq!(report.frames, vec![Frame::new("m.lua", 1)]);
    }

    #[test]
    fn zero_line_frames_are_dropped() {
        let fault = FakeFault::runtime("x", vec![Frame::new("m.lua", 0), Frame::new("m.lua", 2)]);
        let report = report_fault(fault);
        assert_eq!(report.frames, vec![Frame::new("m.lua", 2)]);
    }
}
