//! Diagnostic channel parsing, for callers reading worker output.

use super::sentinel::SentinelSet;
use blockvm_types::{ErrorReport, Frame};

/// Extracts every diagnostic report from captured diagnostic output.
///
/// A report starts at the error marker line; the next line is the
/// message, and the following `filename:line` lines are its frames. Any
/// other line (script output) ends the frame list and is skipped.
///
/// Script output that happens to look like `name:123` directly after a
/// report is indistinguishable from a frame; the format has no escaping.
#[must_use]
pub fn parse_diagnostics(output: &str, sentinels: &SentinelSet) -> Vec<ErrorReport> {
    let mut reports = Vec::new();
    let mut lines = output.lines().peekable();

    while let Some(line) = lines.next() {
        if line != sentinels.error() {
            continue;
        }
        let message = lines.next().unwrap_or_default();
        let mut frames = Vec::new();
        while let Some(frame) = lines.peek().and_then(|l| parse_frame(l)) {
            frames.push(frame);
            lines.next();
        }
        reports.push(ErrorReport::new(message).with_frames(frames));
    }

    reports
}

fn parse_frame(line: &str) -> Option<Frame> {
    let (filename, number) = line.rsplit_once(':')?;
    if filename.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let number: u32 = number.parse().ok()?;
    (number > 0).then(|| Frame::new(filename, number))
}
