//! Control channel line reader.

use std::io::BufRead;
use tracing::warn;

/// Reads the control channel one logical line at a time.
///
/// The `\n` terminator and one trailing `\r` are stripped. Invalid UTF-8
/// is decoded lossily. A read error is logged and treated like end of
/// input, so a broken pipe never hangs the worker.
#[derive(Debug)]
pub struct ControlReader<R> {
    inner: R,
    buf: Vec<u8>,
    exhausted: bool,
    lines_read: u64,
}

impl<R: BufRead> ControlReader<R> {
    /// Wraps a buffered reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(256),
            exhausted: false,
            lines_read: 0,
        }
    }

    /// Returns the next line, or `None` once the stream is exhausted.
    pub fn next_line(&mut self) -> Option<String> {
        if self.exhausted {
            return None;
        }

        self.buf.clear();
        match self.inner.read_until(b'\n', &mut self.buf) {
            Ok(0) => {
                self.exhausted = true;
                None
            }
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                }
                if self.buf.last() == Some(&b'\r') {
                    self.buf.pop();
                }
                self.lines_read += 1;
                Some(String::from_utf8_lossy(&self.buf).into_owned())
            }
            Err(e) => {
                warn!(error = %e, "control channel read failed, treating as end of input");
                self.exhausted = true;
                None
            }
        }
    }

    /// Waits for more input without consuming it.
    ///
    /// Returns `true` (and marks the reader exhausted) if the stream has
    /// ended, `false` if at least one more byte is available.
    pub fn at_end(&mut self) -> bool {
        if self.exhausted {
            return true;
        }
        match self.inner.fill_buf() {
            Ok(buf) if !buf.is_empty() => false,
            Ok(_) => {
                self.exhausted = true;
                true
            }
            Err(e) => {
                warn!(error = %e, "control channel read failed, treating as end of input");
                self.exhausted = true;
                true
            }
        }
    }

    /// Returns `true` once end of input has been observed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Lines returned so far.
    #[must_use]
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }
}
