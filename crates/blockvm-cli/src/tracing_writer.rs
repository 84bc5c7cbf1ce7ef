//! Tracing writers for the worker's log targets.
//!
//! Stderr doubles as the protocol's event channel, so every log record
//! must reach it as one whole line. Both writers buffer one formatted
//! event and write it with a single call on [`Drop`]:
//!
//! - [`StderrMakeWriter`]: default target. Callers skip non-sentinel lines.
//! - [`FileMakeWriter`]: appends to the log file. The file layer should be
//!   configured with `.with_ansi(false)` so no ANSI stripping is needed.

use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Stderr writer
// ---------------------------------------------------------------------------

/// [`MakeWriter`](tracing_subscriber::fmt::MakeWriter) for stderr logging.
#[derive(Clone, Copy, Debug, Default)]
pub struct StderrMakeWriter;

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for StderrMakeWriter {
    type Writer = StderrWriter;

    fn make_writer(&'a self) -> Self::Writer {
        StderrWriter {
            buf: Vec::with_capacity(256),
        }
    }
}

/// Per-event writer for stderr.
pub struct StderrWriter {
    buf: Vec<u8>,
}

impl Write for StderrWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for StderrWriter {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let mut stderr = io::stderr().lock();
        let _ = stderr.write_all(&self.buf);
        let _ = stderr.flush();
    }
}

// ---------------------------------------------------------------------------
// File writer
// ---------------------------------------------------------------------------

/// [`MakeWriter`](tracing_subscriber::fmt::MakeWriter) for the log file.
#[derive(Clone)]
pub struct FileMakeWriter {
    file: Arc<Mutex<File>>,
}

impl FileMakeWriter {
    pub fn new(file: Arc<Mutex<File>>) -> Self {
        Self { file }
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FileMakeWriter {
    type Writer = FileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        FileWriter {
            file: Arc::clone(&self.file),
            buf: Vec::with_capacity(256),
        }
    }
}

/// Per-event writer for file output.
///
/// Buffers bytes from the tracing formatter. On [`Drop`], appends
/// the buffer to the log file under a lock.
pub struct FileWriter {
    file: Arc<Mutex<File>>,
    buf: Vec<u8>,
}

impl Write for FileWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for FileWriter {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }

        let mut file = self.file.lock();
        let _ = file.write_all(&self.buf);
        let _ = file.flush();
    }
}

/// Opens `path` for appending, creating parent directories.
///
/// # Errors
///
/// Returns the I/O error if the directory or file cannot be created.
pub fn open_log_file(path: &Path) -> io::Result<Arc<Mutex<File>>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    Ok(Arc::new(Mutex::new(file)))
}
