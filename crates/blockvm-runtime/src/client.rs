//! Caller-side driver for a worker process.
//!
//! ```text
//!  WorkerClient                         worker process
//!  ────────────                         ──────────────
//!  send_block() ──── stdin ───────────►  filename / code / END_OF_BLOCK
//!  wait_ready() ◄─── stderr ──────────   READY | SCRIPT_FINISHED
//!  end_script() ──── stdin ───────────►  END_OF_SCRIPT
//!  finish()     ◄─── stdout (collected)  ERROR / message / file:line
//! ```
//!
//! Stdout is drained on a background thread for the whole life of the
//! worker so a chatty script can never block on a full pipe. Stderr
//! lines that are not sentinels (log output) are skipped.
//!
//! Killing the process is the only way to cancel a running block.

use crate::protocol::{parse_diagnostics, SentinelSet};
use blockvm_types::ErrorReport;
use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStderr, ChildStdin, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Errors raised while driving a worker.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The worker process could not be started.
    #[error("failed to spawn worker '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Reading from or writing to the worker failed.
    #[error("worker I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The session ended (a block failed) while waiting for `READY`.
    #[error("script finished before the block was acknowledged")]
    ScriptFinished,

    /// The worker closed its event channel.
    #[error("worker closed its event channel")]
    Disconnected,

    /// Input was already closed by [`WorkerClient::finish`].
    #[error("worker input is closed")]
    InputClosed,

    /// The stdout collector thread panicked.
    #[error("stdout collector panicked")]
    Collector,
}

impl ClientError {
    fn spawn(program: &OsStr, source: io::Error) -> Self {
        Self::Spawn {
            program: program.to_string_lossy().into_owned(),
            source,
        }
    }
}

/// Everything the worker produced after its input was closed.
#[derive(Debug)]
pub struct WorkerOutput {
    /// Exit status of the worker.
    pub status: ExitStatus,
    /// Full diagnostic/script output.
    pub stdout: String,
    /// Diagnostics parsed from `stdout`.
    pub reports: Vec<ErrorReport>,
    /// Sentinel events not consumed by a wait call.
    pub pending_events: Vec<String>,
}

/// Drives one worker process over its standard streams.
#[derive(Debug)]
pub struct WorkerClient {
    child: Child,
    stdin: Option<ChildStdin>,
    events: BufReader<ChildStderr>,
    collector: Option<JoinHandle<io::Result<Vec<u8>>>>,
    sentinels: SentinelSet,
    reaped: bool,
}

impl WorkerClient {
    /// Spawns `program` with `args` and piped standard streams.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Spawn`] if the process cannot be started.
    pub fn spawn<I, S>(
        program: impl AsRef<OsStr>,
        args: I,
        sentinels: SentinelSet,
    ) -> Result<Self, ClientError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(program);
        command.args(args);
        Self::from_command(command, sentinels)
    }

    /// Spawns a prepared command. Its standard streams are replaced by pipes.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Spawn`] if the process cannot be started.
    pub fn from_command(mut command: Command, sentinels: SentinelSet) -> Result<Self, ClientError> {
        let program = command.get_program().to_os_string();
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ClientError::spawn(&program, e))?;

        let missing = |name: &str| {
            ClientError::spawn(
                &program,
                io::Error::new(io::ErrorKind::BrokenPipe, format!("no {name} pipe")),
            )
        };
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;

        let collector = std::thread::spawn(move || {
            let mut stdout = stdout;
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).map(|_| buf)
        });
        debug!(pid = child.id(), "worker spawned");

        Ok(Self {
            child,
            stdin: Some(stdin),
            events: BufReader::new(stderr),
            collector: Some(collector),
            sentinels,
            reaped: false,
        })
    }

    /// OS process id of the worker.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Sends one block: filename, code, then the end-of-block sentinel.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] if the worker's input is broken, or
    /// [`ClientError::InputClosed`] after [`finish`](Self::finish).
    pub fn send_block(&mut self, filename: &str, code: &str) -> Result<(), ClientError> {
        let mut payload = String::with_capacity(filename.len() + code.len() + 64);
        payload.push_str(filename);
        payload.push('\n');
        payload.push_str(code);
        if !code.is_empty() && !code.ends_with('\n') {
            payload.push('\n');
        }
        payload.push_str(self.sentinels.end_of_block());
        payload.push('\n');
        self.write(&payload)
    }

    /// Sends the end-of-script sentinel.
    ///
    /// # Errors
    ///
    /// See [`send_block`](Self::send_block).
    pub fn end_script(&mut self) -> Result<(), ClientError> {
        let line = format!("{}\n", self.sentinels.end_of_script());
        self.write(&line)
    }

    /// Sends the end-of-interpreter sentinel.
    ///
    /// # Errors
    ///
    /// See [`send_block`](Self::send_block).
    pub fn end_interpreter(&mut self) -> Result<(), ClientError> {
        let line = format!("{}\n", self.sentinels.end_interpreter());
        self.write(&line)
    }

    /// Waits until the worker acknowledges the last block.
    ///
    /// A failed block ends the session at once. The worker then skips
    /// the rest of that script, so the caller should still close it with
    /// [`end_script`](Self::end_script) or
    /// [`end_interpreter`](Self::end_interpreter) before starting another.
    ///
    /// # Errors
    ///
    /// - [`ClientError::ScriptFinished`] if the session ended instead
    ///   (the block failed).
    /// - [`ClientError::Disconnected`] if the worker went away.
    pub fn wait_ready(&mut self) -> Result<(), ClientError> {
        loop {
            let line = self.next_event()?;
            if line == self.sentinels.ready() {
                return Ok(());
            }
            if line == self.sentinels.script_finished() {
                return Err(ClientError::ScriptFinished);
            }
        }
    }

    /// Waits until the worker reports the end of the session.
    ///
    /// Any `READY` events read on the way are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Disconnected`] if the worker went away.
    pub fn wait_script_finished(&mut self) -> Result<(), ClientError> {
        loop {
            if self.next_event()? == self.sentinels.script_finished() {
                return Ok(());
            }
        }
    }

    /// Closes the worker's input and collects everything it produced.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] if waiting on the process fails, or
    /// [`ClientError::Collector`] if the stdout collector died.
    pub fn finish(&mut self) -> Result<WorkerOutput, ClientError> {
        drop(self.stdin.take());

        let mut pending_events = Vec::new();
        let mut line = String::new();
        while self.events.read_line(&mut line)? > 0 {
            let event = line.trim_end_matches(['\n', '\r']);
            if self.is_event(event) {
                pending_events.push(event.to_string());
            }
            line.clear();
        }

        let stdout = match self.collector.take() {
            Some(handle) => handle.join().map_err(|_| ClientError::Collector)??,
            None => Vec::new(),
        };
        let status = self.child.wait()?;
        self.reaped = true;

        let stdout = String::from_utf8_lossy(&stdout).into_owned();
        let reports = parse_diagnostics(&stdout, &self.sentinels);
        debug!(%status, reports = reports.len(), "worker finished");
        Ok(WorkerOutput {
            status,
            stdout,
            reports,
            pending_events,
        })
    }

    /// Kills the worker, cancelling whatever it is running.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] if the process cannot be signalled
    /// or reaped.
    pub fn kill(&mut self) -> Result<ExitStatus, ClientError> {
        drop(self.stdin.take());
        if let Err(e) = self.child.kill() {
            // Already exited is fine; wait below reports the status.
            if e.kind() != io::ErrorKind::InvalidInput {
                return Err(e.into());
            }
        }
        let status = self.child.wait()?;
        self.reaped = true;
        debug!(%status, "worker killed");
        Ok(status)
    }

    fn write(&mut self, data: &str) -> Result<(), ClientError> {
        let stdin = self.stdin.as_mut().ok_or(ClientError::InputClosed)?;
        stdin.write_all(data.as_bytes())?;
        stdin.flush()?;
        Ok(())
    }

    /// Reads the next sentinel event, skipping log lines.
    fn next_event(&mut self) -> Result<String, ClientError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.events.read_line(&mut line)? == 0 {
                return Err(ClientError::Disconnected);
            }
            let event = line.trim_end_matches(['\n', '\r']);
            if self.is_event(event) {
                trace!(event, "worker event");
                return Ok(event.to_string());
            }
        }
    }

    fn is_event(&self, line: &str) -> bool {
        line == self.sentinels.ready() || line == self.sentinels.script_finished()
    }
}

impl Drop for WorkerClient {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        if let Err(e) = self.child.kill() {
            trace!(error = %e, "worker already exited");
        }
        if let Err(e) = self.child.wait() {
            warn!(error = %e, "failed to reap worker");
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> WorkerClient {
        WorkerClient::spawn("sh", ["-c", script], SentinelSet::with_prefix("T")).unwrap()
    }

    #[test]
    fn ready_then_finished() {
        let mut client = sh(
            "read f; echo 'log noise' >&2; echo T_READY >&2; \
             read l; echo T_SCRIPT_FINISHED >&2; cat > /dev/null",
        );
        client.send_block("m.lua", "x = 1").unwrap();
        client.wait_ready().unwrap();
        client.end_script().unwrap();
        client.wait_script_finished().unwrap();

        let out = client.finish().unwrap();
        assert!(out.status.success());
        assert!(out.reports.is_empty());
        assert!(out.pending_events.is_empty());
    }

    #[test]
    fn failure_surfaces_as_script_finished() {
        let mut client = sh(
            "read f; printf 'T_ERROR\\nboom\\nm.lua:3\\n'; \
             echo T_SCRIPT_FINISHED >&2; cat > /dev/null",
        );
        client.send_block("m.lua", "error('boom')\n").unwrap();
        assert!(matches!(client.wait_ready(), Err(ClientError::ScriptFinished)));

        let out = client.finish().unwrap();
        assert_eq!(out.reports.len(), 1);
        assert_eq!(out.reports[0].message, "boom");
        assert_eq!(out.reports[0].frames[0].to_string(), "m.lua:3");
    }

    #[test]
    fn disconnected_on_exit() {
        let mut client = sh("exit 0");
        assert!(matches!(client.wait_ready(), Err(ClientError::Disconnected)));
    }

    #[test]
    fn send_after_finish_is_rejected() {
        let mut client = sh("cat > /dev/null");
        client.finish().unwrap();
        assert!(matches!(client.end_script(), Err(ClientError::InputClosed)));
    }

    #[test]
    fn kill_cancels() {
        let mut client = sh("sleep 30");
        let status = client.kill().unwrap();
        assert!(!status.success());
    }

    #[test]
    fn spawn_failure() {
        let err = WorkerClient::spawn(
            "/nonexistent/blockvm-worker",
            std::iter::empty::<&str>(),
            SentinelSet::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ClientError::Spawn { .. }));
    }
}
