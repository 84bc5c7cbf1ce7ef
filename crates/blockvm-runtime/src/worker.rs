//! Worker loop: serves sessions until told to stop.

use crate::engine::ScriptEngine;
use crate::protocol::{Emitter, ProtocolError, ProtocolMachine, SessionEnd};
use crate::session::SessionManager;
use blockvm_types::{Terminator, Verdict};
use std::io::{BufRead, Write};
use tracing::{debug, info};

/// What a worker did before it stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    /// Sessions run to completion.
    pub sessions: u64,
    /// Sessions in which a block failed.
    pub failed_sessions: u64,
    /// Terminator of the last script, if any ran.
    pub last_terminator: Option<Terminator>,
    /// Lines skipped after failed blocks.
    pub lines_discarded: usize,
}

impl WorkerSummary {
    fn record(&mut self, end: &SessionEnd) {
        self.sessions += 1;
        if end.failed {
            self.failed_sessions += 1;
        }
        self.last_terminator = Some(end.terminator);
    }
}

/// Runs sessions from one control channel against one engine.
///
/// Exactly one session is live at a time. The loop ends when a script
/// ends with [`Verdict::Stop`], when the control channel is exhausted, or
/// after the first session in [`once`](Self::once) mode.
///
/// When a block fails, the session ends immediately and the rest of that
/// script is skipped up to its terminator. An end-of-interpreter found
/// while skipping still stops the worker.
#[derive(Debug)]
pub struct Worker<G: ScriptEngine, R, E, D> {
    sessions: SessionManager<G>,
    machine: ProtocolMachine<R, E, D>,
    once: bool,
}

impl<G, R, E, D> Worker<G, R, E, D>
where
    G: ScriptEngine,
    R: BufRead,
    E: Write,
    D: Write,
{
    /// Creates a worker serving `input` with `engine`.
    pub fn new(engine: G, input: R, emitter: Emitter<E, D>) -> Self {
        Self {
            sessions: SessionManager::new(engine),
            machine: ProtocolMachine::new(input, emitter),
            once: false,
        }
    }

    /// Stops after a single session regardless of its verdict.
    #[must_use]
    pub fn once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    /// Serves sessions until the worker should stop.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProtocolError`]: a session could not be
    /// allocated, or an output channel failed.
    pub fn run(&mut self) -> Result<WorkerSummary, ProtocolError> {
        let mut summary = WorkerSummary::default();
        loop {
            let end = self.machine.run_session(&mut self.sessions)?;
            summary.record(&end);

            if self.once {
                debug!("single-session mode");
                break;
            }

            let verdict = if end.terminator == Terminator::BlockFailure {
                let (boundary, discarded) = self.machine.skip_to_boundary();
                summary.lines_discarded += discarded;
                summary.last_terminator = Some(boundary);
                boundary.verdict()
            } else {
                end.verdict
            };

            if verdict == Verdict::Stop {
                debug!("stop requested");
                break;
            }
            if self.machine.at_end() {
                debug!("control channel exhausted");
                break;
            }
        }
        info!(
            sessions = summary.sessions,
            failed = summary.failed_sessions,
            "worker stopped"
        );
        Ok(summary)
    }

    /// Session manager, for inspection after [`run`](Self::run).
    #[must_use]
    pub fn sessions(&self) -> &SessionManager<G> {
        &self.sessions
    }

    /// Returns the emitter, consuming the worker.
    pub fn into_emitter(self) -> Emitter<E, D> {
        self.machine.into_emitter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SentinelSet;
    use crate::testing::FakeEngine;
    use std::io::Cursor;

    type TestWorker = Worker<FakeEngine, Cursor<String>, Vec<u8>, Vec<u8>>;

    fn worker(engine: FakeEngine, input: &str) -> TestWorker {
        let emitter = Emitter::new(Vec::new(), Vec::new(), SentinelSet::with_prefix("W"));
        Worker::new(engine, Cursor::new(input.to_string()), emitter)
    }

    fn events(w: TestWorker) -> String {
        let (events, _) = w.into_emitter().into_inner();
        String::from_utf8(events).unwrap()
    }

    #[test]
    fn serves_sessions_until_end_interpreter() {
        let input = "\
a.fake\nlet x = 1\nW_END_OF_BLOCK\nW_END_OF_SCRIPT\n\
b.fake\nfail oops\nW_END_OF_SCRIPT\n\
c.fake\nlet y = 2\nW_END_OF_BLOCK\nW_END_INTERPRETER\n\
d.fake\nlet never = 1\nW_END_OF_SCRIPT\n";
        let engine = FakeEngine::new();
        let stats = engine.stats();
        let mut w = worker(engine, input);

        let summary = w.run().unwrap();
        assert_eq!(summary.sessions, 3);
        assert_eq!(summary.failed_sessions, 1);
        assert_eq!(summary.last_terminator, Some(Terminator::EndOfInterpreter));
        assert_eq!(stats.created(), 3);
        assert_eq!(stats.destroyed(), 3);
        assert!(w.sessions().active().is_none());
        assert_eq!(
            events(w),
            "W_READY\nW_SCRIPT_FINISHED\nW_SCRIPT_FINISHED\nW_READY\nW_SCRIPT_FINISHED\n"
        );
    }

    #[test]
    fn failed_script_is_skipped_to_its_terminator() {
        let input = "\
a.fake\nfail early\nW_END_OF_BLOCK\nb.fake\nlet lost = 1\nW_END_OF_BLOCK\nW_END_OF_SCRIPT\n\
c.fake\nlet kept = 1\nW_END_OF_BLOCK\nW_END_OF_SCRIPT\n";
        let engine = FakeEngine::new();
        let stats = engine.stats();
        let mut w = worker(engine, input);

        let summary = w.run().unwrap();
        assert_eq!(summary.sessions, 2);
        assert_eq!(summary.failed_sessions, 1);
        assert_eq!(summary.lines_discarded, 3);
        let namespaces = stats.closed_namespaces();
        assert_eq!(namespaces[1].get("kept"), Some(1));
        assert_eq!(namespaces[1].get("lost"), None);
        assert_eq!(events(w), "W_SCRIPT_FINISHED\nW_READY\nW_SCRIPT_FINISHED\n");
    }

    #[test]
    fn failed_script_ending_interpreter_stops() {
        let input = "\
a.fake\nfail early\nW_END_OF_BLOCK\nb.fake\nW_END_INTERPRETER\n\
c.fake\nlet never = 1\nW_END_OF_SCRIPT\n";
        let mut w = worker(FakeEngine::new(), input);

        let summary = w.run().unwrap();
        assert_eq!(summary.sessions, 1);
        assert_eq!(summary.last_terminator, Some(Terminator::EndOfInterpreter));
        assert_eq!(events(w), "W_SCRIPT_FINISHED\n");
    }

    #[test]
    fn stops_when_input_exhausted() {
        let mut w = worker(FakeEngine::new(), "a.fake\nlet x = 1\nW_END_OF_SCRIPT\n");
        let summary = w.run().unwrap();
        assert_eq!(summary.sessions, 1);
        assert_eq!(summary.last_terminator, Some(Terminator::EndOfScript));
    }

    #[test]
    fn empty_input_runs_one_session() {
        let mut w = worker(FakeEngine::new(), "");
        let summary = w.run().unwrap();
        assert_eq!(summary.sessions, 1);
        assert_eq!(summary.last_terminator, Some(Terminator::EndOfInput));
        assert_eq!(events(w), "W_SCRIPT_FINISHED\n");
    }

    #[test]
    fn once_mode_serves_a_single_session() {
        let input = "W_END_OF_SCRIPT\nW_END_OF_SCRIPT\n";
        let mut w = worker(FakeEngine::new(), input).once(true);
        let summary = w.run().unwrap();
        assert_eq!(summary.sessions, 1);
    }

    #[test]
    fn allocation_failure_aborts() {
        let input = "W_END_OF_SCRIPT\nW_END_OF_SCRIPT\nW_END_OF_SCRIPT\n";
        let mut w = worker(FakeEngine::with_allocation_budget(2), input);
        let err = w.run().unwrap_err();
        assert!(err.is_startup_failure());
        assert_eq!(w.sessions().sessions_started(), 2);
    }
}
