//! The per-session protocol state machine.

use super::emitter::Emitter;
use super::error::ProtocolError;
use super::reader::ControlReader;
use super::sentinel::{SentinelSet, Signal};
use crate::engine::{ExecutionContext, ScriptEngine};
use crate::executor::execute_block;
use crate::session::{SessionId, SessionManager};
use blockvm_types::{CodeBlock, ExecutionOutcome, Terminator, Verdict};
use std::io::{BufRead, Write};
use tracing::{debug, info, trace};

/// Summary of one finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEnd {
    /// Session that ended.
    pub session: SessionId,
    /// Whether the worker should keep running.
    pub verdict: Verdict,
    /// What ended the session.
    pub terminator: Terminator,
    /// Whether a block failed.
    pub failed: bool,
    /// Blocks acknowledged with a `READY` event.
    pub blocks_completed: usize,
}

/// Drives sessions from a control channel.
#[derive(Debug)]
pub struct ProtocolMachine<R, E, D> {
    reader: ControlReader<R>,
    emitter: Emitter<E, D>,
    sentinels: SentinelSet,
}

impl<R: BufRead, E: Write, D: Write> ProtocolMachine<R, E, D> {
    /// Creates a machine reading `input` and writing to `emitter`.
    pub fn new(input: R, emitter: Emitter<E, D>) -> Self {
        let sentinels = emitter.sentinels().clone();
        Self {
            reader: ControlReader::new(input),
            emitter,
            sentinels,
        }
    }

    /// Blocks until more input is available or the stream ends.
    ///
    /// Returns `true` if the control channel has ended.
    pub fn at_end(&mut self) -> bool {
        self.reader.at_end()
    }

    /// Returns the emitter, consuming the machine.
    pub fn into_emitter(self) -> Emitter<E, D> {
        self.emitter
    }

    /// Runs one complete session.
    ///
    /// Opens a session and processes input lines until a session
    /// terminator, end of input, or the first failing block. At a
    /// terminator the trailing block runs. Then `SCRIPT_FINISHED` is
    /// emitted and the session is torn down. The teardown also happens
    /// when this returns early with an error.
    ///
    /// After a block failure the failed script's remaining lines are
    /// still on the stream; see [`skip_to_boundary`](Self::skip_to_boundary).
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::Session`] if no session could be allocated.
    /// - [`ProtocolError::Emit`] if an output channel fails.
    pub fn run_session<G: ScriptEngine>(
        &mut self,
        sessions: &mut SessionManager<G>,
    ) -> Result<SessionEnd, ProtocolError> {
        let (session, namespace) = sessions.begin_session()?;
        let context = session.context();

        let mut pending: Option<CodeBlock> = None;
        let mut blocks_completed = 0;

        let terminator = loop {
            let Some(line) = self.reader.next_line() else {
                debug!(session = %session.id(), "control channel closed");
                break Terminator::EndOfInput;
            };
            let signal = self.sentinels.classify(&line);
            if let Some(terminator) = signal.and_then(Signal::terminator) {
                break terminator;
            }

            match (pending.take(), signal) {
                (None, _) if line.is_empty() => {}
                (None, _) => pending = Some(CodeBlock::new(line)),
                (Some(block), Some(Signal::EndOfBlock)) => {
                    if !self.run_block(context, &block, &namespace)? {
                        break Terminator::BlockFailure;
                    }
                    blocks_completed += 1;
                    self.emitter.ready()?;
                }
                (Some(mut block), _) => {
                    block.push_line(&line);
                    pending = Some(block);
                }
            }
        };

        let failed = match (terminator, pending) {
            (Terminator::BlockFailure, _) => true,
            (_, Some(block)) => !self.run_block(context, &block, &namespace)?,
            (_, None) => false,
        };

        self.emitter.script_finished()?;

        let end = SessionEnd {
            session: session.id(),
            verdict: terminator.verdict(),
            terminator,
            failed,
            blocks_completed,
        };
        session.end();

        info!(
            session = %end.session,
            verdict = ?end.verdict,
            terminator = ?end.terminator,
            failed = end.failed,
            blocks = end.blocks_completed,
            "session ended"
        );
        Ok(end)
    }

    /// Discards the rest of a failed script.
    ///
    /// Reads up to and including the next end-of-script or
    /// end-of-interpreter sentinel so the next session starts on a script
    /// boundary. Returns the boundary found (or [`Terminator::EndOfInput`])
    /// and the number of lines discarded.
    pub fn skip_to_boundary(&mut self) -> (Terminator, usize) {
        let mut discarded = 0;
        while let Some(line) = self.reader.next_line() {
            if let Some(terminator) = self
                .sentinels
                .classify(&line)
                .and_then(Signal::terminator)
            {
                debug!(discarded, terminator = ?terminator, "resynchronized");
                return (terminator, discarded);
            }
            trace!("discarding line of failed script");
            discarded += 1;
        }
        (Terminator::EndOfInput, discarded)
    }

    /// Executes one block, reporting a failure on the diagnostic channel.
    ///
    /// Returns `true` when the block succeeded (or was empty).
    fn run_block<C: ExecutionContext>(
        &mut self,
        context: &C,
        block: &CodeBlock,
        namespace: &C::Namespace,
    ) -> Result<bool, ProtocolError> {
        if block.is_empty() {
            return Ok(true);
        }
        debug!(
            filename = block.filename(),
            lines = block.line_count(),
            "executing block"
        );
        match execute_block(context, block, namespace) {
            ExecutionOutcome::Success => Ok(true),
            ExecutionOutcome::Failure(report) => {
                self.emitter.report(&report)?;
                Ok(false)
            }
        }
    }
}
