//! blockvm runtime - session control protocol and execution state machine.
//!
//! A worker reads a stream of script blocks from a line-oriented control
//! channel, runs each block inside one isolated session, and reports
//! per-block status and session lifecycle events back to its caller.
//!
//! # Layers
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  worker    : Worker (session loop until Stop / EOF)      │
//! ├──────────────────────────────────────────────────────────┤
//! │  protocol  : ProtocolMachine, ControlReader, Emitter     │
//! ├──────────────────────────────────────────────────────────┤
//! │  session   : SessionManager, Session (scoped teardown)   │
//! │  executor  : execute (compile, then run)                 │
//! │  report    : check_error (fault -> ErrorReport)          │
//! ├──────────────────────────────────────────────────────────┤
//! │  engine    : ScriptEngine / ExecutionContext / Fault     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine traits are the only seam to a concrete interpreter.
//! `blockvm-lua` provides the production implementation and
//! [`testing::FakeEngine`] a deterministic one for tests.
//!
//! # Wire format
//!
//! ```text
//! caller -> worker (stdin)          worker -> caller
//! ------------------------          ----------------------------------
//! mod.lua                           stderr: <P>_READY
//! x = 1                             stderr: <P>_SCRIPT_FINISHED
//! <P>_END_OF_BLOCK                  stdout: <P>_ERROR
//! <P>_END_OF_SCRIPT                 stdout: <message>
//!                                   stdout: <filename>:<line>  (0..n)
//! ```

pub mod client;
pub mod config;
pub mod engine;
pub mod executor;
pub mod protocol;
pub mod report;
pub mod session;
pub mod testing;
pub mod worker;

pub use client::{ClientError, WorkerClient, WorkerOutput};
pub use config::{ConfigError, ConfigLoader, ConfigResolver, WorkerConfig};
pub use engine::{EngineError, ExecutionContext, Fault, ScriptEngine};
pub use executor::{execute, execute_block};
pub use protocol::{
    ControlReader, Emitter, ProtocolError, ProtocolMachine, SentinelSet, SessionEnd, Signal,
};
pub use report::check_error;
pub use session::{Session, SessionError, SessionId, SessionManager};
pub use worker::{Worker, WorkerSummary};

pub use blockvm_types::{CodeBlock, ErrorReport, ExecutionOutcome, Frame, Terminator, Verdict};
