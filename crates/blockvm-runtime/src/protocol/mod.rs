//! Session control protocol.
//!
//! # State machine
//!
//! ```text
//!                 any line (non-empty)
//!  AWAITING_FILENAME ─────────────────────► ACCUMULATING_BLOCK ◄──┐
//!        ▲                                     │      │  other     │
//!        │  READY (block ok)                   │      └────────────┘
//!        └──────────── EXECUTING ◄─────────────┘ END_OF_BLOCK
//!                          │ failure (ERROR report)
//!                          ▼
//!  END_OF_SCRIPT / END_INTERPRETER / EOF ──► SESSION END
//!    trailing block run (unless failed), SCRIPT_FINISHED, teardown
//! ```
//!
//! One input line is fully processed, including any block execution,
//! before the next line is read. A failing block ends the session at
//! once; the lines left over from that script are skipped up to its
//! terminator before the next session starts.

mod emitter;
mod error;
mod machine;
mod reader;
mod sentinel;
mod wire;

pub use emitter::Emitter;
pub use error::ProtocolError;
pub use machine::{ProtocolMachine, SessionEnd};
pub use reader::ControlReader;
pub use sentinel::{SentinelSet, Signal, DEFAULT_PREFIX};
pub use wire::parse_diagnostics;
