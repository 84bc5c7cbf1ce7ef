//! Shared data types for the blockvm worker.
//!
//! These types carry no engine knowledge. They describe what flows
//! between the control channel, the executor and the caller:
//!
//! - [`CodeBlock`]: one filename-tagged unit of source text
//! - [`ErrorReport`] / [`Frame`]: a structured execution failure
//! - [`ExecutionOutcome`]: the result of running one block
//! - [`Verdict`] / [`Terminator`]: how a session ended

mod block;
mod outcome;
mod report;

pub use block::CodeBlock;
pub use outcome::{ExecutionOutcome, Terminator, Verdict};
pub use report::{ErrorReport, Frame};
