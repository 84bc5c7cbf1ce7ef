//! Code block execution.

use crate::engine::ExecutionContext;
use crate::report::{check_error, report_fault};
use blockvm_types::{CodeBlock, ExecutionOutcome};
use tracing::debug;

/// Compiles `source` as a unit named `filename` and runs it against
/// `namespace`.
///
/// A unit that fails to compile is never executed. An empty `source` is
/// a successful no-op. The only side effects are the mutations the unit
/// makes to `namespace`.
pub fn execute<C: ExecutionContext>(
    context: &C,
    source: &str,
    filename: &str,
    namespace: &C::Namespace,
) -> ExecutionOutcome {
    if source.is_empty() {
        return ExecutionOutcome::Success;
    }

    let unit = match context.compile(source, filename) {
        Ok(unit) => unit,
        Err(fault) => {
            let report = report_fault(fault);
            debug!(filename, message = %report.message, "compile failed");
            return ExecutionOutcome::Failure(report);
        }
    };

    match check_error(context.execute(unit, namespace).err()) {
        Some(report) => {
            debug!(
                filename,
                message = %report.message,
                depth = report.frames.len(),
                "execution failed"
            );
            ExecutionOutcome::Failure(report)
        }
        None => ExecutionOutcome::Success,
    }
}

/// Runs an accumulated [`CodeBlock`].
pub fn execute_block<C: ExecutionContext>(
    context: &C,
    block: &CodeBlock,
    namespace: &C::Namespace,
) -> ExecutionOutcome {
    execute(context, block.source(), block.filename(), namespace)
}
