use sandbox::{ExecStatus, ExecutionResult};
use serde::Serialize;

/// Wire shape of one finished execution.
#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub output: String,
    pub status: &'static str,
    pub truncated: bool,
}

/// Map a finished execution onto the wire shape. Never fails — every
/// outcome, including faults in the submitted code, is represented as data.
///
/// For runtime faults the caller expects to see "their" error, so the fault
/// text (stderr) becomes the output; everything else reports stdout.
pub fn report(result: ExecutionResult) -> ExecuteResponse {
    let output = match result.status {
        ExecStatus::RuntimeError if !result.stderr.is_empty() => result.stderr,
        _ => result.stdout,
    };
    ExecuteResponse {
        output,
        status: result.status.as_str(),
        truncated: result.truncated,
    }
}
