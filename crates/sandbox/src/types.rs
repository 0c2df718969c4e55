use std::time::Duration;

use crate::config::ResourceLimits;

/// A validated execution request. Immutable once produced by the validator.
#[derive(Debug)]
pub struct ExecutionRequest {
    /// Source text handed to the interpreter.
    pub code: String,
    /// Effective limits after clamping against host policy.
    pub limits: ResourceLimits,
}

/// Terminal outcome of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
    Success,
    Timeout,
    ResourceExceeded,
    RuntimeError,
    InternalError,
}

impl ExecStatus {
    /// Wire name, also used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Timeout => "Timeout",
            Self::ResourceExceeded => "ResourceExceeded",
            Self::RuntimeError => "RuntimeError",
            Self::InternalError => "InternalError",
        }
    }
}

impl std::fmt::Display for ExecStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the child process exited.
#[derive(Debug, Clone, Copy)]
pub struct ExitInfo {
    /// Exit code, with signal deaths mapped to `128 + signal`.
    pub code: i32,
    /// Terminating signal, if any.
    pub signal: Option<i32>,
    /// Wall-clock duration of the execution.
    pub duration: Duration,
}

/// Outcome of one sandbox run. Built once per request and never mutated
/// afterwards; owned by the reporter until serialized.
#[derive(Debug)]
pub struct ExecutionResult {
    pub status: ExecStatus,
    /// Captured stdout, capped at `max_output_bytes`.
    pub stdout: String,
    /// Captured stderr, capped at `max_output_bytes`.
    pub stderr: String,
    /// True when either stream hit the capture cap.
    pub truncated: bool,
    pub exit: ExitInfo,
}
