use std::time::Duration;

/// Per-execution resource ceilings. Enforced by the backend on every run;
/// a request may lower them but never raise them past the host policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Wall-clock timeout for the whole execution.
    pub timeout: Duration,
    /// Address-space ceiling in MiB.
    pub memory_mb: u32,
    /// Capture cap per stream (stdout and stderr each), in bytes.
    pub max_output_bytes: usize,
}

pub struct SandboxConfig {
    pub id: uuid::Uuid,
}
