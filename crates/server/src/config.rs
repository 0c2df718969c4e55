use std::time::Duration;

/// Host-side policy for what a single request may ask for. The values double
/// as defaults when the request leaves a limit unspecified and as ceilings
/// when it doesn't.
#[derive(Debug, Clone)]
pub struct LimitPolicy {
    /// Maximum accepted `code` size in bytes.
    pub max_code_bytes: usize,
    /// Default and maximum wall-clock timeout.
    pub timeout: Duration,
    /// Default and maximum memory ceiling in MiB.
    pub memory_mb: u32,
    /// Capture cap per output stream in bytes.
    pub max_output_bytes: usize,
}
