#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("interpreter not available: {0}")]
    InterpreterNotAvailable(String),

    #[error("sandbox creation failed: {0}")]
    CreationFailed(String),

    #[error("spawn failed: {0}")]
    SpawnFailed(String),

    #[error("execution failed: {0}")]
    ExecFailed(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SandboxError>;
