mod config;
mod error;
mod factory;
mod sandbox;
mod types;

pub use config::{ResourceLimits, SandboxConfig};
pub use error::{Result, SandboxError};
pub use factory::SandboxFactory;
pub use sandbox::Sandbox;
pub use types::{ExecStatus, ExecutionRequest, ExecutionResult, ExitInfo};
