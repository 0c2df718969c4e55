use std::any::Any;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ExecutionRequest, ExecutionResult};

/// One isolated execution session. Exactly one exists per in-flight request
/// and it never outlives the request's response.
///
/// The `Any` bound allows `SandboxFactory::destroy()` to downcast
/// `Box<dyn Sandbox>` back to the concrete type for backend-specific cleanup.
#[async_trait]
pub trait Sandbox: Send + Sync + Any {
    fn id(&self) -> &str;

    /// Run the submitted code to completion under the request's limits.
    ///
    /// Expected outcomes of untrusted code (timeout, resource-limit kill,
    /// runtime fault) are returned as data in the [`ExecutionResult`]; only
    /// host-side failures (spawn, IO) surface as errors.
    async fn run(&mut self, request: &ExecutionRequest) -> Result<ExecutionResult>;

    /// Forcibly terminate the underlying process, if one is still alive.
    /// Idempotent; called on every teardown path.
    async fn kill(&mut self) -> Result<()>;
}
