use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sandbox::{Sandbox, SandboxConfig, SandboxError, SandboxFactory};
use tracing::{info, warn};

use crate::config::ProcessConfig;
use crate::sandbox::ProcessSandbox;

pub struct ProcessFactory {
    config: ProcessConfig,
    /// Resolved at startup; `None` before `startup()` and after `shutdown()`.
    interpreter: Option<PathBuf>,
}

impl ProcessFactory {
    /// Create a new factory without touching the filesystem.
    /// Call `startup()` to resolve the interpreter before use.
    pub fn new(config: ProcessConfig) -> Self {
        Self {
            config,
            interpreter: None,
        }
    }

    /// # Panics
    /// Panics if called before `startup()` — this is a programming error.
    #[allow(clippy::expect_used)]
    fn interpreter(&self) -> &Path {
        self.interpreter.as_deref().expect("factory not started")
    }

    fn sessions_dir(&self) -> PathBuf {
        self.config.base_dir.join("sessions")
    }
}

#[async_trait]
impl SandboxFactory for ProcessFactory {
    fn name(&self) -> &str {
        "process"
    }

    async fn startup(&mut self) -> sandbox::Result<()> {
        if self.interpreter.is_some() {
            return Err(SandboxError::CreationFailed(
                "factory already started".into(),
            ));
        }

        let interpreter = if self.config.interpreter.is_absolute() {
            tokio::fs::canonicalize(&self.config.interpreter)
                .await
                .map_err(|e| {
                    SandboxError::InterpreterNotAvailable(format!(
                        "{}: {e}",
                        self.config.interpreter.display()
                    ))
                })?
        } else {
            which::which(&self.config.interpreter).map_err(|e| {
                SandboxError::InterpreterNotAvailable(format!(
                    "{}: {e}",
                    self.config.interpreter.display()
                ))
            })?
        };

        tokio::fs::create_dir_all(self.sessions_dir())
            .await
            .map_err(|e| SandboxError::CreationFailed(format!("mkdir sessions: {e}")))?;

        info!(interpreter = %interpreter.display(), "factory started");
        self.interpreter = Some(interpreter);
        Ok(())
    }

    async fn create(&self, config: SandboxConfig) -> sandbox::Result<Box<dyn Sandbox>> {
        let id = config.id.to_string();

        let workdir = tempfile::Builder::new()
            .prefix(&format!("{id}-"))
            .tempdir_in(self.sessions_dir())
            .map_err(|e| SandboxError::CreationFailed(format!("session dir: {e}")))?;

        info!(id = %id, "session created");

        Ok(Box::new(ProcessSandbox::new(
            id,
            self.interpreter().to_path_buf(),
            workdir,
        )))
    }

    async fn destroy(&self, sandbox: Box<dyn Sandbox>) {
        let mut sandbox = match (sandbox as Box<dyn std::any::Any>).downcast::<ProcessSandbox>() {
            Ok(s) => *s,
            Err(_) => {
                warn!("destroy called with non-process sandbox, ignoring");
                return;
            }
        };

        // Ensure the child is dead before deleting its working directory.
        let _ = sandbox.kill().await;

        let ProcessSandbox { id, workdir, .. } = sandbox;
        if let Err(e) = workdir.close() {
            warn!(id = %id, error = %e, "failed to delete session dir");
        }

        info!(id = %id, "session destroyed");
    }

    async fn shutdown(&mut self) {
        self.interpreter = None;
        info!("factory shutdown complete");
    }
}
