use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use sandbox::{
    ExecStatus, ExecutionRequest, ExecutionResult, ExitInfo, Result, Sandbox, SandboxError,
};
use tempfile::TempDir;
use tokio::process::{Child, Command};
use tracing::debug;

use crate::capture::{self, Captured};
use crate::{limits, process};

/// Environment variables forwarded into the child; everything else is dropped.
const ENV_ALLOWLIST: [&str; 3] = ["PATH", "LANG", "TZ"];

/// File the submitted code is written to inside the session directory.
const CODE_FILE: &str = "main.py";

/// One session: an exclusive working directory plus (while running) the
/// interpreter child. The session owns both; nothing is shared across
/// requests.
pub struct ProcessSandbox {
    pub(crate) id: String,
    /// Deleted on destroy; also cleaned up by `Drop` as a backstop.
    pub(crate) workdir: TempDir,
    interpreter: PathBuf,
    child: Option<Child>,
}

impl ProcessSandbox {
    pub(crate) fn new(id: String, interpreter: PathBuf, workdir: TempDir) -> Self {
        Self {
            id,
            workdir,
            interpreter,
            child: None,
        }
    }

    /// Wait for the child with a wall-clock watchdog. On expiry the whole
    /// process group is SIGKILLed and then reaped, so the pipes close and
    /// the capture tasks see EOF. Returns the exit status and whether the
    /// watchdog fired.
    async fn wait_with_watchdog(&mut self, timeout: Duration) -> Result<(ExitStatus, bool)> {
        let Some(child) = self.child.as_mut() else {
            return Err(SandboxError::ExecFailed("no child to wait on".into()));
        };
        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => Ok((status, false)),
            Ok(Err(e)) => {
                process::kill_process_group(child);
                Err(SandboxError::Io(e))
            }
            Err(_) => {
                process::kill_process_group(child);
                let status = child.wait().await?;
                Ok((status, true))
            }
        }
    }
}

#[async_trait]
impl Sandbox for ProcessSandbox {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&mut self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        let code_path = self.workdir.path().join(CODE_FILE);
        tokio::fs::write(&code_path, request.code.as_bytes()).await?;

        let mut cmd = Command::new(&self.interpreter);
        cmd.arg("-I")
            .arg(&code_path)
            .current_dir(self.workdir.path())
            .env_clear()
            .envs(allowlisted_env())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Own process group so the watchdog can kill the whole tree.
            .process_group(0)
            // Backstop: a dropped session (cancelled request, server
            // shutdown) must not leak the child.
            .kill_on_drop(true);

        let memory_mb = request.limits.memory_mb;
        let cpu_secs = limits::cpu_seconds(request.limits.timeout);
        // SAFETY: the closure only calls setrlimit, which is async-signal-safe.
        unsafe {
            cmd.pre_exec(move || limits::apply(memory_mb, cpu_secs));
        }

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|e| {
            SandboxError::SpawnFailed(format!("{}: {e}", self.interpreter.display()))
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SandboxError::SpawnFailed("stdout pipe missing".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SandboxError::SpawnFailed("stderr pipe missing".into()))?;

        let cap = request.limits.max_output_bytes;
        let stdout_task = tokio::spawn(capture::drain_capped(stdout, cap));
        let stderr_task = tokio::spawn(capture::drain_capped(stderr, cap));

        // Keep the handle on self so kill() can still reach the group if
        // this future is dropped mid-wait.
        self.child = Some(child);
        let (status, timed_out) = self.wait_with_watchdog(request.limits.timeout).await?;
        self.child = None;

        let stdout = stdout_task
            .await
            .map_err(|e| SandboxError::ExecFailed(format!("stdout capture: {e}")))??;
        let stderr = stderr_task
            .await
            .map_err(|e| SandboxError::ExecFailed(format!("stderr capture: {e}")))??;

        let result = classify(status, timed_out, stdout, stderr, started.elapsed());
        debug!(id = %self.id, status = %result.status, code = result.exit.code, "execution classified");
        Ok(result)
    }

    async fn kill(&mut self) -> Result<()> {
        if let Some(child) = self.child.as_mut() {
            process::kill_process_group(child);
            let _ = child.wait().await;
            self.child = None;
        }
        Ok(())
    }
}

fn allowlisted_env() -> impl Iterator<Item = (String, String)> {
    std::env::vars().filter(|(k, _)| ENV_ALLOWLIST.contains(&k.as_str()))
}

/// Map the raw exit of one run onto the outcome taxonomy.
///
/// `timed_out` distinguishes our own watchdog SIGKILL from a kernel kill
/// (OOM, rlimit), which reports the same signal.
fn classify(
    status: ExitStatus,
    timed_out: bool,
    stdout: Captured,
    stderr: Captured,
    duration: Duration,
) -> ExecutionResult {
    let truncated = stdout.truncated || stderr.truncated;
    let stdout_text = stdout.into_text();
    let stderr_text = stderr.into_text();
    let signal = process::exit_signal(status);
    let code = process::extract_exit_code(status);

    let exec_status = if timed_out || signal == Some(libc::SIGXCPU) {
        ExecStatus::Timeout
    } else if matches!(signal, Some(libc::SIGKILL) | Some(libc::SIGSEGV)) {
        ExecStatus::ResourceExceeded
    } else if code != 0 && stderr_text.contains("MemoryError") {
        // RLIMIT_AS usually surfaces as an interpreter-level MemoryError
        // rather than a kill.
        ExecStatus::ResourceExceeded
    } else if code != 0 {
        ExecStatus::RuntimeError
    } else {
        ExecStatus::Success
    };

    ExecutionResult {
        status: exec_status,
        stdout: stdout_text,
        stderr: stderr_text,
        truncated,
        exit: ExitInfo {
            code,
            signal,
            duration,
        },
    }
}
