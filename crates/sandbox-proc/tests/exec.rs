//! End-to-end sandbox tests against a real interpreter.
//!
//! Every test skips (with a note) when no `python3` is on the host, so the
//! suite stays green on minimal build machines.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use sandbox::{ExecStatus, ExecutionRequest, ResourceLimits, SandboxConfig, SandboxFactory as _};
use sandbox_proc::{ProcessConfig, ProcessFactory};
use uuid::Uuid;

fn python() -> Option<PathBuf> {
    which::which("python3").ok()
}

fn default_limits() -> ResourceLimits {
    ResourceLimits {
        timeout: Duration::from_secs(5),
        memory_mb: 256,
        max_output_bytes: 1024 * 1024,
    }
}

async fn started_factory(base: &std::path::Path, interpreter: PathBuf) -> ProcessFactory {
    let mut factory = ProcessFactory::new(ProcessConfig {
        interpreter,
        base_dir: base.to_path_buf(),
    });
    factory.startup().await.unwrap();
    factory
}

async fn run_code(code: &str, limits: ResourceLimits) -> Option<sandbox::ExecutionResult> {
    let interpreter = python()?;
    let base = tempfile::tempdir().unwrap();
    let factory = started_factory(base.path(), interpreter).await;

    let mut session = factory
        .create(SandboxConfig { id: Uuid::new_v4() })
        .await
        .unwrap();
    let result = session
        .run(&ExecutionRequest {
            code: code.to_string(),
            limits,
        })
        .await
        .unwrap();
    factory.destroy(session).await;
    Some(result)
}

#[tokio::test]
async fn print_hi_succeeds() {
    let Some(result) = run_code("print('hi')", default_limits()).await else {
        eprintln!("skipping: python3 not found");
        return;
    };
    assert_eq!(result.status, ExecStatus::Success);
    assert_eq!(result.stdout, "hi\n");
    assert!(!result.truncated);
    assert_eq!(result.exit.code, 0);
}

#[tokio::test]
async fn raised_fault_is_runtime_error() {
    let Some(result) = run_code("raise ValueError('boom')", default_limits()).await else {
        eprintln!("skipping: python3 not found");
        return;
    };
    assert_eq!(result.status, ExecStatus::RuntimeError);
    assert!(result.stderr.contains("ValueError: boom"));
    assert_ne!(result.exit.code, 0);
}

#[tokio::test]
async fn infinite_loop_times_out_near_deadline() {
    let limits = ResourceLimits {
        timeout: Duration::from_millis(600),
        ..default_limits()
    };
    let started = Instant::now();
    let Some(result) = run_code("while True: pass", limits).await else {
        eprintln!("skipping: python3 not found");
        return;
    };
    assert_eq!(result.status, ExecStatus::Timeout);
    // Deadline plus spawn/teardown overhead, not a hung wait.
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn unbounded_allocation_is_resource_exceeded() {
    let limits = ResourceLimits {
        // Enough for interpreter startup, nowhere near enough for the
        // allocation below.
        memory_mb: 128,
        ..default_limits()
    };
    let code = "x = bytearray(512 * 1024 * 1024)\nprint('allocated')";
    let Some(result) = run_code(code, limits).await else {
        eprintln!("skipping: python3 not found");
        return;
    };
    assert_eq!(result.status, ExecStatus::ResourceExceeded);
    assert!(!result.stdout.contains("allocated"));
}

#[tokio::test]
async fn output_past_cap_is_truncated() {
    let limits = ResourceLimits {
        max_output_bytes: 4096,
        ..default_limits()
    };
    let code = "print('z' * 100000)";
    let Some(result) = run_code(code, limits).await else {
        eprintln!("skipping: python3 not found");
        return;
    };
    assert_eq!(result.status, ExecStatus::Success);
    assert!(result.truncated);
    assert!(result.stdout.len() <= 4096);
}

#[tokio::test]
async fn host_environment_is_not_visible() {
    // HOME is set for the test process but is not on the allowlist.
    let code = "import os\nprint(os.environ.get('HOME', 'unset'))";
    let Some(result) = run_code(code, default_limits()).await else {
        eprintln!("skipping: python3 not found");
        return;
    };
    assert_eq!(result.status, ExecStatus::Success);
    assert_eq!(result.stdout, "unset\n");
}

#[tokio::test]
async fn concurrent_sessions_do_not_share_output() {
    let Some(interpreter) = python() else {
        eprintln!("skipping: python3 not found");
        return;
    };
    let base = tempfile::tempdir().unwrap();
    let factory =
        std::sync::Arc::new(started_factory(base.path(), interpreter).await);

    let mut handles = Vec::new();
    for i in 0..4 {
        let factory = std::sync::Arc::clone(&factory);
        handles.push(tokio::spawn(async move {
            let mut session = factory
                .create(SandboxConfig { id: Uuid::new_v4() })
                .await
                .unwrap();
            let result = session
                .run(&ExecutionRequest {
                    code: format!("print('marker-{i}' * 200)"),
                    limits: default_limits(),
                })
                .await
                .unwrap();
            factory.destroy(session).await;
            (i, result)
        }));
    }

    for handle in handles {
        let (i, result) = handle.await.unwrap();
        assert_eq!(result.status, ExecStatus::Success);
        let marker = format!("marker-{i}");
        assert!(result.stdout.contains(&marker));
        for other in 0..4 {
            if other != i {
                assert!(!result.stdout.contains(&format!("marker-{other}")));
            }
        }
    }
}
