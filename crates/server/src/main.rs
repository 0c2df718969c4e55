mod config;
mod error;
mod report;
mod routes;
mod validate;

use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use sandbox::SandboxFactory;
use sandbox_proc::{ProcessConfig, ProcessFactory};
use tokio::sync::Semaphore;
use tracing::info;
use tracing_subscriber::fmt::time::FormatTime;

use crate::error::{ServerError, ServerResult};

struct Elapsed(Instant);

impl FormatTime for Elapsed {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let d = self.0.elapsed();
        let total_secs = d.as_secs();
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        let millis = d.subsec_millis();
        write!(w, "[{mins:02}:{secs:02}:{millis:03}]")
    }
}

#[derive(Parser)]
#[command(name = "codebox-server", version)]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8000", env = "CODEBOX_BIND")]
    bind: std::net::SocketAddr,
    /// Interpreter binary, either a name resolved via $PATH or an absolute path
    #[arg(long, default_value = "python3", env = "CODEBOX_INTERPRETER")]
    interpreter: PathBuf,
    /// Base directory for session working directories (defaults to a
    /// codebox subdirectory of the system temp dir)
    #[arg(long)]
    base_dir: Option<PathBuf>,
    /// Exact origin allowed for cross-origin requests (no CORS when unset)
    #[arg(long, env = "CODEBOX_ALLOWED_ORIGIN")]
    allowed_origin: Option<String>,
    /// Maximum concurrent executions
    #[arg(long, default_value_t = 4)]
    max_concurrent: usize,
    /// Maximum accepted code size in bytes
    #[arg(long, default_value_t = 64 * 1024)]
    max_code_bytes: usize,
    /// Default and maximum wall-clock timeout in milliseconds
    #[arg(long, default_value_t = 5_000)]
    timeout_ms: u64,
    /// Default and maximum memory ceiling in MiB
    #[arg(long, default_value_t = 256)]
    memory_mb: u32,
    /// Capture cap per output stream in bytes
    #[arg(long, default_value_t = 1024 * 1024)]
    max_output_bytes: usize,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_timer(Elapsed(Instant::now()))
        .init();

    if nix::unistd::getuid().is_root() {
        eprintln!("error: server must not run as root (it executes untrusted code)");
        return ExitCode::FAILURE;
    }

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ServerResult<()> {
    let base_dir = cli
        .base_dir
        .unwrap_or_else(|| std::env::temp_dir().join("codebox"));

    let mut factory = ProcessFactory::new(ProcessConfig {
        interpreter: cli.interpreter,
        base_dir,
    });
    factory.startup().await?;
    let factory = Arc::new(factory);

    let policy = Arc::new(config::LimitPolicy {
        max_code_bytes: cli.max_code_bytes,
        timeout: Duration::from_millis(cli.timeout_ms.max(1)),
        memory_mb: cli.memory_mb.max(1),
        max_output_bytes: cli.max_output_bytes,
    });

    let state = routes::AppState {
        factory: Arc::clone(&factory) as Arc<dyn SandboxFactory>,
        policy,
        permits: Arc::new(Semaphore::new(cli.max_concurrent.max(1))),
    };

    let router = routes::router(state, cli.allowed_origin.as_deref())?;

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .map_err(|e| ServerError::Internal(format!("bind {}: {e}", cli.bind)))?;

    info!(
        bind = %cli.bind,
        max_concurrent = cli.max_concurrent,
        backend = factory.name(),
        "server started"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Internal(format!("serve: {e}")))?;

    // In-flight sessions finish within their own wall-clock limits before
    // serve returns; any child still alive at process exit is killed via
    // kill_on_drop. Recover ownership for factory shutdown.
    let mut factory = Arc::try_unwrap(factory)
        .map_err(|_| ServerError::Internal("factory still referenced at shutdown".into()))?;
    factory.shutdown().await;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate()).ok();
    let mut sigint = signal(SignalKind::interrupt()).ok();

    tokio::select! {
        _ = recv_signal(&mut sigterm) => info!("received SIGTERM, shutting down"),
        _ = recv_signal(&mut sigint) => info!("received SIGINT, shutting down"),
    }
}

/// Await a signal if registered, or pend forever if registration failed.
async fn recv_signal(sig: &mut Option<tokio::signal::unix::Signal>) {
    match sig {
        Some(s) => {
            s.recv().await;
        }
        None => std::future::pending().await,
    }
}
