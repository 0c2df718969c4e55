use std::io;
use std::time::Duration;

use nix::sys::resource::{Resource, setrlimit};

/// File-size ceiling for anything the child writes (1 MiB).
const FSIZE_LIMIT: u64 = 1024 * 1024;

/// Per-UID process/thread ceiling. Generous enough for interpreter threads,
/// low enough to stop a fork bomb.
const NPROC_LIMIT: u64 = 256;

/// CPU-time ceiling derived from the wall-clock timeout. The extra second
/// keeps SIGXCPU from racing the host-side watchdog in the busy-loop case.
pub(crate) fn cpu_seconds(timeout: Duration) -> u64 {
    timeout.as_secs().max(1).saturating_add(1)
}

/// Apply rlimits in the forked child, before exec.
///
/// Only async-signal-safe calls are allowed here (`pre_exec` context), which
/// `setrlimit(2)` is. Any failure aborts the spawn and surfaces as a spawn
/// error on the host side.
pub(crate) fn apply(memory_mb: u32, cpu_secs: u64) -> io::Result<()> {
    let memory_bytes = u64::from(memory_mb).saturating_mul(1024 * 1024);
    set(Resource::RLIMIT_AS, memory_bytes)?;
    set(Resource::RLIMIT_CPU, cpu_secs)?;
    set(Resource::RLIMIT_FSIZE, FSIZE_LIMIT)?;
    set(Resource::RLIMIT_NPROC, NPROC_LIMIT)?;
    // No core dumps: untrusted memory contents must not hit the host disk.
    set(Resource::RLIMIT_CORE, 0)?;
    Ok(())
}

fn set(resource: Resource, value: u64) -> io::Result<()> {
    setrlimit(resource, value, value).map_err(io::Error::from)
}
