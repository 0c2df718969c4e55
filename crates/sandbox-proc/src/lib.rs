//! Process-backed sandbox: one interpreter subprocess per session, with
//! rlimits applied pre-exec, a wall-clock watchdog that kills the whole
//! process group, and bounded stdout/stderr capture.

mod capture;
mod config;
mod factory;
mod limits;
mod process;
mod sandbox;

pub use config::ProcessConfig;
pub use factory::ProcessFactory;
pub use sandbox::ProcessSandbox;
