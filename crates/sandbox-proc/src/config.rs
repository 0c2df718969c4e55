use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Interpreter binary, either an absolute path or a name resolved via
    /// `$PATH` at startup. Must accept `-I <file>` (Python isolated mode).
    pub interpreter: PathBuf,
    /// Base directory for per-session working directories.
    pub base_dir: PathBuf,
}
