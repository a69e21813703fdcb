use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the daemon runtime.
///
/// Cycle-level failures (fetch, sync, build, terminate) never appear here:
/// they are folded into `CycleReport`s and retried by the next poll tick.
/// This enum is only for faults that end the supervisor itself.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] vigil_core::ConfigError),

    #[error("daemon runtime error: {0}")]
    Runtime(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
