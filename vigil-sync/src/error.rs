//! Error types for vigil-sync.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from workspace synchronization.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A snapshot path escapes the workspace root. The entire sync is
    /// rejected before anything is written; never retried with the same
    /// input.
    #[error("unsafe snapshot path escapes workspace root: {path}")]
    Unsafe { path: PathBuf },

    /// An I/O error, with annotated path for context. Retryable on the next
    /// poll tick.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
