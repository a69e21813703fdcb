//! Error types for vigil-process.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from running the build step.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The build command ran and exited non-zero. The cycle fails; the
    /// previously running process is left untouched.
    #[error("build command exited with code {code}")]
    ExitCode { code: i32 },

    /// The configured build command was empty or whitespace.
    #[error("build command is empty")]
    EmptyCommand,

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The workspace manifest exists but could not be parsed.
    #[error("failed to parse manifest at {path}: {message}")]
    Manifest { path: PathBuf, message: String },
}

/// Convenience constructor for [`BuildError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> BuildError {
    BuildError::Io {
        path: path.into(),
        source,
    }
}

/// All errors that can arise from supervising the managed process.
#[derive(Debug, Error)]
pub enum SuperviseError {
    /// Spawning the managed process failed.
    #[error("failed to spawn managed process: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },

    /// The run command was empty or whitespace.
    #[error("run command is empty")]
    EmptyCommand,

    /// Neither the group signal nor the direct pid signal could be
    /// delivered. The caller logs this as fatal and may start a replacement
    /// anyway, accepting the risk of two instances briefly coexisting.
    #[error("managed process {pid} could not be signalled for termination")]
    Unkillable { pid: u32 },
}
