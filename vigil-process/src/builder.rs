//! The `Builder` contract and its external-command implementation.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use vigil_core::types::EntryPoint;

use crate::error::{io_err, BuildError};
use crate::manifest;

/// Runs the build step against a synchronized workspace.
///
/// On success the builder reports an entry-point hint the supervisor uses to
/// start the managed process.
#[async_trait]
pub trait Builder: Send + Sync {
    async fn build(&self, workspace: &Path) -> Result<EntryPoint, BuildError>;
}

/// Split a configured command line into program + arguments.
pub(crate) fn split_command(command: &str) -> Option<(String, Vec<String>)> {
    let mut parts = command.split_whitespace().map(str::to_owned);
    let program = parts.next()?;
    Some((program, parts.collect()))
}

/// [`Builder`] that runs a configured external command (e.g. `npm run build`)
/// with the workspace as working directory and stdio passed through.
pub struct CommandBuilder {
    command: String,
    entry_point_default: String,
}

impl CommandBuilder {
    pub fn new(command: impl Into<String>, entry_point_default: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            entry_point_default: entry_point_default.into(),
        }
    }
}

#[async_trait]
impl Builder for CommandBuilder {
    async fn build(&self, workspace: &Path) -> Result<EntryPoint, BuildError> {
        let (program, args) = split_command(&self.command).ok_or(BuildError::EmptyCommand)?;

        tracing::info!(command = %self.command, workspace = %workspace.display(), "running build");
        let status = Command::new(&program)
            .args(&args)
            .current_dir(workspace)
            .status()
            .await
            .map_err(|e| io_err(workspace, e))?;

        if !status.success() {
            return Err(BuildError::ExitCode {
                code: status.code().unwrap_or(-1),
            });
        }

        manifest::entry_point_or(workspace, &self.entry_point_default)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
