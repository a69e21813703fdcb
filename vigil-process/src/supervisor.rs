//! The process supervisor: at most one managed process, terminated as a
//! whole group when replaced.
//!
//! Lifecycle per managed process:
//!
//! ```text
//! Starting -> Running -> Terminating -> Exited
//! ```
//!
//! Termination signals the group and returns without awaiting exit; a
//! detached reaper task waits out the grace period and logs the outcome.
//! The replacement is started immediately after the signal is issued, which
//! keeps the poll loop unblocked at the cost of a brief possible overlap
//! when the old process ignores SIGTERM.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use tokio::process::{Child, Command};

use crate::builder::split_command;
use crate::error::SuperviseError;
use crate::kill::{platform_termination, Termination};

// ---------------------------------------------------------------------------
// Managed process
// ---------------------------------------------------------------------------

/// Lifecycle state of the managed process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagedStatus {
    Starting,
    Running,
    Terminating,
    Exited(Option<i32>),
}

/// The one process currently owned by the supervisor.
#[derive(Debug)]
pub struct ManagedProcess {
    pid: u32,
    group: i32,
    status: ManagedStatus,
    child: Child,
}

impl ManagedProcess {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Process-group identifier; equals the leader pid on POSIX platforms,
    /// and the pid itself where groups do not exist.
    pub fn group_id(&self) -> i32 {
        self.group
    }

    pub fn status(&self) -> ManagedStatus {
        self.status
    }
}

// ---------------------------------------------------------------------------
// Supervisor
// ---------------------------------------------------------------------------

/// Owns the `current` managed process exclusively; all starts and
/// terminations go through here.
pub struct ProcessSupervisor {
    termination: Box<dyn Termination>,
    grace: Duration,
    current: Option<ManagedProcess>,
}

impl ProcessSupervisor {
    pub fn new(termination: Box<dyn Termination>, grace: Duration) -> Self {
        Self {
            termination,
            grace,
            current: None,
        }
    }

    /// Supervisor with the platform-selected termination strategy.
    pub fn with_platform_termination(grace: Duration) -> Self {
        Self::new(platform_termination(), grace)
    }

    pub fn current(&self) -> Option<&ManagedProcess> {
        self.current.as_ref()
    }

    /// Poll the current child for exit, updating its status. Returns the
    /// status after polling, or `None` when nothing is managed.
    pub fn poll_status(&mut self) -> Option<ManagedStatus> {
        let process = self.current.as_mut()?;
        if let Ok(Some(status)) = process.child.try_wait() {
            process.status = ManagedStatus::Exited(status.code());
        }
        Some(process.status)
    }

    /// `true` when a managed process exists and has not exited.
    pub fn is_running(&mut self) -> bool {
        matches!(self.poll_status(), Some(ManagedStatus::Running))
    }

    /// Launch `command` in `workdir` with `env` added to the inherited
    /// environment, detached into its own process group, and make it the
    /// current managed process.
    ///
    /// Callers must have issued `terminate_current` for any previous process
    /// first; the old termination is requested, not awaited, before the
    /// replacement starts.
    pub fn start(
        &mut self,
        command: &str,
        workdir: &Path,
        env: &BTreeMap<String, String>,
    ) -> Result<u32, SuperviseError> {
        let (program, args) = split_command(command).ok_or(SuperviseError::EmptyCommand)?;

        tracing::info!(command, workdir = %workdir.display(), "starting managed process");

        let mut cmd = Command::new(&program);
        cmd.args(&args)
            .current_dir(workdir)
            .envs(env)
            .kill_on_drop(false);
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|source| SuperviseError::Spawn { source })?;

        // id() is Some for a child that has not been polled to completion.
        let pid = child.id().unwrap_or(0);
        let mut process = ManagedProcess {
            pid,
            // With process_group(0) the new group's id is the leader pid.
            group: pid as i32,
            status: ManagedStatus::Starting,
            child,
        };
        process.status = ManagedStatus::Running;

        tracing::info!(pid, group = process.group, "managed process running");
        self.current = Some(process);
        Ok(pid)
    }

    /// Request termination of the current process group, if any.
    ///
    /// Returns the pid whose termination was requested. Exit is not awaited
    /// here: a detached reaper waits out the grace period. When neither the
    /// group nor the leader pid can be signalled, waits at most the grace
    /// period for a natural exit and then surfaces
    /// [`SuperviseError::Unkillable`].
    pub async fn terminate_current(&mut self) -> Result<Option<u32>, SuperviseError> {
        let Some(mut process) = self.current.take() else {
            return Ok(None);
        };

        process.status = ManagedStatus::Terminating;
        let pid = process.pid;
        let group = process.group;
        tracing::info!(pid, group, "terminating managed process group");

        let signalled = match self.termination.terminate_group(group) {
            Ok(()) => true,
            Err(group_err) => {
                tracing::warn!(
                    error = %group_err,
                    group,
                    "group termination failed; falling back to leader pid",
                );
                match self.termination.terminate_pid(pid) {
                    Ok(()) => true,
                    Err(pid_err) => {
                        tracing::error!(error = %pid_err, pid, "leader termination failed");
                        false
                    }
                }
            }
        };

        if !signalled {
            // Bounded wait: the process may have exited on its own between
            // the spawn and the failed signal.
            let mut child = process.child;
            return match tokio::time::timeout(self.grace, child.wait()).await {
                Ok(Ok(status)) => {
                    tracing::info!(pid, code = ?status.code(), "unsignallable process had already exited");
                    Ok(Some(pid))
                }
                _ => Err(SuperviseError::Unkillable { pid }),
            };
        }

        tokio::spawn(reap(process.child, pid, self.grace));
        Ok(Some(pid))
    }
}

/// Await the old child off the hot path and log how it went.
async fn reap(mut child: Child, pid: u32, grace: Duration) {
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => {
            tracing::info!(pid, code = ?status.code(), "managed process exited");
        }
        Ok(Err(err)) => {
            tracing::warn!(pid, error = %err, "failed to await managed process exit");
        }
        Err(_) => {
            tracing::warn!(
                pid,
                grace_ms = grace.as_millis() as u64,
                "managed process still alive after grace period; it may overlap with its replacement",
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
