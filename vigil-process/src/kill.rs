//! Platform termination strategies.
//!
//! The managed program may spawn children of its own; those must not become
//! orphans when it is replaced. On POSIX platforms the whole process group is
//! signalled in one call. Elsewhere the fallback is a best-effort tree kill
//! by pid.

use std::io;

/// How to stop a managed process and its descendants.
///
/// One concrete strategy is selected at initialization by
/// [`platform_termination`]; callers never branch on the platform themselves.
pub trait Termination: Send + Sync {
    /// Signal an entire process group.
    fn terminate_group(&self, group: i32) -> io::Result<()>;

    /// Signal a single process (fallback when the group signal fails, or the
    /// whole-tree primitive where groups do not exist).
    fn terminate_pid(&self, pid: u32) -> io::Result<()>;
}

/// Select the termination strategy for the current platform.
pub fn platform_termination() -> Box<dyn Termination> {
    #[cfg(unix)]
    {
        Box::new(GroupSignal)
    }
    #[cfg(not(unix))]
    {
        Box::new(TaskKill)
    }
}

// ---------------------------------------------------------------------------
// POSIX: SIGTERM to the group, or the leader directly
// ---------------------------------------------------------------------------

/// SIGTERM delivery via `killpg` / `kill`.
#[cfg(unix)]
pub struct GroupSignal;

#[cfg(unix)]
impl Termination for GroupSignal {
    fn terminate_group(&self, group: i32) -> io::Result<()> {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        killpg(Pid::from_raw(group), Signal::SIGTERM).map_err(io::Error::from)
    }

    fn terminate_pid(&self, pid: u32) -> io::Result<()> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(io::Error::from)
    }
}

// ---------------------------------------------------------------------------
// Windows: best-effort tree kill via taskkill
// ---------------------------------------------------------------------------

/// `taskkill /PID <pid> /T /F` — terminates the pid and its descendants.
#[cfg(not(unix))]
pub struct TaskKill;

#[cfg(not(unix))]
impl Termination for TaskKill {
    fn terminate_group(&self, group: i32) -> io::Result<()> {
        // No POSIX groups here; the recorded group id is the leader pid.
        self.terminate_pid(group as u32)
    }

    fn terminate_pid(&self, pid: u32) -> io::Result<()> {
        let status = std::process::Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/T", "/F"])
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::other(format!(
                "taskkill exited with {status} for pid {pid}"
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
