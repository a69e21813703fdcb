//! One end-to-end update cycle: sync, build, stop the old process, start the
//! new one.
//!
//! The controller guarantees at most one cycle is active at a time via a
//! try-lock single-flight guard: a trigger arriving while a cycle runs is
//! ignored, not queued — the next poll tick naturally re-detects the same or
//! a newer commit and retries. Cycles are never cancelled mid-way; a cycle
//! that started runs to a terminal phase.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use vigil_core::types::CommitId;
use vigil_process::{Builder, ProcessSupervisor, SuperviseError};
use vigil_source::SourceProvider;
use vigil_sync::SyncReport;

/// Grace period given to the old process group between the termination
/// signal and declaring it abandoned.
pub const TERMINATE_GRACE: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Cycle model
// ---------------------------------------------------------------------------

/// Phase of an update cycle. `Complete` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePhase {
    Syncing,
    Building,
    Stopping,
    Starting,
    Complete,
    Failed,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CyclePhase::Syncing => "syncing",
            CyclePhase::Building => "building",
            CyclePhase::Stopping => "stopping",
            CyclePhase::Starting => "starting",
            CyclePhase::Complete => "complete",
            CyclePhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What one cycle did. Built fresh per cycle, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub commit: CommitId,
    /// Terminal phase: `Complete` or `Failed`.
    pub phase: CyclePhase,
    /// The phase that broke, when `phase` is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_in: Option<CyclePhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub written: usize,
    pub deleted: usize,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u128,
}

/// Result of asking the controller to run a cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    /// The cycle reached `Complete`; the commit is now last-applied.
    Applied(CycleReport),
    /// The cycle reached `Failed`; last-applied is unchanged, the next tick
    /// re-attempts.
    Failed(CycleReport),
    /// Another cycle holds the single-flight guard; this trigger was ignored.
    InFlight,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Owns the workspace root and the managed-process pointer; the poller never
/// touches either directly.
pub struct CycleController {
    provider: Arc<dyn SourceProvider>,
    builder: Box<dyn Builder>,
    workspace: PathBuf,
    protected: BTreeSet<PathBuf>,
    run_command: String,
    env: BTreeMap<String, String>,
    supervisor: Mutex<ProcessSupervisor>,
    flight: Mutex<()>,
    last_applied: RwLock<Option<CommitId>>,
}

impl CycleController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: Arc<dyn SourceProvider>,
        builder: Box<dyn Builder>,
        workspace: PathBuf,
        protected: BTreeSet<PathBuf>,
        run_command: String,
        env: BTreeMap<String, String>,
        grace: Duration,
    ) -> Self {
        Self {
            provider,
            builder,
            workspace,
            protected,
            run_command,
            env,
            supervisor: Mutex::new(ProcessSupervisor::with_platform_termination(grace)),
            flight: Mutex::new(()),
            last_applied: RwLock::new(None),
        }
    }

    /// The commit of the last cycle that reached `Complete`.
    pub async fn last_applied(&self) -> Option<CommitId> {
        self.last_applied.read().await.clone()
    }

    /// Whether the managed process exists and has not exited.
    pub async fn process_running(&self) -> bool {
        self.supervisor.lock().await.is_running()
    }

    /// Pid of the current managed process, if any.
    pub async fn process_pid(&self) -> Option<u32> {
        self.supervisor.lock().await.current().map(|p| p.pid())
    }

    /// Terminate the managed process outside any cycle (daemon shutdown).
    pub async fn terminate_process(&self) {
        match self.supervisor.lock().await.terminate_current().await {
            Ok(Some(pid)) => tracing::info!(pid, "managed process terminated on shutdown"),
            Ok(None) => {}
            Err(err) => tracing::error!(error = %err, "shutdown termination failed"),
        }
    }

    /// Run one cycle for `commit`. Steps short-circuit to `Failed`; a
    /// concurrent trigger gets `InFlight` and is dropped.
    pub async fn run_cycle(&self, commit: CommitId) -> CycleOutcome {
        let Ok(_guard) = self.flight.try_lock() else {
            tracing::info!(%commit, "cycle already in flight; ignoring trigger");
            return CycleOutcome::InFlight;
        };

        let started = Instant::now();
        let started_at = Utc::now();
        tracing::info!(%commit, "update cycle started");

        // Phase 1: Syncing — fetch the snapshot, replace the workspace.
        self.log_phase(&commit, CyclePhase::Syncing);
        let entries = match self.provider.list_files().await {
            Ok(entries) => entries,
            Err(err) => {
                return self.fail(commit, CyclePhase::Syncing, err, started, started_at, None)
            }
        };
        let sync_report = {
            let workspace = self.workspace.clone();
            let protected = self.protected.clone();
            let joined = tokio::task::spawn_blocking(move || {
                vigil_sync::sync(&workspace, &protected, &entries)
            })
            .await;
            match joined {
                Ok(Ok(report)) => report,
                Ok(Err(err)) => {
                    return self.fail(commit, CyclePhase::Syncing, err, started, started_at, None)
                }
                Err(err) => {
                    return self.fail(commit, CyclePhase::Syncing, err, started, started_at, None)
                }
            }
        };

        // Phase 2: Building. On failure the old process keeps serving.
        self.log_phase(&commit, CyclePhase::Building);
        let entry_point = match self.builder.build(&self.workspace).await {
            Ok(entry_point) => entry_point,
            Err(err) => {
                return self.fail(
                    commit,
                    CyclePhase::Building,
                    err,
                    started,
                    started_at,
                    Some(&sync_report),
                )
            }
        };

        // Phases 3 + 4 hold the supervisor lock together: the current-process
        // pointer moves to the replacement only after the old termination
        // has been issued.
        self.log_phase(&commit, CyclePhase::Stopping);
        let mut supervisor = self.supervisor.lock().await;
        match supervisor.terminate_current().await {
            Ok(Some(pid)) => tracing::info!(pid, "termination requested for previous process"),
            Ok(None) => tracing::debug!("no previous process to stop"),
            Err(SuperviseError::Unkillable { pid }) => {
                // Deliberate: the replacement still starts, and both
                // instances may briefly coexist. Loud, not swallowed.
                tracing::error!(
                    pid,
                    "previous process is unkillable; starting replacement anyway — instances may overlap",
                );
            }
            Err(err) => {
                tracing::error!(error = %err, "unexpected termination failure; starting replacement anyway");
            }
        }

        self.log_phase(&commit, CyclePhase::Starting);
        let command = format!("{} {}", self.run_command, entry_point);
        if let Err(err) = supervisor.start(&command, &self.workspace, &self.env) {
            drop(supervisor);
            return self.fail(
                commit,
                CyclePhase::Starting,
                err,
                started,
                started_at,
                Some(&sync_report),
            );
        }
        drop(supervisor);

        // Phase 5: Complete — only now does the commit become last-applied.
        *self.last_applied.write().await = Some(commit.clone());
        let report = CycleReport {
            commit: commit.clone(),
            phase: CyclePhase::Complete,
            failed_in: None,
            error: None,
            written: sync_report.written.len(),
            deleted: sync_report.deleted.len(),
            started_at,
            duration_ms: started.elapsed().as_millis(),
        };
        tracing::info!(
            %commit,
            written = report.written,
            deleted = report.deleted,
            duration_ms = report.duration_ms,
            "update cycle complete",
        );
        CycleOutcome::Applied(report)
    }

    fn log_phase(&self, commit: &CommitId, phase: CyclePhase) {
        tracing::info!(%commit, %phase, "cycle phase");
    }

    fn fail(
        &self,
        commit: CommitId,
        phase: CyclePhase,
        error: impl fmt::Display,
        started: Instant,
        started_at: DateTime<Utc>,
        sync_report: Option<&SyncReport>,
    ) -> CycleOutcome {
        let error = error.to_string();
        tracing::error!(%commit, %phase, error, "update cycle failed");
        CycleOutcome::Failed(CycleReport {
            commit,
            phase: CyclePhase::Failed,
            failed_in: Some(phase),
            error: Some(error),
            written: sync_report.map(|r| r.written.len()).unwrap_or(0),
            deleted: sync_report.map(|r| r.deleted.len()).unwrap_or(0),
            started_at,
            duration_ms: started.elapsed().as_millis(),
        })
    }
}
