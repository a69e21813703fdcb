//! Timer-driven change detection.
//!
//! The poller owns no mutable shared state beyond its own "last attempted"
//! commit; the workspace and the managed process belong to the controller.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use vigil_core::types::CommitId;
use vigil_source::SourceProvider;

use crate::cycle::{CycleController, CycleOutcome, CycleReport};
use crate::error::DaemonError;

/// What a single poll tick did.
#[derive(Debug)]
pub enum TickOutcome {
    /// Commit resolution failed; logged, nothing triggered.
    ResolveFailed,
    /// Resolved commit equals the last applied one; nothing to do.
    Unchanged,
    /// A cycle ran to `Complete`.
    Applied(CycleReport),
    /// A cycle ran and reached `Failed`; the next tick re-attempts.
    Failed(CycleReport),
    /// A cycle was already in flight; trigger dropped.
    InFlight,
}

/// Fixed-interval poll loop over one remote reference.
pub struct Poller {
    provider: Arc<dyn SourceProvider>,
    controller: Arc<CycleController>,
    interval: Duration,
    /// Last commit a cycle was started for, success or not. Observability
    /// only — the trigger decision compares against the controller's
    /// last-applied commit, so a failed commit is re-attempted next tick.
    last_attempted: Option<CommitId>,
}

impl Poller {
    pub fn new(
        provider: Arc<dyn SourceProvider>,
        controller: Arc<CycleController>,
        interval: Duration,
    ) -> Self {
        Self {
            provider,
            controller,
            interval,
            last_attempted: None,
        }
    }

    pub fn last_attempted(&self) -> Option<&CommitId> {
        self.last_attempted.as_ref()
    }

    /// One tick: resolve the reference and trigger a cycle when it moved.
    pub async fn tick(&mut self) -> TickOutcome {
        let commit = match self.provider.resolve_commit().await {
            Ok(commit) => commit,
            Err(err) if err.is_fatal() => {
                tracing::error!(error = %err, "commit resolution failed; skipping this tick");
                return TickOutcome::ResolveFailed;
            }
            Err(err) => {
                tracing::warn!(error = %err, "transient resolution failure; retrying next tick");
                return TickOutcome::ResolveFailed;
            }
        };

        if self.controller.last_applied().await.as_ref() == Some(&commit) {
            tracing::debug!(%commit, "remote reference unchanged");
            return TickOutcome::Unchanged;
        }

        tracing::info!(%commit, "remote reference moved; triggering update cycle");
        self.last_attempted = Some(commit.clone());
        match self.controller.run_cycle(commit).await {
            CycleOutcome::Applied(report) => TickOutcome::Applied(report),
            CycleOutcome::Failed(report) => TickOutcome::Failed(report),
            CycleOutcome::InFlight => TickOutcome::InFlight,
        }
    }

    /// Run ticks on the fixed interval until shutdown. The first tick fires
    /// immediately, deploying whatever the reference points at on startup.
    pub async fn run(
        mut self,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), DaemonError> {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
        Ok(())
    }
}
