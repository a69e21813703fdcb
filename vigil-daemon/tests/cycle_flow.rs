//! End-to-end cycle tests with scripted provider and builder collaborators.
//!
//! The managed process is a real `sleep` child in its own process group, so
//! start/terminate behavior is observed for real; only the network and build
//! steps are scripted.

#![cfg(unix)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::time::sleep;

use vigil_core::types::{CommitId, EntryPoint, FileEntry};
use vigil_daemon::{CycleController, CycleOutcome, CyclePhase, Poller, TickOutcome};
use vigil_process::{BuildError, Builder};
use vigil_source::{FetchError, SourceProvider};

// ---------------------------------------------------------------------------
// Scripted collaborators
// ---------------------------------------------------------------------------

struct ScriptedProvider {
    commit: Mutex<String>,
    files: Mutex<Vec<FileEntry>>,
    resolve_error: Mutex<Option<FetchError>>,
}

impl ScriptedProvider {
    fn new(commit: &str, files: Vec<FileEntry>) -> Arc<Self> {
        Arc::new(Self {
            commit: Mutex::new(commit.to_string()),
            files: Mutex::new(files),
            resolve_error: Mutex::new(None),
        })
    }

    fn set_commit(&self, commit: &str) {
        *self.commit.lock().unwrap() = commit.to_string();
    }

    fn set_files(&self, files: Vec<FileEntry>) {
        *self.files.lock().unwrap() = files;
    }

    fn fail_resolve_with(&self, err: FetchError) {
        *self.resolve_error.lock().unwrap() = Some(err);
    }
}

#[async_trait]
impl SourceProvider for ScriptedProvider {
    async fn resolve_commit(&self) -> Result<CommitId, FetchError> {
        if let Some(err) = self.resolve_error.lock().unwrap().take() {
            return Err(err);
        }
        Ok(CommitId::from(self.commit.lock().unwrap().clone()))
    }

    async fn list_files(&self) -> Result<Vec<FileEntry>, FetchError> {
        Ok(self.files.lock().unwrap().clone())
    }
}

struct ScriptedBuilder {
    fail: AtomicBool,
    entry: String,
    delay: Option<Duration>,
}

impl ScriptedBuilder {
    fn returning(entry: &str) -> Arc<Self> {
        Arc::new(Self {
            fail: AtomicBool::new(false),
            entry: entry.to_string(),
            delay: None,
        })
    }

    fn slow(entry: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            fail: AtomicBool::new(false),
            entry: entry.to_string(),
            delay: Some(delay),
        })
    }

    fn fail_next_builds(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Builder for ScriptedBuilder {
    async fn build(&self, _workspace: &Path) -> Result<EntryPoint, BuildError> {
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(BuildError::ExitCode { code: 1 });
        }
        Ok(EntryPoint::from(self.entry.as_str()))
    }
}

/// Newtype so a shared `Arc<ScriptedBuilder>` can be handed to the controller
/// as a `Box<dyn Builder>`: orphan rules forbid `impl Builder for Arc<_>`
/// directly (`Arc` is foreign and not `#[fundamental]`).
struct SharedBuilder(Arc<ScriptedBuilder>);

#[async_trait]
impl Builder for SharedBuilder {
    async fn build(&self, workspace: &Path) -> Result<EntryPoint, BuildError> {
        self.0.build(workspace).await
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

fn snapshot(paths: &[(&str, &str)]) -> Vec<FileEntry> {
    paths
        .iter()
        .map(|(path, content)| FileEntry::new(*path, content.as_bytes().to_vec()))
        .collect()
}

/// Controller whose managed process is `sleep 30` so it stays alive until
/// terminated.
fn controller(
    provider: Arc<ScriptedProvider>,
    builder: Arc<ScriptedBuilder>,
    workspace: &TempDir,
) -> Arc<CycleController> {
    Arc::new(CycleController::new(
        provider,
        Box::new(SharedBuilder(builder)),
        workspace.path().to_path_buf(),
        BTreeSet::new(),
        "sleep".to_string(),
        BTreeMap::new(),
        Duration::from_millis(500),
    ))
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn same_commit_triggers_no_second_cycle() {
    let workspace = TempDir::new().expect("workspace");
    let provider = ScriptedProvider::new("abc123", snapshot(&[("app.js", "v1")]));
    let builder = ScriptedBuilder::returning("30");
    let controller = controller(provider.clone(), builder, &workspace);
    let mut poller = Poller::new(provider, controller.clone(), Duration::from_secs(60));

    assert!(matches!(poller.tick().await, TickOutcome::Applied(_)));
    assert!(controller.process_running().await);
    assert_eq!(controller.last_applied().await, Some(CommitId::from("abc123")));

    // Second tick resolves the same commit; no cycle runs.
    assert!(matches!(poller.tick().await, TickOutcome::Unchanged));

    controller.terminate_process().await;
}

#[tokio::test]
async fn advanced_commit_replaces_files_and_process() {
    let workspace = TempDir::new().expect("workspace");
    let provider = ScriptedProvider::new("abc123", snapshot(&[("old.js", "v1")]));
    let builder = ScriptedBuilder::returning("30");
    let controller = controller(provider.clone(), builder, &workspace);
    let mut poller = Poller::new(provider.clone(), controller.clone(), Duration::from_secs(60));

    assert!(matches!(poller.tick().await, TickOutcome::Applied(_)));
    let old_pid = controller.process_pid().await.expect("first process");

    provider.set_commit("def456");
    provider.set_files(snapshot(&[("new.js", "v2")]));
    assert!(matches!(poller.tick().await, TickOutcome::Applied(_)));

    let new_pid = controller.process_pid().await.expect("second process");
    assert_ne!(old_pid, new_pid, "replacement must be a fresh process");
    assert!(controller.process_running().await);
    assert_eq!(controller.last_applied().await, Some(CommitId::from("def456")));

    assert!(workspace.path().join("new.js").exists());
    assert!(!workspace.path().join("old.js").exists(), "stale file removed");

    controller.terminate_process().await;
}

#[tokio::test]
async fn failed_build_preserves_running_process_and_retries() {
    let workspace = TempDir::new().expect("workspace");
    let provider = ScriptedProvider::new("abc123", snapshot(&[("app.js", "v1")]));
    let builder = ScriptedBuilder::returning("30");
    let controller = controller(provider.clone(), builder.clone(), &workspace);
    let mut poller = Poller::new(provider.clone(), controller.clone(), Duration::from_secs(60));

    assert!(matches!(poller.tick().await, TickOutcome::Applied(_)));
    let surviving_pid = controller.process_pid().await.expect("running process");

    provider.set_commit("def456");
    builder.fail_next_builds();

    match poller.tick().await {
        TickOutcome::Failed(report) => {
            assert_eq!(report.failed_in, Some(CyclePhase::Building));
        }
        other => panic!("expected Failed, got {other:?}"),
    }

    // Old version keeps serving; last-applied is unchanged so the next tick
    // re-attempts the same commit.
    assert!(controller.process_running().await);
    assert_eq!(controller.process_pid().await, Some(surviving_pid));
    assert_eq!(controller.last_applied().await, Some(CommitId::from("abc123")));
    assert!(matches!(poller.tick().await, TickOutcome::Failed(_)));

    controller.terminate_process().await;
}

#[tokio::test]
async fn concurrent_trigger_is_ignored_not_interleaved() {
    let workspace = TempDir::new().expect("workspace");
    let provider = ScriptedProvider::new("c1", snapshot(&[("app.js", "v1")]));
    let builder = ScriptedBuilder::slow("30", Duration::from_millis(400));
    let controller = controller(provider, builder, &workspace);

    let first = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.run_cycle(CommitId::from("c1")).await })
    };
    // Give the first cycle time to take the single-flight guard.
    sleep(Duration::from_millis(100)).await;

    let second = controller.run_cycle(CommitId::from("c2")).await;
    assert!(matches!(second, CycleOutcome::InFlight));

    let first = first.await.expect("join");
    assert!(matches!(first, CycleOutcome::Applied(_)));
    assert_eq!(controller.last_applied().await, Some(CommitId::from("c1")));

    controller.terminate_process().await;
}

#[tokio::test]
async fn escaping_snapshot_path_fails_cycle_in_sync_phase() {
    let workspace = TempDir::new().expect("workspace");
    let provider = ScriptedProvider::new("evil", snapshot(&[("../escape.txt", "outside")]));
    let builder = ScriptedBuilder::returning("30");
    let controller = controller(provider.clone(), builder, &workspace);
    let mut poller = Poller::new(provider, controller.clone(), Duration::from_secs(60));

    match poller.tick().await {
        TickOutcome::Failed(report) => {
            assert_eq!(report.failed_in, Some(CyclePhase::Syncing));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert!(!controller.process_running().await, "nothing may start");
    assert_eq!(controller.last_applied().await, None);
}

#[tokio::test]
async fn resolution_failure_skips_tick_without_cycle() {
    let workspace = TempDir::new().expect("workspace");
    let provider = ScriptedProvider::new("abc123", snapshot(&[("app.js", "v1")]));
    let builder = ScriptedBuilder::returning("30");
    let controller = controller(provider.clone(), builder, &workspace);
    let mut poller = Poller::new(provider.clone(), controller.clone(), Duration::from_secs(60));

    provider.fail_resolve_with(FetchError::Unauthorized("HTTP 401: bad token".into()));
    assert!(matches!(poller.tick().await, TickOutcome::ResolveFailed));
    assert!(!controller.process_running().await);

    provider.fail_resolve_with(FetchError::Transient("HTTP 502: gateway".into()));
    assert!(matches!(poller.tick().await, TickOutcome::ResolveFailed));

    // Once resolution heals, the pending commit deploys.
    assert!(matches!(poller.tick().await, TickOutcome::Applied(_)));
    controller.terminate_process().await;
}
