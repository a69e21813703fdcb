//! Daemon runtime: wiring, task supervision, graceful shutdown.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast;

use vigil_core::config;
use vigil_process::CommandBuilder;
use vigil_source::GitHubProvider;

use crate::cycle::{CycleController, TERMINATE_GRACE};
use crate::error::{io_err, DaemonError};
use crate::poller::Poller;

/// Start the supervisor runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf()))
}

/// Run the supervisor runtime.
pub async fn run(home: PathBuf) -> Result<(), DaemonError> {
    let cfg = config::load_at(&home)?;
    let token = config::token_from_env()?;

    let workspace = cfg.workspace_root_at(&home);
    if !workspace.exists() {
        std::fs::create_dir_all(&workspace).map_err(|e| io_err(&workspace, e))?;
    }

    tracing::info!(
        owner = %cfg.owner,
        repo = %cfg.repo,
        branch = %cfg.branch,
        workspace = %workspace.display(),
        poll_interval_ms = cfg.poll_interval_ms,
        "vigil supervisor starting",
    );

    let provider: Arc<GitHubProvider> = Arc::new(GitHubProvider::new(
        cfg.owner.clone(),
        cfg.repo.clone(),
        cfg.branch.clone(),
        token,
    ));
    let builder = Box::new(CommandBuilder::new(
        cfg.build_command.clone(),
        cfg.entry_point_default.clone(),
    ));
    let controller = Arc::new(CycleController::new(
        provider.clone(),
        builder,
        workspace,
        cfg.protected_paths.clone(),
        cfg.run_command.clone(),
        cfg.env.clone(),
        TERMINATE_GRACE,
    ));

    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let poller_handle = {
        let shutdown = shutdown_tx.clone();
        let poller = Poller::new(provider, controller.clone(), cfg.poll_interval());
        tokio::spawn(async move {
            let result = poller.run(shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down supervisor");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Runtime(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (poller_result, signal_result) = tokio::join!(poller_handle, signal_handle);
    handle_join("poller", poller_result)?;
    handle_join("signal_handler", signal_result)?;

    // The managed process must not outlive the supervisor.
    controller.terminate_process().await;
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Runtime(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
