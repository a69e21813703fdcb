//! `vigil check` — one-shot commit resolution against the configured remote.

use anyhow::{Context, Result};
use clap::Args;

use vigil_core::config;
use vigil_source::{GitHubProvider, SourceProvider};

/// Resolve the configured reference and print its current commit.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Emit machine-readable JSON instead of a plain line.
    #[arg(long)]
    pub json: bool,
}

impl CheckArgs {
    pub fn run(self) -> Result<()> {
        let home = dirs::home_dir().context("could not determine home directory")?;
        let cfg = config::load_at(&home).context("failed to load config")?;
        let token = config::token_from_env()?;

        let provider = GitHubProvider::new(
            cfg.owner.clone(),
            cfg.repo.clone(),
            cfg.branch.clone(),
            token,
        );

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to build tokio runtime")?;
        let commit = runtime
            .block_on(provider.resolve_commit())
            .context("failed to resolve remote commit")?;

        if self.json {
            let payload = serde_json::json!({
                "owner": cfg.owner,
                "repo": cfg.repo,
                "branch": cfg.branch,
                "commit": commit,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to render JSON")?
            );
        } else {
            println!("{}/{} {} -> {}", cfg.owner, cfg.repo, cfg.branch, commit);
        }
        Ok(())
    }
}
