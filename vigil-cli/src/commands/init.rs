//! `vigil init --owner <owner> --repo <repo> [--branch <branch>] [--force]`

use anyhow::{bail, Context, Result};
use clap::Args;

use vigil_core::config;

/// Write a starter config to `~/.vigil/config.yaml`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Remote repository owner (user or organization).
    #[arg(long)]
    pub owner: String,

    /// Remote repository name.
    #[arg(long)]
    pub repo: String,

    /// Remote reference to follow.
    #[arg(long, default_value = "main")]
    pub branch: String,

    /// Overwrite an existing config file.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = dirs::home_dir().context("could not determine home directory")?;

        let path = config::config_path_at(&home);
        if path.exists() && !self.force {
            bail!(
                "config already exists at {}; pass --force to overwrite",
                path.display()
            );
        }

        let mut cfg = config::SupervisorConfig::template();
        cfg.owner = self.owner;
        cfg.repo = self.repo;
        cfg.branch = self.branch;

        let path = config::save_at(&home, &cfg).context("failed to write config")?;
        println!("✓ Wrote config for {}/{} ({})", cfg.owner, cfg.repo, cfg.branch);
        println!("  Saved to: {}", path.display());
        println!("  Set {} before running `vigil run`.", config::TOKEN_ENV_VAR);
        Ok(())
    }
}
