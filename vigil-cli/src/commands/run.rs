//! `vigil run` — foreground supervisor loop.

use anyhow::{Context, Result};
use clap::Args;

use vigil_daemon::start_blocking;

/// Run the supervisor in the foreground.
#[derive(Args, Debug)]
pub struct RunArgs {}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let home = dirs::home_dir().context("could not determine home directory")?;
        start_blocking(&home).context("supervisor exited with error")?;
        Ok(())
    }
}
