//! Vigil — self-updating deployment supervisor CLI.
//!
//! # Usage
//!
//! ```text
//! vigil init --owner <owner> --repo <repo> [--branch <branch>] [--force]
//! vigil check
//! vigil run
//! ```
//!
//! `run` polls the configured repository branch and keeps exactly one built
//! instance of it running, replacing the instance whenever the branch moves.
//! The `GITHUB_TOKEN` environment variable must be set; a missing credential
//! is a fatal configuration error (exit code 1).

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{check::CheckArgs, init::InitArgs, run::RunArgs};

#[derive(Parser, Debug)]
#[command(
    name = "vigil",
    version,
    about = "Watch a remote repository and keep one built instance of it running",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a starter config to ~/.vigil/config.yaml.
    Init(InitArgs),

    /// Resolve the configured reference and print its current commit.
    Check(CheckArgs),

    /// Run the supervisor in the foreground (poll + sync + build + run).
    Run(RunArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Check(args) => args.run(),
        Commands::Run(args) => args.run(),
    }
}
