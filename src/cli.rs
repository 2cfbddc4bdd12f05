use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// installkit - Run ordered install sequences from JSON plans
#[derive(Parser)]
#[command(name = "installkit")]
#[command(about = "Runs ordered, fail-fast install sequences described by JSON plans")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute an install plan
    Run {
        /// Path to the install plan (JSON)
        plan: PathBuf,

        /// Dry-run mode: report every step without executing any of them
        #[arg(long)]
        dry_run: bool,

        /// Answer registry reads from a JSON snapshot instead of the host
        #[arg(long, value_name = "JSON")]
        registry_snapshot: Option<PathBuf>,

        /// Do not draw the progress bar
        #[arg(long)]
        no_progress: bool,
    },
    /// Validate an install plan without running it
    Validate {
        /// Path to the install plan (JSON)
        plan: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
