use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// driverwiz - a terminal wizard for device driver setup
#[derive(Parser)]
#[command(name = "driverwiz")]
#[command(about = "A terminal wizard for detecting, installing and removing device drivers")]
#[command(version)]
pub struct Cli {
    /// Run the whole flow without waiting for key input.
    ///
    /// Every screen auto-continues and the process exits with a non-zero
    /// code if the pipeline failed. Intended for scripted use and CI.
    #[arg(long, global = true)]
    pub batch: bool,

    /// Number of progress log lines to retain on the progressing screen
    #[arg(long, global = true, default_value_t = 10)]
    pub log_lines: usize,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the driver install wizard
    Install {
        /// Replay engine events from a recorded JSON plan instead of the
        /// built-in demo engine
        #[arg(short, long)]
        script: Option<PathBuf>,
    },
    /// Run the driver uninstall wizard
    Uninstall {
        /// Replay engine events from a recorded JSON plan
        #[arg(short, long)]
        script: Option<PathBuf>,
    },
    /// Validate a recorded engine plan file
    Validate {
        /// Path to the plan file to validate
        plan: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
