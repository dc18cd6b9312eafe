use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dasher")]
#[command(author, version, about = "DASH packager for HbbTV")]
pub struct Cli {
    /// Path to config file (TOML or .properties)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write the log to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Package one input into a DASH presentation
    Run {
        /// Log every command without executing anything
        #[arg(long)]
        dry_run: bool,

        /// Parameter overrides, e.g. `input=clip.mp4 output=out drm.kid=rng`
        #[arg(value_name = "KEY=VALUE")]
        overrides: Vec<String>,
    },

    /// Probe a media file and display its metadata
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration and print the effective parameters
    Validate {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Parameter overrides
        #[arg(value_name = "KEY=VALUE")]
        overrides: Vec<String>,
    },

    /// Display version information
    Version,
}
