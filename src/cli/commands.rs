//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::model::Verb;

/// fabric-vrf - Declarative VRF management for fabric controllers.
#[derive(Parser, Debug)]
#[command(name = "fabric-vrf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the task file.
    #[arg(short, long, global = true, env = "FABRIC_VRF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the task file without contacting the controller.
    Validate,

    /// Show what a run would change.
    Plan,

    /// Run the task against the controller.
    Apply {
        /// Override the task's state.
        #[arg(short, long)]
        state: Option<Verb>,
    },

    /// Show current VRF state.
    Query {
        /// Fabric to read (defaults to the task's entries).
        #[arg(short, long)]
        fabric: Option<String>,

        /// VRF to read (requires --fabric).
        #[arg(long, requires = "fabric")]
        vrf: Option<String>,

        /// Wait for each VRF to finish deploying.
        #[arg(short, long)]
        wait: bool,
    },

    /// Wait for one VRF to finish deploying.
    Wait {
        /// Fabric name.
        #[arg(short, long)]
        fabric: String,

        /// VRF name.
        #[arg(long)]
        vrf: String,

        /// Maximum number of polls (defaults to the task's setting).
        #[arg(long)]
        retries: Option<u32>,

        /// Delay between polls in seconds (defaults to the task's setting).
        #[arg(long)]
        delay: Option<u64>,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
