//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Agent Lifecycle - install, verify and uninstall the monitoring agent service.
#[derive(Parser, Debug)]
#[command(name = "agent-lifecycle")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// TOML configuration file (defaults are used when omitted).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stage the agent, register the unit and start it (requires root).
    Install,

    /// Inspect the deployment; exit code 0 only when active and enabled.
    Verify {
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,

        /// Number of journal lines to show.
        #[arg(short, long)]
        lines: Option<usize>,
    },

    /// Stop and remove the service (requires root).
    Uninstall {
        /// Answer for the uninstall confirmation (prompted when omitted).
        #[arg(long, value_name = "TOKEN")]
        confirm: Option<String>,

        /// Answer for the data deletion confirmation (prompted when omitted).
        #[arg(long, value_name = "TOKEN")]
        purge_data: Option<String>,
    },
}
