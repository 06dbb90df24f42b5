//! Agent Lifecycle - manage the system monitoring agent as a systemd service.
//!
//! Three independent operations share one deployment model derived from the
//! service name:
//!   agent-lifecycle install      # stage, register, enable and start
//!   agent-lifecycle verify       # read-only report, exit 0 when healthy
//!   agent-lifecycle uninstall    # gated removal, optionally keeping data

mod application;
mod cli;
mod domain;
mod infrastructure;
#[cfg(test)]
mod test_support;

use std::io;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{
    format_install_outcome, format_uninstall_outcome, format_verify_json, format_verify_report,
    Installer, Uninstaller, Verifier,
};
use cli::{Cli, Commands};
use domain::AppConfig;
use infrastructure::{load_config, LinePrompt, PresetAnswers, SystemdService};

fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            if let Some(logs) = e.log_excerpt() {
                eprintln!("\n{}\n{}", "Recent logs:".bold(), logs.trim_end());
            }
            std::process::exit(1);
        }
    }
}

/// Main application logic; returns the process exit code.
fn run(cli: Cli) -> domain::Result<i32> {
    let config = load_config(cli.config.as_deref())?;
    let manager = SystemdService::new();

    match cli.command {
        Commands::Install => cmd_install(&config, &manager),
        Commands::Verify { json, lines } => cmd_verify(&config, &manager, json, lines),
        Commands::Uninstall {
            confirm,
            purge_data,
        } => cmd_uninstall(&config, &manager, confirm, purge_data),
    }
}

/// Install command.
fn cmd_install(config: &AppConfig, manager: &SystemdService) -> domain::Result<i32> {
    let outcome = Installer::new(config, manager).install()?;
    println!("{}", format_install_outcome(&outcome, &config.service.name));
    Ok(0)
}

/// Verify command.
fn cmd_verify(
    config: &AppConfig,
    manager: &SystemdService,
    json: bool,
    lines: Option<usize>,
) -> domain::Result<i32> {
    let report = Verifier::new(config, manager).verify(lines);

    let output = if json {
        format_verify_json(&report).map_err(|e| domain::AppError::Config {
            message: format!("Failed to serialize report: {e}"),
        })?
    } else {
        format_verify_report(&report)
    };

    println!("{output}");
    Ok(report.health.exit_code())
}

/// Uninstall command.
fn cmd_uninstall(
    config: &AppConfig,
    manager: &SystemdService,
    confirm: Option<String>,
    purge_data: Option<String>,
) -> domain::Result<i32> {
    let stdin = io::stdin();
    let mut gate = PresetAnswers::new(
        vec![confirm, purge_data],
        LinePrompt::new(stdin.lock(), io::stdout()),
    );

    let outcome = Uninstaller::new(config, manager).uninstall(&mut gate)?;
    println!("{}", format_uninstall_outcome(outcome, &config.service.name));
    Ok(0)
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time().with_writer(io::stderr))
        .with(filter)
        .init();
}
