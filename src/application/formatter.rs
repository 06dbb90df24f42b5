//! Output formatting for operation outcomes.
//!
//! Human-readable views use `colored` and `comfy-table`; the verify report
//! also has a JSON form for automation.

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};

use crate::domain::{InstallOutcome, ServiceHealth, UninstallOutcome, VerifyReport};

fn mark(ok: bool) -> String {
    if ok {
        "✓".green().bold().to_string()
    } else {
        "✗".red().bold().to_string()
    }
}

/// Formats the verify report for the terminal.
pub fn format_verify_report(report: &VerifyReport) -> String {
    let mut out = String::new();
    let f = &report.files;

    out.push_str(&format!("{} {}\n\n", "🔍 Verifying".bold(), report.service.cyan()));

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Check", "Result"]);
    table.add_row(vec!["Unit descriptor".to_string(), mark(f.unit_present)]);
    table.add_row(vec!["Service root".to_string(), mark(f.root_present)]);
    table.add_row(vec!["Executable".to_string(), mark(f.executable_present)]);
    table.add_row(vec!["Executable bit".to_string(), mark(f.executable_bit)]);
    table.add_row(vec!["Data directory".to_string(), mark(f.data_dir_present)]);
    table.add_row(vec!["Reference copy".to_string(), mark(f.reference_present)]);
    table.add_row(vec![
        "Active".to_string(),
        format!("{} {}", mark(report.runtime.state.is_active()), report.runtime.state),
    ]);
    table.add_row(vec!["Enabled at boot".to_string(), mark(report.runtime.enabled)]);
    if let Some(ref c) = report.connectivity {
        table.add_row(vec![
            format!("Server {}", c.endpoint),
            mark(c.reachable),
        ]);
    }
    out.push_str(&table.to_string());
    out.push_str("\n\n");

    out.push_str(&format!(
        "{} {} file(s)\n",
        "📁 Data:".bold(),
        report.artifacts.count.to_string().cyan()
    ));
    for artifact in &report.artifacts.recent {
        let modified = artifact.modified.map_or_else(
            || "-".to_string(),
            |dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        );
        out.push_str(&format!(
            "  {} ({} bytes, {})\n",
            artifact.name, artifact.size_bytes, modified
        ));
    }

    if let Some(ref status) = report.status_text {
        out.push_str(&format!("\n{}\n{}\n", "📋 Status".bold(), status.trim_end()));
    }

    if let Some(ref journal) = report.journal {
        out.push_str(&format!("\n{}\n{}\n", "📜 Journal".bold(), journal.trim_end()));
    }

    if let Some(ref tail) = report.agent_log_tail {
        out.push_str(&format!("\n{}\n{}\n", "🗒  Agent log".bold(), tail.trim_end()));
    }

    if !report.warnings.is_empty() {
        out.push('\n');
        for warning in &report.warnings {
            out.push_str(&format!("{} {warning}\n", "⚠".yellow().bold()));
        }
    }

    let summary = match report.health {
        ServiceHealth::Healthy => report.health.to_string().green().bold(),
        ServiceHealth::Degraded => report.health.to_string().yellow().bold(),
        ServiceHealth::NotInstalled => report.health.to_string().red().bold(),
    };
    out.push_str(&format!("\n{} {summary}", "Summary:".bold()));

    out
}

/// Formats the verify report as JSON.
///
/// # Errors
/// Returns error if serialization fails.
pub fn format_verify_json(report: &VerifyReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

/// Formats the result of a successful install.
pub fn format_install_outcome(outcome: &InstallOutcome, service: &str) -> String {
    let mut out = String::new();

    for warning in &outcome.warnings {
        out.push_str(&format!("{} {warning}\n", "⚠".yellow().bold()));
    }

    let verb = if outcome.replaced_running {
        "reinstalled"
    } else {
        "installed"
    };
    out.push_str(&format!(
        "{} {} {verb}, state: {}",
        "✓".green().bold(),
        service.cyan(),
        outcome.state.to_string().green()
    ));

    out
}

/// Formats the result of an uninstall run.
pub fn format_uninstall_outcome(outcome: UninstallOutcome, service: &str) -> String {
    match outcome {
        UninstallOutcome::Declined => format!("{} Uninstall cancelled, nothing changed", "ℹ".blue()),
        UninstallOutcome::FullyRemoved => format!(
            "{} {} removed with all data",
            "✓".green().bold(),
            service.cyan()
        ),
        UninstallOutcome::DataPreserved => format!(
            "{} {} removed, collected data kept",
            "✓".green().bold(),
            service.cyan()
        ),
    }
}
