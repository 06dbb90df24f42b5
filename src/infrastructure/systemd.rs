//! Systemd service manager integration.
//!
//! The [`ServiceManager`] trait is the only way the lifecycle operations talk
//! to the service manager. [`SystemdService`] drives the system instance of
//! systemd through `systemctl` and `journalctl`.

use std::process::{Command, Output};

use crate::domain::{AppError, Result, RuntimeState};

/// Operations the lifecycle core needs from the service manager.
pub trait ServiceManager {
    /// Re-read unit descriptors from disk.
    fn daemon_reload(&self) -> Result<()>;

    /// Current runtime state of the unit.
    fn runtime_state(&self, unit: &str) -> Result<RuntimeState>;

    /// Whether the unit is enabled for boot.
    fn is_enabled(&self, unit: &str) -> Result<bool>;

    fn start(&self, unit: &str) -> Result<()>;

    fn stop(&self, unit: &str) -> Result<()>;

    fn enable(&self, unit: &str) -> Result<()>;

    fn disable(&self, unit: &str) -> Result<()>;

    /// Clear the failure state recorded for the unit.
    fn reset_failed(&self, unit: &str) -> Result<()>;

    /// Human-readable status passthrough.
    fn status_text(&self, unit: &str) -> Result<String>;

    /// Most recent journal lines for the unit.
    fn journal(&self, unit: &str, lines: usize) -> Result<String>;
}

/// `systemctl`-backed service manager.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemdService;

impl SystemdService {
    /// Create a new systemd service manager.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn systemctl(args: &[&str]) -> Result<Output> {
        tracing::debug!(?args, "systemctl");
        Command::new("systemctl")
            .args(args)
            .output()
            .map_err(|e| AppError::io(format!("Failed to execute systemctl {}", args.join(" ")), e))
    }

    /// Run a systemctl action that must succeed.
    fn action(verb: &str, unit: &str) -> Result<()> {
        let output = Self::systemctl(&[verb, unit])?;

        if !output.status.success() {
            return Err(AppError::service_manager(format!(
                "systemctl {verb} {unit} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }
}

impl ServiceManager for SystemdService {
    fn daemon_reload(&self) -> Result<()> {
        let output = Self::systemctl(&["daemon-reload"])?;

        if !output.status.success() {
            return Err(AppError::service_manager(format!(
                "Failed to reload systemd daemon: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        tracing::info!("systemd daemon reloaded");
        Ok(())
    }

    fn runtime_state(&self, unit: &str) -> Result<RuntimeState> {
        let output = Self::systemctl(&[
            "show",
            unit,
            "-p",
            "LoadState",
            "-p",
            "ActiveState",
            "-p",
            "SubState",
        ])?;

        if !output.status.success() {
            return Err(AppError::service_manager(format!(
                "systemctl show {unit} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(parse_show_output(&String::from_utf8_lossy(&output.stdout)))
    }

    fn is_enabled(&self, unit: &str) -> Result<bool> {
        Ok(Self::systemctl(&["is-enabled", unit])?.status.success())
    }

    fn start(&self, unit: &str) -> Result<()> {
        Self::action("start", unit)
    }

    fn stop(&self, unit: &str) -> Result<()> {
        Self::action("stop", unit)
    }

    fn enable(&self, unit: &str) -> Result<()> {
        Self::action("enable", unit)
    }

    fn disable(&self, unit: &str) -> Result<()> {
        Self::action("disable", unit)
    }

    fn reset_failed(&self, unit: &str) -> Result<()> {
        Self::action("reset-failed", unit)
    }

    fn status_text(&self, unit: &str) -> Result<String> {
        // Non-zero exit only means "not running"; the text is still useful.
        let output = Self::systemctl(&["status", unit, "--no-pager"])?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn journal(&self, unit: &str, lines: usize) -> Result<String> {
        let output = Command::new("journalctl")
            .args(["-u", unit, "-n", &lines.to_string(), "--no-pager"])
            .output()
            .map_err(|e| AppError::io("Failed to get service logs", e))?;

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Map `systemctl show -p LoadState -p ActiveState -p SubState` output to a state.
///
/// Only `active` and `reloading` count as running, the same set
/// `systemctl is-active` accepts. A unit waiting out `RestartSec` after a
/// crash reports `activating` / `auto-restart` and is treated as failed.
fn parse_show_output(stdout: &str) -> RuntimeState {
    let mut load_state = "";
    let mut active_state = "";
    let mut sub_state = "";

    for line in stdout.lines() {
        if let Some(v) = line.strip_prefix("LoadState=") {
            load_state = v.trim();
        } else if let Some(v) = line.strip_prefix("ActiveState=") {
            active_state = v.trim();
        } else if let Some(v) = line.strip_prefix("SubState=") {
            sub_state = v.trim();
        }
    }

    if load_state == "not-found" || load_state.is_empty() {
        return RuntimeState::NotInstalled;
    }

    match (active_state, sub_state) {
        ("active" | "reloading", _) => RuntimeState::Active,
        ("failed", _) | ("activating", "auto-restart") => RuntimeState::Failed,
        _ => RuntimeState::Inactive,
    }
}
