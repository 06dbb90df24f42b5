//! Configuration for the lifecycle manager.
//!
//! Every field carries a serde default so an empty or absent config file
//! produces a working setup for the stock agent deployment.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{AppError, Result};

/// Identity and layout of the managed service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name; all paths derive from it.
    #[serde(default = "default_name")]
    pub name: String,

    /// Human-readable unit description.
    #[serde(default = "default_description")]
    pub description: String,

    /// Directory under which the service root is created.
    #[serde(default = "default_install_base")]
    pub install_base: PathBuf,

    /// Service manager unit directory.
    #[serde(default = "default_unit_dir")]
    pub unit_dir: PathBuf,

    /// File name of the staged executable (defaults to the service name).
    #[serde(default)]
    pub executable_name: Option<String>,

    /// System account the agent runs as.
    #[serde(default = "default_user")]
    pub user: String,

    /// Name of the data subdirectory.
    #[serde(default = "default_data_dir_name")]
    pub data_dir_name: String,

    /// File name of the reference copy inside the service root.
    #[serde(default = "default_reference_name")]
    pub reference_name: String,

    /// Log file the agent writes into its working directory.
    #[serde(default = "default_agent_log_name")]
    pub agent_log_name: String,

    /// Fixed delay between automatic restarts.
    #[serde(default = "default_restart_sec")]
    pub restart_sec: u64,

    /// Rolling window for start-rate limiting.
    #[serde(default = "default_start_limit_interval")]
    pub start_limit_interval_sec: u64,

    /// Maximum starts within the window.
    #[serde(default = "default_start_limit_burst")]
    pub start_limit_burst: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            description: default_description(),
            install_base: default_install_base(),
            unit_dir: default_unit_dir(),
            executable_name: None,
            user: default_user(),
            data_dir_name: default_data_dir_name(),
            reference_name: default_reference_name(),
            agent_log_name: default_agent_log_name(),
            restart_sec: default_restart_sec(),
            start_limit_interval_sec: default_start_limit_interval(),
            start_limit_burst: default_start_limit_burst(),
        }
    }
}

impl ServiceConfig {
    /// Executable file name, falling back to the service name.
    #[must_use]
    pub fn executable_name(&self) -> &str {
        self.executable_name.as_deref().unwrap_or(&self.name)
    }
}

fn default_name() -> String {
    "sysmon-agent".into()
}

fn default_description() -> String {
    "System monitoring agent".into()
}

fn default_install_base() -> PathBuf {
    PathBuf::from("/opt")
}

fn default_unit_dir() -> PathBuf {
    PathBuf::from("/etc/systemd/system")
}

fn default_user() -> String {
    "root".into()
}

fn default_data_dir_name() -> String {
    "data".into()
}

fn default_reference_name() -> String {
    "agent.py".into()
}

fn default_agent_log_name() -> String {
    "system_monitor.log".into()
}

const fn default_restart_sec() -> u64 {
    10
}

const fn default_start_limit_interval() -> u64 {
    300
}

const fn default_start_limit_burst() -> u32 {
    5
}

/// Installer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Executable to stage, relative to the working directory.
    #[serde(default)]
    pub source_executable: Option<PathBuf>,

    /// Optional human-readable reference copy to stage.
    #[serde(default = "default_reference_source")]
    pub reference_source: PathBuf,

    /// Pause after start before re-checking the runtime state.
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,

    /// Journal lines captured when the start call fails.
    #[serde(default = "default_start_failure_lines")]
    pub start_failure_log_lines: usize,

    /// Journal lines captured when the unit does not stay active.
    #[serde(default = "default_verification_lines")]
    pub verification_log_lines: usize,

    /// Deadline for each `--help` / `--version` probe.
    #[serde(default = "default_smoke_timeout")]
    pub smoke_timeout_secs: u64,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            source_executable: None,
            reference_source: default_reference_source(),
            settle_secs: default_settle_secs(),
            start_failure_log_lines: default_start_failure_lines(),
            verification_log_lines: default_verification_lines(),
            smoke_timeout_secs: default_smoke_timeout(),
        }
    }
}

impl InstallConfig {
    /// Settle delay as a duration.
    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    /// Smoke probe deadline as a duration.
    #[must_use]
    pub const fn smoke_timeout(&self) -> Duration {
        Duration::from_secs(self.smoke_timeout_secs)
    }
}

fn default_reference_source() -> PathBuf {
    PathBuf::from("agent.py")
}

const fn default_settle_secs() -> u64 {
    3
}

const fn default_start_failure_lines() -> usize {
    20
}

const fn default_verification_lines() -> usize {
    50
}

const fn default_smoke_timeout() -> u64 {
    5
}

/// Verifier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Journal lines shown in the report.
    #[serde(default = "default_log_lines")]
    pub log_lines: usize,

    /// Number of most recent data artifacts listed.
    #[serde(default = "default_recent_artifacts")]
    pub recent_artifacts: usize,

    /// TCP connect timeout for the connectivity probe.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Assignment name holding the server host in the reference copy.
    #[serde(default = "default_host_key")]
    pub host_key: String,

    /// Assignment name holding the server port in the reference copy.
    #[serde(default = "default_port_key")]
    pub port_key: String,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            log_lines: default_log_lines(),
            recent_artifacts: default_recent_artifacts(),
            probe_timeout_ms: default_probe_timeout_ms(),
            host_key: default_host_key(),
            port_key: default_port_key(),
        }
    }
}

impl VerifyConfig {
    /// Probe timeout as a duration.
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

const fn default_log_lines() -> usize {
    20
}

const fn default_recent_artifacts() -> usize {
    3
}

const fn default_probe_timeout_ms() -> u64 {
    3000
}

fn default_host_key() -> String {
    "SERVER_HOST".into()
}

fn default_port_key() -> String {
    "SERVER_PORT".into()
}

/// Uninstaller settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UninstallConfig {
    /// Exact answer that confirms a destructive step.
    #[serde(default = "default_confirm_token")]
    pub confirm_token: String,
}

impl Default for UninstallConfig {
    fn default() -> Self {
        Self {
            confirm_token: default_confirm_token(),
        }
    }
}

fn default_confirm_token() -> String {
    "yes".into()
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Managed service identity and layout.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Installer settings.
    #[serde(default)]
    pub install: InstallConfig,

    /// Verifier settings.
    #[serde(default)]
    pub verify: VerifyConfig,

    /// Uninstaller settings.
    #[serde(default)]
    pub uninstall: UninstallConfig,
}

impl AppConfig {
    /// Executable to stage, defaulting to `./<executable_name>`.
    #[must_use]
    pub fn source_executable(&self) -> PathBuf {
        self.install
            .source_executable
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.service.executable_name()))
    }

    /// Reject values that would send a path outside the service root or
    /// let an empty answer pass a confirmation gate.
    ///
    /// # Errors
    /// Returns `Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let service = &self.service;
        check_path_component("service.name", &service.name)?;
        check_path_component("service.executable_name", service.executable_name())?;
        check_path_component("service.data_dir_name", &service.data_dir_name)?;
        check_path_component("service.reference_name", &service.reference_name)?;
        check_path_component("service.agent_log_name", &service.agent_log_name)?;

        if self.uninstall.confirm_token.trim().is_empty() {
            return Err(AppError::Config {
                message: "uninstall.confirm_token must not be blank".into(),
            });
        }

        Ok(())
    }
}

/// A single, plain file name: not empty, not `.` or `..`, no separators.
fn check_path_component(field: &str, value: &str) -> Result<()> {
    let plain = !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\', '\0']);

    if plain {
        Ok(())
    } else {
        Err(AppError::Config {
            message: format!("{field} must be a plain file name, got {value:?}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.service.name, "sysmon-agent");
        assert_eq!(config.service.executable_name(), "sysmon-agent");
        assert_eq!(config.service.unit_dir, PathBuf::from("/etc/systemd/system"));
        assert_eq!(config.install.settle_secs, 3);
        assert_eq!(config.uninstall.confirm_token, "yes");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
[service]
name = "probe"
executable_name = "probe-bin"

[verify]
probe_timeout_ms = 500
"#,
        )
        .unwrap();

        assert_eq!(config.service.name, "probe");
        assert_eq!(config.service.executable_name(), "probe-bin");
        assert_eq!(config.source_executable(), PathBuf::from("probe-bin"));
        assert_eq!(config.verify.probe_timeout(), Duration::from_millis(500));
        assert_eq!(config.verify.host_key, "SERVER_HOST");
        assert_eq!(config.service.data_dir_name, "data");
    }

    #[test]
    fn test_defaults_validate() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn test_names_escaping_the_service_root_are_rejected() {
        for bad in ["", ".", "..", "a/b", "../etc", "/abs"] {
            let mut config = AppConfig::default();
            config.service.name = bad.into();
            assert!(
                matches!(config.validate(), Err(AppError::Config { .. })),
                "{bad:?}"
            );
        }

        let mut config = AppConfig::default();
        config.service.data_dir_name = "..".into();
        assert!(matches!(config.validate(), Err(AppError::Config { .. })));

        let mut config = AppConfig::default();
        config.service.executable_name = Some("bin/agent".into());
        assert!(matches!(config.validate(), Err(AppError::Config { .. })));

        let mut config = AppConfig::default();
        config.service.reference_name = String::new();
        assert!(matches!(config.validate(), Err(AppError::Config { .. })));
    }

    #[test]
    fn test_blank_confirm_token_rejected() {
        for token in ["", "  "] {
            let mut config = AppConfig::default();
            config.uninstall.confirm_token = token.into();
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("confirm_token"), "{token:?}");
        }
    }
}
