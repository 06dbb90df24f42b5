//! Operation outcomes: warnings, the verify report and its health summary.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::service::RuntimeState;

/// Non-fatal finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Neither `--help` nor `--version` succeeded.
    SmokeTestUnresponsive { executable: PathBuf },
    /// No reference copy was available to stage.
    NoReferenceCopy { path: PathBuf },
    /// The data directory holds no artifacts yet.
    NoDataArtifacts { data_dir: PathBuf },
    /// The configured server could not be reached.
    ServerUnreachable { endpoint: String, reason: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SmokeTestUnresponsive { executable } => write!(
                f,
                "{} did not answer --help or --version",
                executable.display()
            ),
            Self::NoReferenceCopy { path } => {
                write!(f, "no reference copy at {}, skipped", path.display())
            }
            Self::NoDataArtifacts { data_dir } => {
                write!(f, "no data files in {} yet", data_dir.display())
            }
            Self::ServerUnreachable { endpoint, reason } => {
                write!(f, "server {endpoint} unreachable: {reason}")
            }
        }
    }
}

/// Result of a successful install.
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    /// Runtime state observed after the settle delay.
    pub state: RuntimeState,
    /// Whether a running instance was stopped before the restart.
    pub replaced_running: bool,
    /// Non-fatal findings.
    pub warnings: Vec<Warning>,
}

/// Terminal state of an uninstall run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UninstallOutcome {
    /// First gate declined; nothing was touched.
    Declined,
    /// Service root removed with all data.
    FullyRemoved,
    /// Executable and reference copy removed, data directory kept.
    DataPreserved,
}

/// File and directory presence checks.
#[derive(Debug, Clone, Default, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct FileChecks {
    pub unit_present: bool,
    pub root_present: bool,
    pub executable_present: bool,
    pub executable_bit: bool,
    pub data_dir_present: bool,
    pub reference_present: bool,
}

/// Service manager view of the unit.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeChecks {
    pub state: RuntimeState,
    pub enabled: bool,
}

/// One agent-produced file.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactInfo {
    pub name: String,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Count and recency of data artifacts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArtifactSummary {
    pub count: usize,
    pub recent: Vec<ArtifactInfo>,
}

/// Outcome of the optional TCP probe.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectivityCheck {
    pub endpoint: String,
    pub reachable: bool,
}

/// Aggregate summary used for the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceHealth {
    /// Neither unit descriptor nor service root exist.
    NotInstalled,
    /// Active and enabled for boot.
    Healthy,
    /// Partially installed, stopped, failed or not enabled.
    Degraded,
}

impl fmt::Display for ServiceHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotInstalled => "not installed",
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
        };
        f.write_str(s)
    }
}

/// Everything the verifier observed.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub service: String,
    pub files: FileChecks,
    pub runtime: RuntimeChecks,
    pub status_text: Option<String>,
    pub journal: Option<String>,
    pub artifacts: ArtifactSummary,
    pub agent_log_tail: Option<String>,
    pub connectivity: Option<ConnectivityCheck>,
    pub warnings: Vec<Warning>,
    pub health: ServiceHealth,
}

impl ServiceHealth {
    /// Derive the summary from the file and runtime checks.
    #[must_use]
    pub const fn assess(files: &FileChecks, runtime: &RuntimeChecks) -> Self {
        if !files.unit_present
            && !files.root_present
            && matches!(runtime.state, RuntimeState::NotInstalled)
        {
            Self::NotInstalled
        } else if runtime.state.is_active() && runtime.enabled {
            Self::Healthy
        } else {
            Self::Degraded
        }
    }

    /// Process exit code for automation.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Healthy => 0,
            Self::NotInstalled | Self::Degraded => 1,
        }
    }
}
