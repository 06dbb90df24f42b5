//! Verify service.
//!
//! Read-only inspection of the deployment. Each check stands alone, so a
//! missing unit file never hides what the filesystem check would show.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::domain::{
    AppConfig, ArtifactInfo, ArtifactSummary, ConnectivityCheck, FileChecks, RuntimeChecks,
    RuntimeState, ServiceDescriptor, ServiceHealth, VerifyReport, Warning,
};
use crate::infrastructure::file_ops::is_executable;
use crate::infrastructure::{probe, ServiceManager};

/// Service for inspecting an installed agent.
pub struct Verifier<'a, M> {
    config: &'a AppConfig,
    manager: &'a M,
    descriptor: ServiceDescriptor,
}

impl<'a, M: ServiceManager> Verifier<'a, M> {
    /// Create a new verifier for the configured deployment.
    #[must_use]
    pub fn new(config: &'a AppConfig, manager: &'a M) -> Self {
        Self {
            config,
            manager,
            descriptor: ServiceDescriptor::from_config(&config.service),
        }
    }

    /// Run every check and aggregate the findings.
    #[must_use]
    pub fn verify(&self, log_lines: Option<usize>) -> VerifyReport {
        let d = &self.descriptor;
        let unit = d.unit_name();
        let log_lines = log_lines.unwrap_or(self.config.verify.log_lines);
        let mut warnings = Vec::new();

        let files = self.check_files();
        let runtime = self.check_runtime(&unit);

        let status_text = self
            .manager
            .status_text(&unit)
            .inspect_err(|e| tracing::warn!(error = %e, "Status unavailable"))
            .ok();
        let journal = self
            .manager
            .journal(&unit, log_lines)
            .inspect_err(|e| tracing::warn!(error = %e, "Journal unavailable"))
            .ok();

        let artifacts = scan_artifacts(&d.data_dir, self.config.verify.recent_artifacts);
        if files.data_dir_present && artifacts.count == 0 {
            warnings.push(Warning::NoDataArtifacts {
                data_dir: d.data_dir.clone(),
            });
        }

        let agent_log_tail = tail_file(&d.agent_log, log_lines);
        let connectivity = self.check_connectivity(&mut warnings);

        for warning in &warnings {
            tracing::warn!("{warning}");
        }

        let health = ServiceHealth::assess(&files, &runtime);
        tracing::info!(%health, state = %runtime.state, enabled = runtime.enabled, "Verification complete");

        VerifyReport {
            service: d.name.clone(),
            files,
            runtime,
            status_text,
            journal,
            artifacts,
            agent_log_tail,
            connectivity,
            warnings,
            health,
        }
    }

    fn check_files(&self) -> FileChecks {
        let d = &self.descriptor;
        FileChecks {
            unit_present: d.unit_path.is_file(),
            root_present: d.root.is_dir(),
            executable_present: d.executable.is_file(),
            executable_bit: is_executable(&d.executable),
            data_dir_present: d.data_dir.is_dir(),
            reference_present: d.reference.is_file(),
        }
    }

    fn check_runtime(&self, unit: &str) -> RuntimeChecks {
        let state = self.manager.runtime_state(unit).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Runtime state unavailable");
            RuntimeState::NotInstalled
        });
        let enabled = self.manager.is_enabled(unit).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Enablement unavailable");
            false
        });

        RuntimeChecks { state, enabled }
    }

    fn check_connectivity(&self, warnings: &mut Vec<Warning>) -> Option<ConnectivityCheck> {
        let text = fs::read_to_string(&self.descriptor.reference).ok()?;
        let verify = &self.config.verify;
        let endpoint = probe::extract_endpoint(&text, &verify.host_key, &verify.port_key)?;

        let reachable = match probe::tcp_probe(&endpoint, verify.probe_timeout()) {
            Ok(()) => true,
            Err(reason) => {
                warnings.push(Warning::ServerUnreachable {
                    endpoint: endpoint.to_string(),
                    reason,
                });
                false
            }
        };

        Some(ConnectivityCheck {
            endpoint: endpoint.to_string(),
            reachable,
        })
    }
}

/// Count regular files in `dir` and list the `recent` newest ones.
fn scan_artifacts(dir: &Path, recent: usize) -> ArtifactSummary {
    let Ok(entries) = fs::read_dir(dir) else {
        return ArtifactSummary::default();
    };

    let mut files: Vec<ArtifactInfo> = entries
        .filter_map(std::result::Result::ok)
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            if !metadata.is_file() {
                return None;
            }
            Some(ArtifactInfo {
                name: entry.file_name().to_string_lossy().to_string(),
                size_bytes: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            })
        })
        .collect();

    files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
    let count = files.len();
    files.truncate(recent);

    ArtifactSummary {
        count,
        recent: files,
    }
}

/// Last `lines` lines of a text file, if it exists.
fn tail_file(path: &Path, lines: usize) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    let all: Vec<&str> = content.lines().collect();
    let start = all.len().saturating_sub(lines);
    Some(all[start..].join("\n"))
}
