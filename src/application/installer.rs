//! Install service.
//!
//! Stages the agent into its service root, publishes the unit descriptor
//! and brings the unit up. Every step converges: re-running after a failure
//! at any point ends in the same state as a clean run.

use std::fs;
use std::thread;

use nix::unistd::User;

use crate::domain::{
    AppConfig, AppError, InstallOutcome, Result, RuntimeState, ServiceDescriptor, UnitSpec,
    Warning,
};
use crate::infrastructure::file_ops::{
    apply_ownership, copy_file_atomic, resolve_account, stage_executable, write_file_atomic,
    UNIT_MODE,
};
use crate::infrastructure::{privilege, probe, ServiceManager};

/// Service for installing the agent.
pub struct Installer<'a, M> {
    config: &'a AppConfig,
    manager: &'a M,
    descriptor: ServiceDescriptor,
}

impl<'a, M: ServiceManager> Installer<'a, M> {
    /// Create a new installer for the configured deployment.
    #[must_use]
    pub fn new(config: &'a AppConfig, manager: &'a M) -> Self {
        Self {
            config,
            manager,
            descriptor: ServiceDescriptor::from_config(&config.service),
        }
    }

    /// Run the full install.
    ///
    /// # Errors
    /// `Config`, `Permission` and `MissingArtifact` before anything is
    /// touched; `Integrity`, `StartFailure` or `VerificationFailure` afterwards.
    pub fn install(&self) -> Result<InstallOutcome> {
        let d = &self.descriptor;
        let unit = d.unit_name();
        let mut warnings = Vec::new();

        let account = self.check_preconditions()?;

        tracing::info!(service = %d.name, root = %d.root.display(), "Installing");

        fs::create_dir_all(&d.data_dir).map_err(|e| {
            AppError::io(format!("Failed to create {}", d.data_dir.display()), e)
        })?;

        stage_executable(&self.config.source_executable(), &d.executable)?;

        if !probe::smoke_test(&d.executable, self.config.install.smoke_timeout()) {
            let warning = Warning::SmokeTestUnresponsive {
                executable: d.executable.clone(),
            };
            tracing::warn!("{warning}");
            warnings.push(warning);
        }

        self.stage_reference(&mut warnings)?;

        let unit_spec = UnitSpec::for_service(d, &self.config.service);
        write_file_atomic(&d.unit_path, unit_spec.render().as_bytes(), UNIT_MODE)?;
        tracing::info!(path = %d.unit_path.display(), "Unit file written");

        apply_ownership(&[d.root.as_path(), d.data_dir.as_path()], &account)?;

        self.manager.daemon_reload()?;

        let replaced_running = self.manager.runtime_state(&unit)?.is_active();
        if replaced_running {
            tracing::info!(unit, "Stopping running instance");
            self.manager.stop(&unit)?;
        }

        self.manager.enable(&unit)?;

        if let Err(e) = self.manager.start(&unit) {
            return Err(AppError::StartFailure {
                message: e.to_string(),
                logs: self.journal_excerpt(self.config.install.start_failure_log_lines),
            });
        }

        thread::sleep(self.config.install.settle_delay());

        let state = self.manager.runtime_state(&unit)?;
        if state != RuntimeState::Active {
            return Err(AppError::VerificationFailure {
                message: format!("{unit} is {state}"),
                logs: self.journal_excerpt(self.config.install.verification_log_lines),
            });
        }

        tracing::info!(unit, "Service installed and running");

        Ok(InstallOutcome {
            state,
            replaced_running,
            warnings,
        })
    }

    /// Config, privilege, source and account checks; nothing is mutated
    /// before they pass.
    fn check_preconditions(&self) -> Result<User> {
        self.config.validate()?;

        let d = &self.descriptor;
        privilege::ensure_writable(&[d.root.as_path(), d.unit_dir()])?;

        let source = self.config.source_executable();
        if !source.is_file() {
            return Err(AppError::MissingArtifact { path: source });
        }

        resolve_account(&self.config.service.user)
    }

    fn stage_reference(&self, warnings: &mut Vec<Warning>) -> Result<()> {
        let source = &self.config.install.reference_source;

        if source.is_file() {
            copy_file_atomic(source, &self.descriptor.reference)?;
            tracing::info!(path = %self.descriptor.reference.display(), "Reference copy staged");
        } else {
            let warning = Warning::NoReferenceCopy {
                path: source.clone(),
            };
            tracing::warn!("{warning}");
            warnings.push(warning);
        }

        Ok(())
    }

    fn journal_excerpt(&self, lines: usize) -> String {
        self.manager
            .journal(&self.descriptor.unit_name(), lines)
            .unwrap_or_else(|e| format!("(journal unavailable: {e})"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    use nix::unistd::Uid;

    use crate::infrastructure::file_ops::is_executable;
    use crate::test_support::{tree_snapshot, write_script, Sandbox};

    #[test]
    fn test_clean_install() {
        let sandbox = Sandbox::new();
        let manager = sandbox.manager();
        let d = sandbox.descriptor();

        let outcome = Installer::new(&sandbox.config, &manager).install().unwrap();

        assert_eq!(outcome.state, RuntimeState::Active);
        assert!(!outcome.replaced_running);
        assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
        assert!(is_executable(&d.executable));
        assert!(d.data_dir.is_dir());
        assert!(d.reference.is_file());

        let unit = fs::read_to_string(&d.unit_path).unwrap();
        assert!(unit.contains(&format!("ExecStart={}\n", d.executable.display())));

        let state = manager.snapshot();
        assert!(state.active && state.enabled);
        assert_eq!(manager.calls(), vec!["daemon-reload", "enable", "start"]);
    }

    #[test]
    fn test_install_twice_is_idempotent() {
        let sandbox = Sandbox::new();
        let manager = sandbox.manager();
        let installer = Installer::new(&sandbox.config, &manager);

        installer.install().unwrap();
        let first_tree = tree_snapshot(sandbox.dir.path());
        let first_state = manager.snapshot();

        manager.clear_calls();
        let second = installer.install().unwrap();

        assert!(second.replaced_running);
        assert_eq!(
            manager.calls(),
            vec!["daemon-reload", "stop", "enable", "start"]
        );
        assert_eq!(tree_snapshot(sandbox.dir.path()), first_tree);
        let second_state = manager.snapshot();
        assert_eq!(
            (second_state.active, second_state.enabled, second_state.loaded),
            (first_state.active, first_state.enabled, first_state.loaded)
        );
    }

    #[test]
    fn test_install_converges_after_partial_run() {
        let clean = Sandbox::new();
        let clean_manager = clean.manager();
        Installer::new(&clean.config, &clean_manager).install().unwrap();

        let partial = Sandbox::new();
        let d = partial.descriptor();
        fs::create_dir_all(&d.root).unwrap();
        fs::write(d.root.join("sysmon-agent"), "stale").unwrap();
        let manager = partial.manager();

        Installer::new(&partial.config, &manager).install().unwrap();

        let paths = |tree: Vec<(std::path::PathBuf, Vec<u8>)>| {
            tree.into_iter().map(|(p, _)| p).collect::<Vec<_>>()
        };
        assert_eq!(
            paths(tree_snapshot(partial.dir.path())),
            paths(tree_snapshot(clean.dir.path()))
        );
        assert_eq!(
            fs::read(&d.executable).unwrap(),
            fs::read(clean.descriptor().executable).unwrap()
        );
        assert_eq!(manager.snapshot().active, clean_manager.snapshot().active);
        assert!(is_executable(&d.executable));
    }

    #[test]
    fn test_missing_source_fails_before_mutation() {
        let mut sandbox = Sandbox::new();
        sandbox.config.install.source_executable = Some(sandbox.dir.path().join("absent"));
        let manager = sandbox.manager();
        let before = tree_snapshot(sandbox.dir.path());

        let err = Installer::new(&sandbox.config, &manager).install().unwrap_err();

        assert!(matches!(err, AppError::MissingArtifact { .. }));
        assert_eq!(tree_snapshot(sandbox.dir.path()), before);
        assert!(manager.calls().is_empty());
    }

    #[test]
    fn test_start_refused_reports_logs() {
        let sandbox = Sandbox::new();
        let manager = sandbox.manager().refuse_start();

        let err = Installer::new(&sandbox.config, &manager).install().unwrap_err();

        assert!(matches!(err, AppError::StartFailure { .. }));
        assert_eq!(
            err.log_excerpt(),
            Some("sysmon-agent.service: last 20 lines\n")
        );
    }

    #[test]
    fn test_crash_after_start_is_verification_failure() {
        let sandbox = Sandbox::new();
        let manager = sandbox.manager().crash_after_start();

        let err = Installer::new(&sandbox.config, &manager).install().unwrap_err();

        assert!(matches!(err, AppError::VerificationFailure { .. }));
        assert!(err.to_string().contains("failed"));
        assert_eq!(
            err.log_excerpt(),
            Some("sysmon-agent.service: last 50 lines\n")
        );
    }

    #[test]
    fn test_unresponsive_agent_and_missing_reference_warn() {
        let mut sandbox = Sandbox::new();
        let source = sandbox.dir.path().join("work/hanging-agent");
        write_script(&source, "#!/bin/sh\nsleep 30\n");
        sandbox.config.install.source_executable = Some(source);
        sandbox.config.install.reference_source = sandbox.dir.path().join("work/none.py");
        let manager = sandbox.manager();

        let outcome = Installer::new(&sandbox.config, &manager).install().unwrap();

        assert_eq!(outcome.warnings.len(), 2);
        assert!(matches!(
            outcome.warnings[0],
            Warning::SmokeTestUnresponsive { .. }
        ));
        assert!(matches!(outcome.warnings[1], Warning::NoReferenceCopy { .. }));
        assert!(!sandbox.descriptor().reference.exists());
    }

    #[test]
    fn test_unknown_account_is_config_error() {
        let mut sandbox = Sandbox::new();
        sandbox.config.service.user = "no-such-account-for-agent".into();
        let manager = sandbox.manager();

        let before = tree_snapshot(sandbox.dir.path());

        let err = Installer::new(&sandbox.config, &manager).install().unwrap_err();

        assert!(matches!(err, AppError::Config { .. }));
        assert_eq!(tree_snapshot(sandbox.dir.path()), before);
        assert!(manager.calls().is_empty());
    }

    #[test]
    fn test_read_only_unit_dir_is_permission_error() {
        if Uid::effective().is_root() {
            return;
        }
        let sandbox = Sandbox::new();
        let manager = sandbox.manager();
        let unit_dir = sandbox.config.service.unit_dir.clone();
        fs::set_permissions(&unit_dir, fs::Permissions::from_mode(0o555)).unwrap();
        let before = tree_snapshot(sandbox.dir.path());

        let result = Installer::new(&sandbox.config, &manager).install();
        fs::set_permissions(&unit_dir, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(result, Err(AppError::Permission { .. })));
        assert_eq!(tree_snapshot(sandbox.dir.path()), before);
        assert!(manager.calls().is_empty());
    }

    #[test]
    fn test_unsafe_name_fails_before_mutation() {
        let mut sandbox = Sandbox::new();
        sandbox.config.service.name = "..".into();
        let manager = sandbox.manager();
        let before = tree_snapshot(sandbox.dir.path());

        let err = Installer::new(&sandbox.config, &manager).install().unwrap_err();

        assert!(matches!(err, AppError::Config { .. }));
        assert_eq!(tree_snapshot(sandbox.dir.path()), before);
        assert!(manager.calls().is_empty());
    }
}
