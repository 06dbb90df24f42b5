//! Uninstall service.
//!
//! Two confirmation gates: the first guards the whole run, the second
//! guards the agent's collected data. Each removal step checks for its
//! target first, so any partially removed deployment can be finished.

use crate::domain::{AppConfig, Result, ServiceDescriptor, UninstallOutcome};
use crate::infrastructure::file_ops::{remove_dir_if_present, remove_file_if_present};
use crate::infrastructure::prompt::confirm;
use crate::infrastructure::{privilege, Confirmation, ServiceManager};

/// Service for removing the agent.
pub struct Uninstaller<'a, M> {
    config: &'a AppConfig,
    manager: &'a M,
    descriptor: ServiceDescriptor,
}

impl<'a, M: ServiceManager> Uninstaller<'a, M> {
    /// Create a new uninstaller for the configured deployment.
    #[must_use]
    pub fn new(config: &'a AppConfig, manager: &'a M) -> Self {
        Self {
            config,
            manager,
            descriptor: ServiceDescriptor::from_config(&config.service),
        }
    }

    /// Run the gated uninstall.
    ///
    /// # Errors
    /// Returns error if the configuration is unsafe, the caller lacks
    /// privilege or a removal step fails. A declined gate is not an error.
    pub fn uninstall(&self, gate: &mut impl Confirmation) -> Result<UninstallOutcome> {
        let d = &self.descriptor;
        let unit = d.unit_name();
        let token = &self.config.uninstall.confirm_token;

        self.config.validate()?;
        privilege::ensure_writable(&[d.root.as_path(), d.unit_dir()])?;

        let question = format!(
            "This stops {unit} and removes it from {}.",
            d.unit_path.display()
        );
        if !confirm(gate, &question, token)? {
            tracing::info!("Uninstall declined, nothing changed");
            return Ok(UninstallOutcome::Declined);
        }

        if self.manager.runtime_state(&unit)?.needs_stop() {
            self.manager.stop(&unit)?;
            tracing::info!(unit, "Service stopped");
        }

        if self.manager.is_enabled(&unit)? {
            self.manager.disable(&unit)?;
            tracing::info!(unit, "Service disabled");
        }

        remove_file_if_present(&d.unit_path)?;
        self.manager.daemon_reload()?;

        if let Err(e) = self.manager.reset_failed(&unit) {
            tracing::debug!(error = %e, "No failure state to reset");
        }

        let question = format!(
            "Delete {} including all collected data in {}?",
            d.root.display(),
            d.data_dir.display()
        );
        if confirm(gate, &question, token)? {
            remove_dir_if_present(&d.root)?;
            tracing::info!(root = %d.root.display(), "Service fully removed");
            Ok(UninstallOutcome::FullyRemoved)
        } else {
            remove_file_if_present(&d.executable)?;
            remove_file_if_present(&d.reference)?;
            tracing::info!(data = %d.data_dir.display(), "Service removed, data preserved");
            Ok(UninstallOutcome::DataPreserved)
        }
    }
}
