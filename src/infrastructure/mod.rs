//! Infrastructure layer - external adapters (systemd, filesystem, network).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod config;
pub mod file_ops;
pub mod privilege;
pub mod probe;
pub mod prompt;
pub mod systemd;

pub use config::load_config;
pub use prompt::{Confirmation, LinePrompt, PresetAnswers};
pub use systemd::{ServiceManager, SystemdService};
