//! Application layer - the install, verify and uninstall operations.
//!
//! Each operation re-queries the service manager and filesystem on every
//! run; nothing about the deployment is cached between calls.

pub mod formatter;
pub mod installer;
pub mod uninstaller;
pub mod verifier;

pub use formatter::{
    format_install_outcome, format_uninstall_outcome, format_verify_json, format_verify_report,
};
pub use installer::Installer;
pub use uninstaller::Uninstaller;
pub use verifier::Verifier;
