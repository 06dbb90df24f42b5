//! Domain layer - service model, configuration, outcomes and errors.
//!
//! This layer holds pure types without any I/O.

pub mod config;
pub mod error;
pub mod report;
pub mod service;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use report::{
    ArtifactInfo, ArtifactSummary, ConnectivityCheck, FileChecks, InstallOutcome, RuntimeChecks,
    ServiceHealth, UninstallOutcome, VerifyReport, Warning,
};
pub use service::{RuntimeState, ServiceDescriptor, UnitSpec};
