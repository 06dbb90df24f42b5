//! Domain-level error types for agent-lifecycle.
//!
//! All errors are typed with `thiserror`. Every variant is fatal: the
//! operation aborts and the CLI exits non-zero. Non-fatal findings are
//! [`Warning`](super::Warning) values, never errors.

use std::path::PathBuf;
use thiserror::Error;

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// Caller cannot write the service root or the unit directory.
    #[error("Permission denied: {message}")]
    Permission { message: String },

    /// A file that must be staged is not present.
    #[error("Missing artifact: {}", .path.display())]
    MissingArtifact { path: PathBuf },

    /// The filesystem did not honor a permission change.
    #[error("Integrity check failed: {message}")]
    Integrity { message: String },

    /// The service manager refused to start the unit.
    #[error("Service failed to start: {message}")]
    StartFailure { message: String, logs: String },

    /// The unit started but did not stay active.
    #[error("Service is not active after start: {message}")]
    VerificationFailure { message: String, logs: String },

    /// A service-manager command failed where failure is fatal.
    #[error("Service manager error: {message}")]
    ServiceManager { message: String },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Create a service-manager error.
    pub fn service_manager(message: impl Into<String>) -> Self {
        Self::ServiceManager {
            message: message.into(),
        }
    }

    /// Journal lines captured for start and verification failures.
    #[must_use]
    pub fn log_excerpt(&self) -> Option<&str> {
        match self {
            Self::StartFailure { logs, .. } | Self::VerificationFailure { logs, .. } => {
                Some(logs.as_str())
            }
            _ => None,
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
