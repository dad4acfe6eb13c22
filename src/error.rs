//! Top-level error types for the command line front end.
//!
//! Library failures arrive as [`crate::bundler::Error`]; this module adds the
//! CLI and configuration failures around them and maps everything onto a
//! process exit status.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, BundlerError>;

/// Exit status when every job succeeded or the operator exited cleanly.
pub const EXIT_OK: i32 = 0;
/// Exit status when a job failed or the invocation was invalid.
pub const EXIT_FAILURE: i32 = 1;
/// Exit status when the host cannot run builds at all.
pub const EXIT_ENVIRONMENT: i32 = 2;
/// Exit status after Ctrl-C.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Main error type for all bundler operations
#[derive(Error, Debug)]
pub enum BundlerError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("invalid bundle.toml: {0}")]
    Toml(#[from] toml::de::Error),

    /// Bundler errors
    #[error("{0}")]
    Bundler(#[from] crate::bundler::Error),

    /// Generic errors from anyhow
    #[error("{0:#}")]
    Anyhow(#[from] anyhow::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// A non-interactive selection resolved to no targets.
    #[error("selection `{selection}` names no build targets")]
    EmptySelection {
        /// The selection as given
        selection: String,
    },

    /// Command execution failed
    #[error("Command execution failed: {command} - {reason}")]
    ExecutionFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },
}

impl BundlerError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            BundlerError::Bundler(crate::bundler::Error::Environment(_)) => EXIT_ENVIRONMENT,
            _ => EXIT_FAILURE,
        }
    }
}
