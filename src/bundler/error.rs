//! Error types for bundling operations.
//!
//! Every error that can end a build job maps onto one [`FailureKind`], the
//! classification shown in the end-of-run summary.

use std::{
    fmt::Display,
    io,
    path::{Path, PathBuf},
};
use thiserror::Error as DeriveError;

/// Result type alias for bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of a failed build job.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// No writable scratch space, or a required tool is missing.
    Environment,
    /// A packaging tool could not be downloaded or extracted.
    Provision,
    /// The staging tree could not be built.
    Staging,
    /// The packaging tool exited non-zero or printed a fatal diagnostic.
    Invocation,
    /// The packaging tool claimed success but left no usable artifact.
    Verification,
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::Environment => "environment failure",
            FailureKind::Provision => "provision failure",
            FailureKind::Staging => "staging failure",
            FailureKind::Invocation => "invocation failure",
            FailureKind::Verification => "verification failure",
        };
        f.write_str(name)
    }
}

/// Errors returned by the bundler.
#[derive(Debug, DeriveError)]
pub enum Error {
    /// The host environment cannot run a build at all.
    #[error("environment failure: {0}")]
    Environment(String),

    /// A third-party tool could not be made available.
    #[error("failed to provision {tool}: {reason}")]
    Provision {
        /// Tool name.
        tool: String,
        /// What went wrong, after every fallback was tried.
        reason: String,
    },

    /// The staging tree could not be produced.
    #[error("staging failed: {0}")]
    Staging(String),

    /// The packaging tool failed.
    #[error("`{command}` failed ({status}){detail}")]
    Invocation {
        /// Command line that was run.
        command: String,
        /// Exit status description.
        status: String,
        /// Extra detail, such as the matched fatal diagnostic.
        detail: String,
    },

    /// The packaging tool exited successfully without a usable artifact.
    #[error("verification failed: {0}")]
    Verification(String),

    /// A command could not be spawned.
    #[error("failed to run `{command}`: {error}")]
    CommandFailed {
        /// Command name.
        command: String,
        /// Spawn error.
        error: io::Error,
    },

    /// An IO error annotated with the operation and path.
    #[error("{context} `{}`: {error}", path.display())]
    Fs {
        /// Operation being performed.
        context: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        error: io::Error,
    },

    /// Bare IO error.
    #[error(transparent)]
    IoError(#[from] io::Error),

    /// Directory traversal error.
    #[error(transparent)]
    WalkDir(#[from] walkdir::Error),

    /// Path prefix error.
    #[error(transparent)]
    StripPrefix(#[from] std::path::StripPrefixError),

    /// Invalid glob pattern.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Template rendering error.
    #[error("template error: {0}")]
    Template(#[from] handlebars::RenderError),

    /// Icon decoding or encoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Zip extraction error.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// HTTP client error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all.
    #[error("{0}")]
    GenericError(String),
}

impl Error {
    /// The failure class this error represents when it ends a job in the
    /// given phase. Errors that already carry a class keep it.
    pub fn kind_or(&self, phase_kind: FailureKind) -> FailureKind {
        match self {
            Error::Environment(_) => FailureKind::Environment,
            Error::Provision { .. } => FailureKind::Provision,
            Error::Staging(_) => FailureKind::Staging,
            Error::Invocation { .. } => FailureKind::Invocation,
            Error::Verification(_) => FailureKind::Verification,
            _ => phase_kind,
        }
    }
}

/// Convenience macro returning early with [`Error::GenericError`].
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($($arg)*)))
    };
}

/// Attach a message to an `Option` or `Result`.
pub trait Context<T> {
    /// Wrap the failure in [`Error::GenericError`] with `msg`.
    fn context<C: Display>(self, msg: C) -> Result<T>;
}

impl<T> Context<T> for Option<T> {
    fn context<C: Display>(self, msg: C) -> Result<T> {
        self.ok_or_else(|| Error::GenericError(msg.to_string()))
    }
}

impl<T, E: Display> Context<T> for std::result::Result<T, E> {
    fn context<C: Display>(self, msg: C) -> Result<T> {
        self.map_err(|e| Error::GenericError(format!("{msg}: {e}")))
    }
}

/// Path-aware IO error annotation.
pub trait ErrorExt<T> {
    /// Annotate an IO failure with the operation and path.
    fn fs_context(self, context: &'static str, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, io::Error> {
    fn fs_context(self, context: &'static str, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.as_ref().to_path_buf(),
            error,
        })
    }
}
