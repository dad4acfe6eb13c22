//! Scratch directory selection and log retention.
//!
//! The resolver walks an ordered candidate list and returns the first
//! directory that survives a write probe. It runs once per process; the
//! resulting [`Workspace`] is stored in the build context so every job agrees
//! on the scratch location.

use crate::bundler::error::{Error, Result};
use path_absolutize::Absolutize;
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::SystemTime,
};

/// Environment variable that pins the scratch directory.
pub const BUILD_DIR_ENV: &str = "STEMWEAVER_BUILD_DIR";

/// Subdirectory created under the system temp dir when the preferred root is
/// not writable.
pub const FALLBACK_DIR_NAME: &str = "stemweaver-build";

/// Number of build logs kept across runs.
pub const LOG_RETENTION: usize = 5;

/// A writable scratch root.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Scratch root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding per-job build logs.
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Directory holding per-job staging trees.
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join("staging")
    }

    /// Tool cache used when no user cache directory is available.
    pub fn tools_dir(&self) -> PathBuf {
        self.root.join("tools")
    }

    /// Create the log and staging directories.
    pub fn create_layout(&self) -> Result<()> {
        for dir in [self.logs_dir(), self.staging_dir()] {
            fs::create_dir_all(&dir).map_err(|e| {
                Error::Environment(format!("cannot create {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }
}

/// Picks a writable scratch root.
#[derive(Clone, Debug)]
pub struct WorkspaceResolver {
    override_dir: Option<PathBuf>,
    candidates: Vec<PathBuf>,
}

impl WorkspaceResolver {
    /// Preferred root first, then `<temp>/stemweaver-build`.
    pub fn new(preferred: impl Into<PathBuf>) -> Self {
        Self::with_candidates(vec![
            preferred.into(),
            std::env::temp_dir().join(FALLBACK_DIR_NAME),
        ])
    }

    /// Explicit ordered candidate list.
    pub fn with_candidates(candidates: Vec<PathBuf>) -> Self {
        Self {
            override_dir: None,
            candidates,
        }
    }

    /// Directory supplied by the caller (e.g. CI) that bypasses the
    /// candidate list. It is still write-probed.
    pub fn with_override(mut self, dir: Option<PathBuf>) -> Self {
        self.override_dir = dir.filter(|d| !d.as_os_str().is_empty());
        self
    }

    /// Return the first candidate that passes a write probe. The returned
    /// root is absolute and free of `.` and `..` components.
    ///
    /// # Errors
    ///
    /// [`Error::Environment`] when the override or every candidate fails.
    pub fn resolve(&self) -> Result<Workspace> {
        if let Some(dir) = &self.override_dir {
            return match absolute(dir).and_then(|dir| probe_writable(&dir).map(|()| dir)) {
                Ok(dir) => {
                    log::info!("Using scratch directory from {}: {}", BUILD_DIR_ENV, dir.display());
                    Ok(Workspace { root: dir })
                }
                Err(e) => Err(Error::Environment(format!(
                    "{} points to {}, which is not writable: {}",
                    BUILD_DIR_ENV,
                    dir.display(),
                    e
                ))),
            };
        }

        let mut failures = Vec::new();
        for candidate in &self.candidates {
            match absolute(candidate).and_then(|dir| probe_writable(&dir).map(|()| dir)) {
                Ok(root) => {
                    log::info!("Using scratch directory: {}", root.display());
                    return Ok(Workspace { root });
                }
                Err(e) => {
                    log::debug!("Scratch candidate {} rejected: {}", candidate.display(), e);
                    failures.push(format!("  {}: {}", candidate.display(), e));
                }
            }
        }

        Err(Error::Environment(format!(
            "no writable scratch directory:\n{}",
            failures.join("\n")
        )))
    }
}

fn absolute(dir: &Path) -> io::Result<PathBuf> {
    Ok(dir.absolutize()?.into_owned())
}

fn probe_writable(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let probe = dir.join(format!(".write-probe-{}", std::process::id()));
    fs::write(&probe, b"probe")?;
    fs::remove_file(&probe)
}

/// Result of a retention pass.
#[derive(Debug, Default)]
pub struct PruneOutcome {
    /// Logs still present, newest first.
    pub kept: Vec<PathBuf>,
    /// Logs deleted.
    pub removed: Vec<PathBuf>,
}

/// Keep the `keep` most recently modified `*.log` files in `dir` that are not
/// in `protect`, plus every protected path.
///
/// Paths in `protect` are never deleted. Deletion failures are logged and
/// skipped.
pub fn prune_logs(dir: &Path, keep: usize, protect: &[PathBuf]) -> Result<PruneOutcome> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(PruneOutcome::default()),
        Err(e) => {
            return Err(Error::Fs {
                context: "listing build logs in",
                path: dir.to_path_buf(),
                error: e,
            });
        }
    };

    let mut logs: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("log") {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        logs.push((modified, path));
    }

    logs.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));

    let mut outcome = PruneOutcome::default();
    let mut unprotected = 0;
    for (_, path) in logs {
        if protect.contains(&path) {
            outcome.kept.push(path);
            continue;
        }
        unprotected += 1;
        if unprotected <= keep {
            outcome.kept.push(path);
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("Pruned old build log {}", path.display());
                outcome.removed.push(path);
            }
            Err(e) => {
                log::warn!("Could not remove old build log {}: {}", path.display(), e);
                outcome.kept.push(path);
            }
        }
    }

    Ok(outcome)
}

/// Retention pass at the end of a run. At most `keep` logs survive; the last
/// `keep` of `referenced` (logs the run summary points at) are among them.
pub fn prune_after_run(dir: &Path, keep: usize, referenced: &[PathBuf]) -> Result<PruneOutcome> {
    let protect = &referenced[referenced.len().saturating_sub(keep)..];
    prune_logs(dir, keep - protect.len(), protect)
}
