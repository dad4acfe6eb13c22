//! Build requests and per-target job bookkeeping.

use super::{BuildArtifact, BuildContext, BuildTarget, FailureKind, error::Error};
use chrono::{DateTime, Local};
use std::{fmt, path::{Path, PathBuf}};

/// The targets selected for one run.
///
/// Created once per confirmed selection and never modified afterwards.
#[derive(Clone, Debug)]
pub struct BuildRequest {
    targets: Vec<BuildTarget>,
    timestamp: String,
    log_dir: PathBuf,
}

impl BuildRequest {
    /// Request for `targets` in the given order. Later duplicates are dropped.
    pub fn new(targets: impl IntoIterator<Item = BuildTarget>, ctx: &BuildContext) -> Self {
        let mut unique = Vec::new();
        for target in targets {
            if !unique.contains(&target) {
                unique.push(target);
            }
        }
        Self {
            targets: unique,
            timestamp: ctx.timestamp().to_string(),
            log_dir: ctx.logs_dir(),
        }
    }

    /// Selected targets in selection order.
    pub fn targets(&self) -> &[BuildTarget] {
        &self.targets
    }

    /// Shared run timestamp.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Shared log directory.
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Number of jobs this request produces.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether nothing was selected.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Lifecycle of a job. Transitions only move forward.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Not started.
    Pending,
    /// Driver running.
    Running,
    /// Artifact produced and verified.
    Succeeded,
    /// Ended with a failure.
    Failed,
}

impl JobStatus {
    /// Whether the status can no longer change.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    fn can_advance_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Pending, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Succeeded)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

/// Why a job failed.
#[derive(Clone, Debug)]
pub struct JobFailure {
    /// Failure class.
    pub kind: FailureKind,
    /// Human-readable cause.
    pub message: String,
}

impl JobFailure {
    /// Failure of the given class.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify `error` raised during a phase whose default class is
    /// `phase_kind`.
    pub fn from_error(error: &Error, phase_kind: FailureKind) -> Self {
        Self::new(error.kind_or(phase_kind), error.to_string())
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// One target within one request.
#[derive(Clone, Debug)]
pub struct BuildJob {
    target: BuildTarget,
    status: JobStatus,
    log_path: Option<PathBuf>,
    started_at: Option<DateTime<Local>>,
    finished_at: Option<DateTime<Local>>,
    artifact: Option<BuildArtifact>,
    failure: Option<JobFailure>,
}

impl BuildJob {
    /// A pending job.
    pub fn new(target: BuildTarget) -> Self {
        Self {
            target,
            status: JobStatus::Pending,
            log_path: None,
            started_at: None,
            finished_at: None,
            artifact: None,
            failure: None,
        }
    }

    /// Mark the job running, writing to `log_path`.
    pub fn start(&mut self, log_path: PathBuf) -> Result<(), Error> {
        self.advance(JobStatus::Running)?;
        self.log_path = Some(log_path);
        self.started_at = Some(Local::now());
        Ok(())
    }

    /// Record a verified artifact.
    pub fn succeed(&mut self, artifact: BuildArtifact) -> Result<(), Error> {
        self.advance(JobStatus::Succeeded)?;
        self.artifact = Some(artifact);
        self.finished_at = Some(Local::now());
        Ok(())
    }

    /// Record a failure.
    pub fn fail(&mut self, failure: JobFailure) -> Result<(), Error> {
        self.advance(JobStatus::Failed)?;
        self.failure = Some(failure);
        self.finished_at = Some(Local::now());
        Ok(())
    }

    fn advance(&mut self, next: JobStatus) -> Result<(), Error> {
        if !self.status.can_advance_to(next) {
            return Err(Error::GenericError(format!(
                "job {}: invalid status transition {:?} -> {:?}",
                self.target, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    /// Target built by this job.
    pub fn target(&self) -> BuildTarget {
        self.target
    }

    /// Current status.
    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Log file, once started.
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Start time.
    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }

    /// End time.
    pub fn finished_at(&self) -> Option<DateTime<Local>> {
        self.finished_at
    }

    /// Artifact on success.
    pub fn artifact(&self) -> Option<&BuildArtifact> {
        self.artifact.as_ref()
    }

    /// Failure on failure.
    pub fn failure(&self) -> Option<&JobFailure> {
        self.failure.as_ref()
    }

    /// Seconds between start and finish.
    pub fn elapsed_secs(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_seconds()),
            _ => None,
        }
    }
}
