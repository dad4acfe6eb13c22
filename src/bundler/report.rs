//! End-of-run summary.

use super::{
    request::{BuildJob, JobStatus},
    utils::{humanize_duration, humanize_size},
};
use chrono::{DateTime, Local};
use std::fmt::Write as _;

/// Outcome of every job of a run, in selection order.
#[derive(Debug)]
pub struct Summary {
    jobs: Vec<BuildJob>,
    started_at: DateTime<Local>,
    finished_at: DateTime<Local>,
}

impl Summary {
    /// Summary over finished jobs.
    pub fn new(
        jobs: Vec<BuildJob>,
        started_at: DateTime<Local>,
        finished_at: DateTime<Local>,
    ) -> Self {
        Self {
            jobs,
            started_at,
            finished_at,
        }
    }

    /// Every job, in selection order.
    pub fn jobs(&self) -> &[BuildJob] {
        &self.jobs
    }

    /// Jobs that produced an artifact.
    pub fn succeeded(&self) -> impl Iterator<Item = &BuildJob> {
        self.jobs
            .iter()
            .filter(|job| job.status() == JobStatus::Succeeded)
    }

    /// Jobs that failed.
    pub fn failed(&self) -> impl Iterator<Item = &BuildJob> {
        self.jobs
            .iter()
            .filter(|job| job.status() == JobStatus::Failed)
    }

    /// Whether the run is a success: at least one job and none failed.
    pub fn all_succeeded(&self) -> bool {
        !self.jobs.is_empty() && self.failed().next().is_none()
    }

    /// Wall-clock duration of the run.
    pub fn elapsed_secs(&self) -> u64 {
        (self.finished_at - self.started_at).num_seconds().max(0) as u64
    }

    /// Plain-text rendering, one block per job followed by totals.
    pub fn render_plain(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Build summary");
        let _ = writeln!(out, "=============");

        for job in &self.jobs {
            let took = job
                .elapsed_secs()
                .map(|s| humanize_duration(s.max(0) as u64))
                .unwrap_or_else(|| "-".to_string());

            match (job.artifact(), job.failure()) {
                (Some(artifact), _) => {
                    let _ = writeln!(out, "✓ {} ({})", job.target(), took);
                    let _ = writeln!(out, "    artifact: {}", artifact.path.display());
                    let _ = writeln!(out, "    size:     {}", humanize_size(artifact.size));
                    let _ = writeln!(out, "    sha256:   {}", artifact.checksum);
                }
                (None, Some(failure)) => {
                    let _ = writeln!(out, "✗ {} ({})", job.target(), took);
                    let _ = writeln!(out, "    {}", failure);
                    if let Some(log) = job.log_path() {
                        let _ = writeln!(out, "    log:      {}", log.display());
                    }
                }
                (None, None) => {
                    let _ = writeln!(out, "- {} (not run)", job.target());
                }
            }
        }

        let _ = writeln!(
            out,
            "\n{} succeeded, {} failed, {} total in {}",
            self.succeeded().count(),
            self.failed().count(),
            self.jobs.len(),
            humanize_duration(self.elapsed_secs())
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{
        BuildArtifact, BuildTarget, FailureKind,
        request::JobFailure,
    };
    use std::path::PathBuf;

    fn finished_jobs() -> Vec<BuildJob> {
        let mut ok = BuildJob::new(BuildTarget::AppImageX86_64);
        ok.start(PathBuf::from("/logs/appimage-x86_64.log")).unwrap();
        ok.succeed(BuildArtifact {
            target: BuildTarget::AppImageX86_64,
            path: PathBuf::from("/dist/StemWeaver-1.1-x86_64.AppImage"),
            size: 3 * 1024 * 1024,
            checksum: "ab".repeat(32),
        })
        .unwrap();

        let mut bad = BuildJob::new(BuildTarget::Deb);
        bad.start(PathBuf::from("/logs/deb.log")).unwrap();
        bad.fail(JobFailure::new(FailureKind::Invocation, "dpkg-deb exited 2"))
            .unwrap();

        vec![ok, bad]
    }

    #[test]
    fn summary_keeps_selection_order_and_counts() {
        let now = Local::now();
        let summary = Summary::new(finished_jobs(), now, now);
        assert!(!summary.all_succeeded());
        assert_eq!(summary.succeeded().count(), 1);
        assert_eq!(summary.failed().count(), 1);

        let text = summary.render_plain();
        let ok_at = text.find("✓ appimage-x86_64").unwrap();
        let bad_at = text.find("✗ deb").unwrap();
        assert!(ok_at < bad_at);
        assert!(text.contains("3.0 MiB"));
        assert!(text.contains("invocation failure: dpkg-deb exited 2"));
        assert!(text.contains("log:      /logs/deb.log"));
        assert!(text.contains("1 succeeded, 1 failed, 2 total"));
    }

    #[test]
    fn empty_run_is_not_a_success() {
        let now = Local::now();
        assert!(!Summary::new(Vec::new(), now, now).all_succeeded());
    }
}
