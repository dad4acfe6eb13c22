//! Job state machine and run orchestration.
//!
//! [`execute_job`] drives one [`TargetDriver`] through probe, stage,
//! provision, invoke and verify. [`Bundler`] runs the jobs of a
//! [`BuildRequest`] one after another; a failed job is recorded and the next
//! one starts regardless.

use super::checksum::calculate_sha256;
use crate::bundler::{
    BuildArtifact, BuildContext, BuildTarget, FailureKind,
    build_log::BuildLog,
    error::{Error, ErrorExt, Result},
    platform::{Driver, DriverPhase, PhaseTracker, TargetDriver},
    probe::probe_tools,
    provision::Provisioner,
    report::Summary,
    request::{BuildJob, BuildRequest, JobFailure},
    staging::{StagingTree, require_entry_point},
    utils::fs,
};
use chrono::Local;
use std::path::{Path, PathBuf};

/// Runs a single job. The orchestrator only sees artifacts and failures.
#[allow(async_fn_in_trait)]
pub trait JobRunner {
    /// Build `target`, writing progress to `log`.
    async fn run_job(
        &mut self,
        ctx: &BuildContext,
        target: BuildTarget,
        log: &mut BuildLog,
    ) -> std::result::Result<BuildArtifact, JobFailure>;
}

/// Runs jobs with the real driver for each target.
pub struct DriverJobRunner {
    provisioner: Provisioner,
}

impl DriverJobRunner {
    /// Runner provisioning tools through `provisioner`.
    pub fn new(provisioner: Provisioner) -> Self {
        Self { provisioner }
    }
}

impl JobRunner for DriverJobRunner {
    async fn run_job(
        &mut self,
        ctx: &BuildContext,
        target: BuildTarget,
        log: &mut BuildLog,
    ) -> std::result::Result<BuildArtifact, JobFailure> {
        let mut driver = Driver::for_target(target);
        execute_job(&mut driver, ctx, &self.provisioner, log).await
    }
}

/// Files in `dir` whose names match `pattern`, sorted.
pub async fn find_artifacts(dir: &Path, pattern: &glob::Pattern) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(found),
        Err(e) => return Err(e).fs_context("listing output directory", dir),
    };
    while let Some(entry) = entries
        .next_entry()
        .await
        .fs_context("listing output directory", dir)?
    {
        if pattern.matches(&entry.file_name().to_string_lossy()) {
            found.push(entry.path());
        }
    }
    found.sort();
    Ok(found)
}

/// Exactly one non-empty regular file must match.
pub async fn verify_artifact(dir: &Path, pattern: &glob::Pattern) -> Result<PathBuf> {
    let matches = find_artifacts(dir, pattern).await?;
    let mut usable = Vec::new();
    for path in &matches {
        let meta = tokio::fs::metadata(path)
            .await
            .fs_context("reading artifact metadata", path)?;
        if meta.is_file() && meta.len() > 0 {
            usable.push(path.clone());
        }
    }

    match (matches.len(), usable.pop()) {
        (1, Some(path)) => Ok(path),
        (0, _) => Err(Error::Verification(format!(
            "no file matching `{}` in {}",
            pattern,
            dir.display()
        ))),
        (1, None) => Err(Error::Verification(format!(
            "{} is empty",
            matches[0].display()
        ))),
        (n, _) => Err(Error::Verification(format!(
            "expected one file matching `{}` in {}, found {}",
            pattern,
            dir.display(),
            n
        ))),
    }
}

async fn remove_stale(dir: &Path, pattern: &glob::Pattern, log: &mut BuildLog) -> Result<()> {
    for stale in find_artifacts(dir, pattern).await? {
        log.line(&format!("removing stale artifact {}", stale.display()))
            .await?;
        if stale.is_dir() {
            fs::remove_dir_all(&stale).await?;
        } else {
            tokio::fs::remove_file(&stale)
                .await
                .fs_context("removing stale artifact", &stale)?;
        }
    }
    Ok(())
}

fn failed(error: Error, phase_kind: FailureKind) -> JobFailure {
    JobFailure::from_error(&error, phase_kind)
}

/// Drive one job to a verified artifact.
///
/// The staging tree is removed after success unless the context asks to keep
/// it; after a failure it is always kept for inspection.
pub async fn execute_job<D: TargetDriver>(
    driver: &mut D,
    ctx: &BuildContext,
    provisioner: &Provisioner,
    log: &mut BuildLog,
) -> std::result::Result<BuildArtifact, JobFailure> {
    let target = driver.target();
    let mut phase = PhaseTracker::new(target);

    let log_err = |e: Error| failed(e, FailureKind::Environment);
    log.section(&format!("{} ({})", target.label(), ctx.timestamp()))
        .await
        .map_err(log_err)?;

    // Tools may have disappeared since the preflight probe.
    let report = probe_tools(target.spec().tools);
    let missing = report.missing_required();
    if !missing.is_empty() {
        let names: Vec<_> = missing.iter().map(|t| t.command).collect();
        return Err(JobFailure::new(
            FailureKind::Environment,
            format!("required tools missing: {}", names.join(", ")),
        ));
    }
    for spec in report.missing_optional() {
        log.line(&format!("optional tool `{}` not found", spec.command))
            .await
            .map_err(log_err)?;
    }

    let pattern = glob::Pattern::new(&target.artifact_glob(ctx.settings()))
        .map_err(|e| failed(e.into(), FailureKind::Environment))?;
    fs::create_dir_all(ctx.output_dir(), false)
        .await
        .map_err(|e| failed(e, FailureKind::Environment))?;
    remove_stale(ctx.output_dir(), &pattern, log)
        .await
        .map_err(|e| failed(e, FailureKind::Environment))?;

    let tree = StagingTree::create(ctx, target)
        .await
        .map_err(|e| failed(e, FailureKind::Staging))?;
    log.line(&format!("staging tree: {}", tree.root().display()))
        .await
        .map_err(log_err)?;

    let outcome = run_phases(driver, ctx, provisioner, &tree, &pattern, &mut phase, log).await;

    match outcome {
        Ok(artifact) => {
            if ctx.keep_staging() {
                log::info!("Keeping staging tree {}", tree.root().display());
            } else if let Err(e) = tree.cleanup().await {
                log::warn!("Could not remove staging tree: {}", e);
            }
            Ok(artifact)
        }
        Err(failure) => {
            // Only fails if the tracker is already terminal.
            let _ = phase.advance(DriverPhase::Failed);
            let _ = log.line(&format!("FAILED: {failure}")).await;
            let _ = log
                .line(&format!("staging tree kept at {}", tree.root().display()))
                .await;
            log::debug!("Staging tree kept at {}", tree.root().display());
            Err(failure)
        }
    }
}

async fn run_phases<D: TargetDriver>(
    driver: &mut D,
    ctx: &BuildContext,
    provisioner: &Provisioner,
    tree: &StagingTree,
    pattern: &glob::Pattern,
    phase: &mut PhaseTracker,
    log: &mut BuildLog,
) -> std::result::Result<BuildArtifact, JobFailure> {
    let target = driver.target();
    let internal = |e: Error| failed(e, FailureKind::Verification);

    require_entry_point(ctx).map_err(|e| failed(e, FailureKind::Staging))?;
    driver
        .stage(ctx, tree, log)
        .await
        .map_err(|e| failed(e, FailureKind::Staging))?;
    driver
        .provision(ctx, tree, provisioner, log)
        .await
        .map_err(|e| failed(e, FailureKind::Provision))?;
    phase.advance(DriverPhase::Staged).map_err(internal)?;

    let result = driver
        .invoke(ctx, tree, log)
        .await
        .map_err(|e| failed(e, FailureKind::Invocation))?;
    result
        .check(driver.fatal_patterns())
        .map_err(|e| failed(e, FailureKind::Invocation))?;
    phase.advance(DriverPhase::Invoked).map_err(internal)?;

    let path = verify_artifact(ctx.output_dir(), pattern)
        .await
        .map_err(|e| failed(e, FailureKind::Verification))?;
    phase.advance(DriverPhase::Verified).map_err(internal)?;

    if driver.executable_artifact() {
        fs::set_mode(&path, 0o755).await.map_err(internal)?;
    }
    let size = tokio::fs::metadata(&path)
        .await
        .fs_context("reading artifact metadata", &path)
        .map_err(internal)?
        .len();
    let checksum = calculate_sha256(&path).await.map_err(internal)?;
    phase.advance(DriverPhase::Succeeded).map_err(internal)?;

    log.line(&format!("artifact: {} ({} bytes, sha256 {})", path.display(), size, checksum))
        .await
        .map_err(internal)?;

    Ok(BuildArtifact {
        target,
        path,
        size,
        checksum,
    })
}

/// Runs every job of a request in selection order.
///
/// # Examples
///
/// ```no_run
/// use stemweaver_bundler::bundler::{
///     BuildContext, BuildRequest, BuildTarget, Bundler, DriverJobRunner, Provisioner,
/// };
///
/// # async fn example(ctx: BuildContext) {
/// let request = BuildRequest::new([BuildTarget::Deb], &ctx);
/// let mut runner = DriverJobRunner::new(Provisioner::new(ctx.tools_dir()));
/// let summary = Bundler::new(&ctx).run(&request, &mut runner).await;
/// println!("{}", summary.render_plain());
/// # }
/// ```
#[derive(Debug)]
pub struct Bundler<'a> {
    ctx: &'a BuildContext,
}

impl<'a> Bundler<'a> {
    /// Orchestrator for runs in `ctx`.
    pub fn new(ctx: &'a BuildContext) -> Self {
        Self { ctx }
    }

    /// Returns the build context.
    pub fn context(&self) -> &BuildContext {
        self.ctx
    }

    /// Run all jobs. Never fails: every outcome is recorded in the summary.
    pub async fn run<R: JobRunner>(&self, request: &BuildRequest, runner: &mut R) -> Summary {
        let started_at = Local::now();
        let total = request.len();
        let mut jobs = Vec::with_capacity(total);

        for (index, &target) in request.targets().iter().enumerate() {
            log::info!(
                "[{}/{}] Building {} (about {} min)",
                index + 1,
                total,
                target.label(),
                target.spec().estimate_minutes
            );
            jobs.push(self.run_one(request, target, runner).await);
        }

        Summary::new(jobs, started_at, Local::now())
    }

    async fn run_one<R: JobRunner>(
        &self,
        request: &BuildRequest,
        target: BuildTarget,
        runner: &mut R,
    ) -> BuildJob {
        let mut job = BuildJob::new(target);

        let mut log = match BuildLog::create(request.log_dir(), target, request.timestamp()).await
        {
            Ok(log) => log,
            Err(e) => {
                log::error!("✗ {}: cannot open build log: {}", target, e);
                record(&mut job, |job| {
                    job.fail(JobFailure::from_error(&e, FailureKind::Environment))
                });
                return job;
            }
        };
        let log_path = log.path().to_path_buf();
        record(&mut job, |job| job.start(log_path.clone()));

        match runner.run_job(self.ctx, target, &mut log).await {
            Ok(artifact) => {
                log::info!("✓ {} → {}", target, artifact.path.display());
                record(&mut job, |job| job.succeed(artifact));
            }
            Err(failure) => {
                log::error!("✗ {}: {} (log: {})", target, failure, log_path.display());
                record(&mut job, |job| job.fail(failure));
            }
        }
        job
    }
}

fn record(job: &mut BuildJob, transition: impl FnOnce(&mut BuildJob) -> Result<()>) {
    if let Err(e) = transition(job) {
        log::error!("{}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn verification_requires_exactly_one_non_empty_match() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = glob::Pattern::new("stemweaver_1.1_*.deb").unwrap();

        let err = verify_artifact(dir.path(), &pattern).await.unwrap_err();
        assert!(matches!(err, Error::Verification(_)));

        std::fs::write(dir.path().join("stemweaver_1.1_all.deb"), b"").unwrap();
        let err = verify_artifact(dir.path(), &pattern).await.unwrap_err();
        assert!(err.to_string().contains("empty"));

        std::fs::write(dir.path().join("stemweaver_1.1_all.deb"), b"!<arch>").unwrap();
        std::fs::write(dir.path().join("unrelated.txt"), b"x").unwrap();
        let found = verify_artifact(dir.path(), &pattern).await.unwrap();
        assert!(found.ends_with("stemweaver_1.1_all.deb"));

        std::fs::write(dir.path().join("stemweaver_1.1_amd64.deb"), b"!<arch>").unwrap();
        let err = verify_artifact(dir.path(), &pattern).await.unwrap_err();
        assert!(err.to_string().contains("found 2"));
    }

    #[tokio::test]
    async fn missing_output_dir_has_no_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = glob::Pattern::new("*.rpm").unwrap();
        let found = find_artifacts(&dir.path().join("absent"), &pattern)
            .await
            .unwrap();
        assert!(found.is_empty());
    }
}
