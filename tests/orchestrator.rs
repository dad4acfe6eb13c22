//! Job state machine and run orchestration with scripted drivers.
#![cfg(unix)]

use std::{
    os::unix::{fs::PermissionsExt, process::ExitStatusExt},
    path::PathBuf,
    process::ExitStatus,
    time::Duration,
};
use stemweaver_bundler::bundler::{
    BuildArtifact, BuildContext, BuildLog, BuildRequest, BuildTarget, Bundler, Error,
    FailureKind, JobFailure, JobRunner, JobStatus, PackageSettings, Provisioner, Result,
    SettingsBuilder, StagingTree, TargetDriver, WorkspaceResolver, execute_job,
    process::ProcessResult,
};
use tempfile::TempDir;

const ARTIFACT: &str = "StemWeaver-1.1-x86_64.AppImage";

fn context(dir: &TempDir) -> BuildContext {
    let source = dir.path().join("src");
    std::fs::create_dir_all(source.join("gui_data")).unwrap();
    std::fs::write(source.join("gui_data/gui_modern_extractor.py"), "print(1)\n").unwrap();
    let settings = SettingsBuilder::new()
        .source_dir(&source)
        .output_dir(dir.path().join("dist"))
        .package_settings(PackageSettings {
            version: "1.1".into(),
            ..Default::default()
        })
        .build()
        .unwrap();
    let workspace = WorkspaceResolver::with_candidates(vec![dir.path().join("scratch")])
        .resolve()
        .unwrap();
    workspace.create_layout().unwrap();
    BuildContext::new(settings, workspace)
        .with_tools_dir(dir.path().join("tools"))
        .with_timestamp("20250101-120000")
}

fn exited(code: i32, stderr: &[&str]) -> ProcessResult {
    ProcessResult {
        command: "fake-packager".to_string(),
        status: ExitStatus::from_raw(code << 8),
        stdout: Vec::new(),
        stderr: stderr.iter().map(|s| s.to_string()).collect(),
        elapsed: Duration::from_millis(5),
    }
}

/// What the scripted packager does when invoked.
#[derive(Clone, Copy)]
enum Script {
    Produce,
    ProduceNothing,
    ExitNonZero,
    FatalStderr,
    FailStaging,
}

struct Scripted {
    script: Script,
}

impl TargetDriver for Scripted {
    fn target(&self) -> BuildTarget {
        BuildTarget::AppImageX86_64
    }

    async fn stage(
        &mut self,
        _ctx: &BuildContext,
        tree: &StagingTree,
        log: &mut BuildLog,
    ) -> Result<()> {
        if let Script::FailStaging = self.script {
            return Err(Error::Staging("payload missing".into()));
        }
        tree.write_file("AppDir/AppRun", "#!/bin/sh\n").await?;
        log.line("staged").await
    }

    async fn invoke(
        &mut self,
        ctx: &BuildContext,
        _tree: &StagingTree,
        _log: &mut BuildLog,
    ) -> Result<ProcessResult> {
        match self.script {
            Script::Produce => {
                std::fs::write(ctx.output_dir().join(ARTIFACT), b"\x7fELF portable")?;
                Ok(exited(0, &[]))
            }
            Script::ProduceNothing => Ok(exited(0, &[])),
            Script::ExitNonZero => Ok(exited(1, &["boom"])),
            Script::FatalStderr => {
                std::fs::write(ctx.output_dir().join(ARTIFACT), b"partial")?;
                Ok(exited(0, &["Error: squashfs image too large"]))
            }
            Script::FailStaging => unreachable!("staging fails first"),
        }
    }

    fn fatal_patterns(&self) -> &'static [&'static str] {
        &[r"^Error:"]
    }
}

async fn run_script(
    ctx: &BuildContext,
    script: Script,
) -> (std::result::Result<BuildArtifact, JobFailure>, PathBuf) {
    let mut log = BuildLog::create(&ctx.logs_dir(), BuildTarget::AppImageX86_64, ctx.timestamp())
        .await
        .unwrap();
    let provisioner = Provisioner::new(ctx.tools_dir());
    let outcome = execute_job(&mut Scripted { script }, ctx, &provisioner, &mut log).await;
    (outcome, log.path().to_path_buf())
}

fn staging_tree(ctx: &BuildContext) -> PathBuf {
    ctx.staging_root().join("appimage-x86_64-20250101-120000")
}

#[tokio::test]
async fn successful_job_is_verified_and_finalized() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir);

    let (outcome, log_path) = run_script(&ctx, Script::Produce).await;
    let artifact = outcome.unwrap();

    assert_eq!(artifact.path, ctx.output_dir().join(ARTIFACT));
    assert_eq!(artifact.size, 14);
    assert_eq!(artifact.checksum.len(), 64);
    let mode = std::fs::metadata(&artifact.path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
    assert!(!staging_tree(&ctx).exists());

    let log = std::fs::read_to_string(log_path).unwrap();
    assert!(log.contains("staged"));
    assert!(log.contains(&artifact.checksum));
}

#[tokio::test]
async fn keep_staging_preserves_successful_trees() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir).with_keep_staging(true);

    let (outcome, _) = run_script(&ctx, Script::Produce).await;
    outcome.unwrap();
    assert!(staging_tree(&ctx).join("AppDir/AppRun").is_file());
}

#[tokio::test]
async fn clean_exit_without_artifact_is_a_verification_failure() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir);

    let (outcome, log_path) = run_script(&ctx, Script::ProduceNothing).await;
    let failure = outcome.unwrap_err();
    assert_eq!(failure.kind, FailureKind::Verification);
    assert!(staging_tree(&ctx).exists(), "failed trees are kept");
    assert!(std::fs::read_to_string(log_path).unwrap().contains("FAILED"));
}

#[tokio::test]
async fn stale_artifacts_do_not_count() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir);
    std::fs::create_dir_all(ctx.output_dir()).unwrap();
    std::fs::write(ctx.output_dir().join(ARTIFACT), b"from last week").unwrap();

    let (outcome, _) = run_script(&ctx, Script::ProduceNothing).await;
    assert_eq!(outcome.unwrap_err().kind, FailureKind::Verification);
    assert!(!ctx.output_dir().join(ARTIFACT).exists());
}

#[tokio::test]
async fn non_zero_exit_and_fatal_output_are_invocation_failures() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir);

    let (outcome, _) = run_script(&ctx, Script::ExitNonZero).await;
    let failure = outcome.unwrap_err();
    assert_eq!(failure.kind, FailureKind::Invocation);
    assert!(failure.message.contains("exit code 1"));

    let (outcome, _) = run_script(&ctx, Script::FatalStderr).await;
    let failure = outcome.unwrap_err();
    assert_eq!(failure.kind, FailureKind::Invocation);
    assert!(failure.message.contains("squashfs image too large"));
}

#[tokio::test]
async fn staging_errors_keep_their_class() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir);

    let (outcome, _) = run_script(&ctx, Script::FailStaging).await;
    assert_eq!(outcome.unwrap_err().kind, FailureKind::Staging);
}

#[tokio::test]
async fn missing_entry_point_fails_before_staging() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir);
    std::fs::remove_file(ctx.source_dir().join("gui_data/gui_modern_extractor.py")).unwrap();

    let (outcome, _) = run_script(&ctx, Script::Produce).await;
    let failure = outcome.unwrap_err();
    assert_eq!(failure.kind, FailureKind::Staging);
    assert!(failure.message.contains("gui_modern_extractor.py"));
    assert!(!ctx.output_dir().join(ARTIFACT).exists());
}

/// Fails the targets it is told to and succeeds the rest.
struct FlakyRunner {
    failing: Vec<BuildTarget>,
    ran: Vec<BuildTarget>,
}

impl JobRunner for FlakyRunner {
    async fn run_job(
        &mut self,
        ctx: &BuildContext,
        target: BuildTarget,
        log: &mut BuildLog,
    ) -> std::result::Result<BuildArtifact, JobFailure> {
        self.ran.push(target);
        log.line("running").await.unwrap();
        if self.failing.contains(&target) {
            return Err(JobFailure::new(FailureKind::Invocation, "tool crashed"));
        }
        Ok(BuildArtifact {
            target,
            path: ctx.output_dir().join(format!("{}.out", target.id())),
            size: 1,
            checksum: "0".repeat(64),
        })
    }
}

#[tokio::test]
async fn a_failed_job_does_not_stop_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir);
    let request = BuildRequest::new(
        [
            BuildTarget::Deb,
            BuildTarget::AppImageX86_64,
            BuildTarget::Deb,
            BuildTarget::Rpm,
        ],
        &ctx,
    );
    assert_eq!(request.len(), 3);

    let mut runner = FlakyRunner {
        failing: vec![BuildTarget::AppImageX86_64],
        ran: Vec::new(),
    };
    let summary = Bundler::new(&ctx).run(&request, &mut runner).await;

    assert_eq!(
        runner.ran,
        vec![BuildTarget::Deb, BuildTarget::AppImageX86_64, BuildTarget::Rpm]
    );
    let statuses: Vec<_> = summary.jobs().iter().map(|j| j.status()).collect();
    assert_eq!(
        statuses,
        vec![JobStatus::Succeeded, JobStatus::Failed, JobStatus::Succeeded]
    );
    assert!(!summary.all_succeeded());

    let failed = summary.failed().next().unwrap();
    let log_path = failed.log_path().unwrap();
    assert!(log_path.ends_with("appimage-x86_64-20250101-120000.log"));
    assert!(log_path.is_file());
    assert!(summary.render_plain().contains("tool crashed"));
}
