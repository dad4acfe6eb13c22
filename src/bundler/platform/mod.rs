//! Target build drivers.
//!
//! Every output format implements [`TargetDriver`]. The job state machine in
//! [`crate::bundler::builder`] calls the hooks in a fixed order (stage,
//! provision, invoke) and owns verification; drivers only know how to lay out
//! their tree and which command turns it into a package.

pub mod linux;
pub mod source;
pub mod windows;

use crate::bundler::{
    BuildContext, BuildTarget,
    build_log::BuildLog,
    error::{Error, Result},
    process::ProcessResult,
    provision::Provisioner,
    staging::StagingTree,
};
use linux::{appimage::AppImageDriver, debian::DebianDriver, rpm::RpmDriver};
use source::SourceDriver;
use windows::nsis::NsisDriver;

/// Hooks a packaging format provides to the job state machine.
#[allow(async_fn_in_trait)]
pub trait TargetDriver {
    /// Target this driver builds.
    fn target(&self) -> BuildTarget;

    /// Lay out the staging tree.
    async fn stage(&mut self, ctx: &BuildContext, tree: &StagingTree, log: &mut BuildLog)
    -> Result<()>;

    /// Fetch third-party tools the invocation needs.
    async fn provision(
        &mut self,
        _ctx: &BuildContext,
        _tree: &StagingTree,
        _provisioner: &Provisioner,
        _log: &mut BuildLog,
    ) -> Result<()> {
        Ok(())
    }

    /// Run the packaging tool. The artifact must land in the output directory.
    async fn invoke(
        &mut self,
        ctx: &BuildContext,
        tree: &StagingTree,
        log: &mut BuildLog,
    ) -> Result<ProcessResult>;

    /// Stderr patterns that mean failure even after a zero exit status.
    fn fatal_patterns(&self) -> &'static [&'static str] {
        &[]
    }

    /// Whether the artifact is run directly and needs mode 0755.
    fn executable_artifact(&self) -> bool {
        self.target().executable_artifact()
    }
}

/// Driver phases. Only forward transitions are accepted.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum DriverPhase {
    /// Tools re-probed and stale artifacts removed.
    Prepared,
    /// Staging tree complete.
    Staged,
    /// Packaging tool exited cleanly.
    Invoked,
    /// Exactly one non-empty artifact found.
    Verified,
    /// Artifact finalized.
    Succeeded,
    /// Terminal failure.
    Failed,
}

/// Tracks a job's current [`DriverPhase`].
#[derive(Debug)]
pub struct PhaseTracker {
    target: BuildTarget,
    phase: DriverPhase,
}

impl PhaseTracker {
    /// Tracker starting at [`DriverPhase::Prepared`].
    pub fn new(target: BuildTarget) -> Self {
        Self {
            target,
            phase: DriverPhase::Prepared,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> DriverPhase {
        self.phase
    }

    /// Move to `next`. Moving backwards or out of a terminal phase is an
    /// error.
    pub fn advance(&mut self, next: DriverPhase) -> Result<()> {
        let terminal = matches!(self.phase, DriverPhase::Succeeded | DriverPhase::Failed);
        if terminal || next <= self.phase {
            return Err(Error::GenericError(format!(
                "{}: invalid phase transition {:?} -> {:?}",
                self.target, self.phase, next
            )));
        }
        log::debug!("{}: {:?} -> {:?}", self.target, self.phase, next);
        self.phase = next;
        Ok(())
    }
}

/// Driver for any target, dispatched by variant.
pub enum Driver {
    /// AppImage, either architecture.
    AppImage(AppImageDriver),
    /// Debian package.
    Debian(DebianDriver),
    /// RPM package.
    Rpm(RpmDriver),
    /// Windows NSIS installer.
    Nsis(NsisDriver),
    /// Source archive.
    Source(SourceDriver),
}

impl Driver {
    /// The driver that builds `target`.
    pub fn for_target(target: BuildTarget) -> Self {
        match target {
            BuildTarget::AppImageX86_64 | BuildTarget::AppImageAArch64 => {
                Driver::AppImage(AppImageDriver::new(target))
            }
            BuildTarget::Deb => Driver::Debian(DebianDriver::default()),
            BuildTarget::Rpm => Driver::Rpm(RpmDriver::default()),
            BuildTarget::WindowsNsis => Driver::Nsis(NsisDriver::default()),
            BuildTarget::SourceDevEnv => Driver::Source(SourceDriver::default()),
        }
    }
}

impl TargetDriver for Driver {
    fn target(&self) -> BuildTarget {
        match self {
            Driver::AppImage(d) => d.target(),
            Driver::Debian(d) => d.target(),
            Driver::Rpm(d) => d.target(),
            Driver::Nsis(d) => d.target(),
            Driver::Source(d) => d.target(),
        }
    }

    async fn stage(
        &mut self,
        ctx: &BuildContext,
        tree: &StagingTree,
        log: &mut BuildLog,
    ) -> Result<()> {
        match self {
            Driver::AppImage(d) => d.stage(ctx, tree, log).await,
            Driver::Debian(d) => d.stage(ctx, tree, log).await,
            Driver::Rpm(d) => d.stage(ctx, tree, log).await,
            Driver::Nsis(d) => d.stage(ctx, tree, log).await,
            Driver::Source(d) => d.stage(ctx, tree, log).await,
        }
    }

    async fn provision(
        &mut self,
        ctx: &BuildContext,
        tree: &StagingTree,
        provisioner: &Provisioner,
        log: &mut BuildLog,
    ) -> Result<()> {
        match self {
            Driver::AppImage(d) => d.provision(ctx, tree, provisioner, log).await,
            Driver::Debian(d) => d.provision(ctx, tree, provisioner, log).await,
            Driver::Rpm(d) => d.provision(ctx, tree, provisioner, log).await,
            Driver::Nsis(d) => d.provision(ctx, tree, provisioner, log).await,
            Driver::Source(d) => d.provision(ctx, tree, provisioner, log).await,
        }
    }

    async fn invoke(
        &mut self,
        ctx: &BuildContext,
        tree: &StagingTree,
        log: &mut BuildLog,
    ) -> Result<ProcessResult> {
        match self {
            Driver::AppImage(d) => d.invoke(ctx, tree, log).await,
            Driver::Debian(d) => d.invoke(ctx, tree, log).await,
            Driver::Rpm(d) => d.invoke(ctx, tree, log).await,
            Driver::Nsis(d) => d.invoke(ctx, tree, log).await,
            Driver::Source(d) => d.invoke(ctx, tree, log).await,
        }
    }

    fn fatal_patterns(&self) -> &'static [&'static str] {
        match self {
            Driver::AppImage(d) => d.fatal_patterns(),
            Driver::Debian(d) => d.fatal_patterns(),
            Driver::Rpm(d) => d.fatal_patterns(),
            Driver::Nsis(d) => d.fatal_patterns(),
            Driver::Source(d) => d.fatal_patterns(),
        }
    }
}
