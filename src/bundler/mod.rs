//! Multi-target package builds for the StemWeaver application.
//!
//! One source tree goes in; AppImages, Debian and RPM packages, a Windows
//! installer and a source archive come out. Every target runs through the
//! same pipeline:
//!
//! ```text
//! probe tools → stage tree → provision tools → invoke packager → verify → report
//! ```
//!
//! # Example
//!
//! ```no_run
//! use stemweaver_bundler::bundler::{
//!     BuildContext, BuildRequest, BuildTarget, Bundler, DriverJobRunner, Provisioner,
//!     SettingsBuilder, WorkspaceResolver,
//! };
//!
//! # async fn example() -> stemweaver_bundler::bundler::Result<()> {
//! let settings = SettingsBuilder::new().source_dir("/src/StemWeaver").build()?;
//! let workspace = WorkspaceResolver::new(settings.preferred_workspace()).resolve()?;
//! workspace.create_layout()?;
//!
//! let ctx = BuildContext::new(settings, workspace);
//! let request = BuildRequest::new([BuildTarget::AppImageX86_64, BuildTarget::Deb], &ctx);
//! let mut runner = DriverJobRunner::new(Provisioner::new(ctx.tools_dir()));
//! let summary = Bundler::new(&ctx).run(&request, &mut runner).await;
//! print!("{}", summary.render_plain());
//! # Ok(())
//! # }
//! ```

pub mod build_log;
pub mod builder;
pub mod context;
pub mod error;
pub mod platform;
pub mod probe;
pub mod process;
pub mod provision;
pub mod report;
pub mod request;
pub mod settings;
pub mod staging;
pub mod target;
pub mod utils;
pub mod workspace;

use std::path::PathBuf;

pub use build_log::BuildLog;
pub use builder::{Bundler, DriverJobRunner, JobRunner, execute_job};
pub use context::BuildContext;
pub use error::{Context, Error, ErrorExt, FailureKind, Result};
pub use platform::{Driver, DriverPhase, TargetDriver};
pub use provision::Provisioner;
pub use report::Summary;
pub use request::{BuildJob, BuildRequest, JobFailure, JobStatus};
pub use settings::{
    AppImageSettings, Arch, BundleSettings, DebianSettings, NSISInstallerMode, NsisCompression,
    NsisSettings, PackageSettings, RpmSettings, Settings, SettingsBuilder, WindowsSettings,
};
pub use staging::{PayloadProfile, StagingTree};
pub use target::{BuildTarget, TargetSpec};
pub use workspace::{Workspace, WorkspaceResolver};

/// A verified build output.
#[derive(Clone, Debug, serde::Serialize)]
pub struct BuildArtifact {
    /// Target that produced it.
    pub target: BuildTarget,
    /// Location inside the output directory.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Lowercase hex SHA-256.
    pub checksum: String,
}
