//! Windows NSIS installer creation.
//!
//! Cross-builds a Windows installer on Linux with the system `makensis`.
//! The payload ships with a `.bat` launcher, an `.ico` and, unless disabled,
//! the Windows embeddable Python distribution as `runtime\`.
//!
//! # Module Organization
//!
//! - `template` - NSI script template constant
//! - `script` - NSI script generation from templates
//! - `runtime` - embedded Python runtime staging
//! - `build` - makensis execution
//! - `utils` - Helper functions (install modes, version formatting, etc.)

mod build;
mod runtime;
mod script;
mod template;
mod utils;

use crate::bundler::{
    BuildContext, BuildTarget,
    build_log::BuildLog,
    error::{Error, Result},
    platform::TargetDriver,
    process::ProcessResult,
    provision::{Provisioner, ToolBinary},
    settings::Settings,
    staging::{StagingTree, icon::AppIcon, launcher, payload_filter},
};
use std::path::{Path, PathBuf};

pub use script::{ScriptInputs, render_nsi_script};

const APP_DIR: &str = "app";

/// NSIS installer driver.
#[derive(Debug, Default)]
pub struct NsisDriver {
    nsi_path: Option<PathBuf>,
}

impl NsisDriver {
    fn artifact_name(settings: &Settings) -> String {
        format!(
            "{}_{}_{}-setup.exe",
            settings.product_name(),
            settings.version_string(),
            BuildTarget::WindowsNsis.arch().nsis_name()
        )
    }

    fn launcher_name(settings: &Settings) -> String {
        format!("{}.bat", settings.product_name())
    }

    fn icon_name(settings: &Settings) -> String {
        format!("{}.ico", settings.package_name())
    }
}

impl TargetDriver for NsisDriver {
    fn target(&self) -> BuildTarget {
        BuildTarget::WindowsNsis
    }

    async fn stage(
        &mut self,
        ctx: &BuildContext,
        tree: &StagingTree,
        log: &mut BuildLog,
    ) -> Result<()> {
        let settings = ctx.settings();
        let profile = self.target().spec().profile;

        log.section("staging installer payload").await?;
        let filter = payload_filter(ctx, profile)?;
        let stats = tree
            .copy_payload(ctx.source_dir(), APP_DIR, &filter)
            .await?;
        log.line(&format!(
            "{} files, {} bytes ({:?} profile)",
            stats.files, stats.bytes, profile
        ))
        .await?;

        tree.write_file(
            Path::new(APP_DIR).join(Self::launcher_name(settings)),
            launcher::windows_launcher(settings)?,
        )
        .await?;
        tree.write_file(
            Path::new(APP_DIR).join(Self::icon_name(settings)),
            AppIcon::load(settings)?.ico()?,
        )
        .await?;
        log.line("launcher and icon written").await?;
        Ok(())
    }

    async fn provision(
        &mut self,
        ctx: &BuildContext,
        tree: &StagingTree,
        provisioner: &Provisioner,
        log: &mut BuildLog,
    ) -> Result<()> {
        let settings = ctx.settings();
        if settings.bundle_settings().windows.nsis.embed_python {
            let tool = provisioner
                .provision(&ToolBinary::python_embed(settings))
                .await?;
            let stats = runtime::stage_runtime(&tool, tree, &Path::new(APP_DIR).join("runtime"))
                .await
                .map_err(|e| Error::Provision {
                    tool: tool.name.clone(),
                    reason: e.to_string(),
                })?;
            log.line(&format!("embedded Python runtime: {} files", stats.files))
                .await?;
        } else {
            log.line("embedded Python runtime disabled; the launcher uses the system Python")
                .await?;
        }

        let output = ctx.output_dir().join(Self::artifact_name(settings));
        let app_dir = tree.join(APP_DIR);
        let launcher = Self::launcher_name(settings);
        let icon = Self::icon_name(settings);
        let inputs = ScriptInputs {
            app_dir: &app_dir,
            launcher: &launcher,
            icon_name: &icon,
            output_file: &output,
        };
        let nsi_path = script::generate_nsi_script(settings, &inputs, tree.root()).await?;
        log.line(&format!("script written to {}", nsi_path.display()))
            .await?;
        self.nsi_path = Some(nsi_path);
        Ok(())
    }

    async fn invoke(
        &mut self,
        ctx: &BuildContext,
        _tree: &StagingTree,
        log: &mut BuildLog,
    ) -> Result<ProcessResult> {
        let nsi_path = self
            .nsi_path
            .clone()
            .ok_or_else(|| Error::GenericError("installer script was not generated".into()))?;
        let output = ctx.output_dir().join(Self::artifact_name(ctx.settings()));
        build::run_makensis(&nsi_path, &output, log).await
    }

    fn fatal_patterns(&self) -> &'static [&'static str] {
        &[r"^Error ", r"^Error:", r"^!include: could not find"]
    }
}
