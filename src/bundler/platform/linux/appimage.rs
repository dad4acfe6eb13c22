//! AppImage driver - portable Linux applications.
//!
//! Builds an AppDir around the payload and packs it with `appimagetool`,
//! which is downloaded on first use and unpacked so no FUSE is needed.
//!
//! # AppDir layout
//!
//! ```text
//! AppRun -> usr/bin/<pkg>
//! <pkg>.desktop
//! <pkg>.png
//! .DirIcon -> <pkg>.png
//! bundle-manifest.json
//! usr/bin/<pkg>                 launcher
//! usr/share/<pkg>/              payload (plus runtime/ when configured)
//! usr/share/icons/hicolor/256x256/apps/<pkg>.png
//! ```

use super::payload_from_bin;
use crate::bundler::{
    BuildContext, BuildTarget,
    build_log::BuildLog,
    error::{Error, Result},
    platform::TargetDriver,
    process::{ProcessResult, run_logged},
    provision::{ProvisionedTool, Provisioner, ToolBinary},
    settings::{Arch, Settings},
    staging::{
        ExcludeFilter, PayloadProfile, StagingTree, desktop, icon::AppIcon, launcher,
        payload_filter,
    },
    utils::fs,
};
use std::path::{Path, PathBuf};

/// Name of the portable bundle manifest at the AppDir root.
pub const BUNDLE_MANIFEST: &str = "bundle-manifest.json";

/// AppImage driver for one architecture.
#[derive(Debug)]
pub struct AppImageDriver {
    target: BuildTarget,
    app_dir: Option<PathBuf>,
    tool: Option<ProvisionedTool>,
}

impl AppImageDriver {
    /// Driver for an AppImage target.
    pub fn new(target: BuildTarget) -> Self {
        Self {
            target,
            app_dir: None,
            tool: None,
        }
    }

    fn arch(&self) -> Arch {
        self.target.arch()
    }

    fn artifact_name(&self, settings: &Settings) -> String {
        format!(
            "{}-{}-{}.AppImage",
            settings.product_name(),
            settings.version_string(),
            self.arch().appimage_name()
        )
    }
}

/// Portable bundle manifest: where everything lives inside the AppDir.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct BundleManifest {
    /// Product name.
    pub name: String,
    /// Version.
    pub version: String,
    /// Architecture the bundle is built for.
    pub arch: String,
    /// Payload profile.
    pub profile: PayloadProfile,
    /// Python entry point, relative to the AppDir.
    pub entry_point: String,
    /// Desktop entry, relative to the AppDir.
    pub desktop_file: String,
    /// Icon, relative to the AppDir.
    pub icon: String,
    /// Payload directory, relative to the AppDir.
    pub payload_dir: String,
    /// Whether a bundled Python runtime is included.
    pub bundled_runtime: bool,
    /// Build timestamp.
    pub built_at: String,
}

impl TargetDriver for AppImageDriver {
    fn target(&self) -> BuildTarget {
        self.target
    }

    async fn stage(
        &mut self,
        ctx: &BuildContext,
        tree: &StagingTree,
        log: &mut BuildLog,
    ) -> Result<()> {
        let settings = ctx.settings();
        let pkg = settings.package_name();
        let app_dir_name = format!("{}.AppDir", settings.product_name());
        let app_dir = tree.create_dir(&app_dir_name).await?;
        let payload_dir = format!("usr/share/{pkg}");
        let profile = self.target.spec().profile;

        log.section("staging AppDir").await?;
        let filter = payload_filter(ctx, profile)?;
        let stats = tree
            .copy_payload(ctx.source_dir(), Path::new(&app_dir_name).join(&payload_dir), &filter)
            .await?;
        log.line(&format!(
            "{} files, {} bytes ({:?} profile)",
            stats.files, stats.bytes, profile
        ))
        .await?;

        let mut bundled_runtime = false;
        if let Some(runtime) = &settings.bundle_settings().appimage.runtime_dir {
            let runtime = ctx.source_dir().join(runtime);
            if runtime.is_dir() {
                tree.copy_payload(
                    &runtime,
                    Path::new(&app_dir_name).join(&payload_dir).join("runtime"),
                    &ExcludeFilter::none(),
                )
                .await?;
                bundled_runtime = true;
                log.line(&format!("bundled runtime from {}", runtime.display()))
                    .await?;
            } else {
                return Err(Error::Staging(format!(
                    "configured runtime directory {} does not exist",
                    runtime.display()
                )));
            }
        }

        let script = launcher::posix_launcher(settings, &payload_from_bin(settings))?;
        fs::write_executable(&app_dir.join("usr/bin").join(pkg), script).await?;
        fs::symlink_file(&Path::new("usr/bin").join(pkg), &app_dir.join("AppRun")).await?;

        let desktop_name = desktop::desktop_file_name(settings);
        fs::write_file(
            &app_dir.join(&desktop_name),
            desktop::desktop_entry(settings, pkg, pkg),
        )
        .await?;

        let icon_name = format!("{pkg}.png");
        let png = AppIcon::load(settings)?.png()?;
        fs::write_file(&app_dir.join(&icon_name), &png).await?;
        fs::write_file(
            &app_dir
                .join("usr/share/icons/hicolor/256x256/apps")
                .join(&icon_name),
            &png,
        )
        .await?;
        fs::symlink_file(Path::new(&icon_name), &app_dir.join(".DirIcon")).await?;

        let manifest = BundleManifest {
            name: settings.product_name().to_string(),
            version: settings.version_string().to_string(),
            arch: self.arch().appimage_name().to_string(),
            profile,
            entry_point: format!("{payload_dir}/{}", settings.entry_point_str()),
            desktop_file: desktop_name,
            icon: icon_name,
            payload_dir,
            bundled_runtime,
            built_at: ctx.timestamp().to_string(),
        };
        fs::write_file(
            &app_dir.join(BUNDLE_MANIFEST),
            serde_json::to_vec_pretty(&manifest)?,
        )
        .await?;
        log.line("AppRun, desktop entry, icon and manifest written")
            .await?;

        self.app_dir = Some(app_dir);
        Ok(())
    }

    async fn provision(
        &mut self,
        ctx: &BuildContext,
        _tree: &StagingTree,
        provisioner: &Provisioner,
        log: &mut BuildLog,
    ) -> Result<()> {
        // appimagetool runs on the host; ARCH selects the embedded runtime.
        let tool = provisioner
            .provision(&ToolBinary::appimagetool(ctx.settings(), Arch::host()))
            .await?;
        log.line(&format!(
            "appimagetool: {}",
            tool.invocation.path().display()
        ))
        .await?;
        self.tool = Some(tool);
        Ok(())
    }

    async fn invoke(
        &mut self,
        ctx: &BuildContext,
        _tree: &StagingTree,
        log: &mut BuildLog,
    ) -> Result<ProcessResult> {
        let tool = self
            .tool
            .as_ref()
            .ok_or_else(|| Error::GenericError("appimagetool was not provisioned".into()))?;
        let app_dir = self
            .app_dir
            .as_ref()
            .ok_or_else(|| Error::GenericError("AppDir was not staged".into()))?;
        let output = ctx.output_dir().join(self.artifact_name(ctx.settings()));

        let mut cmd = tool.invocation.command();
        cmd.env("ARCH", self.arch().appimage_name())
            .env("VERSION", ctx.settings().version_string())
            .arg("--no-appstream")
            .arg(app_dir)
            .arg(&output);

        log.section("appimagetool").await?;
        run_logged(cmd, log).await
    }

    fn fatal_patterns(&self) -> &'static [&'static str] {
        &[r"^Error:", r"^ERROR:", r"(?i)desktop file .*(?:not found|invalid)"]
    }
}
