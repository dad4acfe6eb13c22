//! Debian package (.deb) driver.
//!
//! Builds the package tree with a `DEBIAN/` control directory and runs
//! `dpkg-deb --build --root-owner-group`, under `fakeroot` when it is
//! installed.

use super::{
    installed_size_kib, read_custom_script, stage_fhs_tree, venv_setup_body, venv_teardown_body,
};
use crate::bundler::{
    BuildContext, BuildTarget,
    build_log::BuildLog,
    error::Result,
    platform::TargetDriver,
    probe::command_exists,
    process::{ProcessResult, run_logged},
    settings::Settings,
    staging::StagingTree,
};
use std::{fmt::Write as _, path::PathBuf};

const PACKAGE_ROOT: &str = "package";

/// Debian package driver.
#[derive(Debug, Default)]
pub struct DebianDriver {
    package_root: Option<PathBuf>,
}

impl DebianDriver {
    fn artifact_name(settings: &Settings) -> String {
        format!(
            "{}_{}_{}.deb",
            settings.package_name(),
            settings.version_string(),
            settings.bundle_settings().deb.architecture
        )
    }
}

/// Render `DEBIAN/control`.
pub fn control_file(settings: &Settings, installed_size_kib: u64) -> String {
    let deb = &settings.bundle_settings().deb;
    let package = settings.package();
    let mut control = String::new();

    let _ = writeln!(control, "Package: {}", settings.package_name());
    let _ = writeln!(control, "Version: {}", settings.version_string());
    let _ = writeln!(control, "Architecture: {}", deb.architecture);
    let _ = writeln!(control, "Maintainer: {}", package.maintainer);
    let _ = writeln!(control, "Installed-Size: {installed_size_kib}");
    if !deb.depends.is_empty() {
        let _ = writeln!(control, "Depends: {}", deb.depends.join(", "));
    }
    if !deb.recommends.is_empty() {
        let _ = writeln!(control, "Recommends: {}", deb.recommends.join(", "));
    }
    let _ = writeln!(control, "Section: {}", deb.section);
    let _ = writeln!(control, "Priority: {}", deb.priority);
    if let Some(homepage) = &package.homepage {
        let _ = writeln!(control, "Homepage: {homepage}");
    }

    let _ = writeln!(control, "Description: {}", settings.description());
    if let Some(long) = &package.long_description {
        for line in long.lines() {
            let line = line.trim();
            if line.is_empty() {
                control.push_str(" .\n");
            } else {
                let _ = writeln!(control, " {line}");
            }
        }
    }
    control
}

fn postinst(body: &str) -> String {
    format!(
        "#!/bin/sh\nset -e\n\ncase \"$1\" in\n    configure)\n{}\n        ;;\nesac\n\nexit 0\n",
        indent(body, 8)
    )
}

fn prerm(body: &str) -> String {
    format!(
        "#!/bin/sh\nset -e\n\ncase \"$1\" in\n    remove|purge)\n{}\n        ;;\nesac\n\nexit 0\n",
        indent(body, 8)
    )
}

fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .map(|l| {
            if l.is_empty() {
                String::new()
            } else {
                format!("{pad}{l}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl TargetDriver for DebianDriver {
    fn target(&self) -> BuildTarget {
        BuildTarget::Deb
    }

    async fn stage(
        &mut self,
        ctx: &BuildContext,
        tree: &StagingTree,
        log: &mut BuildLog,
    ) -> Result<()> {
        let settings = ctx.settings();
        let root = PathBuf::from(PACKAGE_ROOT);
        stage_fhs_tree(ctx, tree, &root, log).await?;

        let size = installed_size_kib(&tree.join(&root))?;
        tree.write_file(root.join("DEBIAN/control"), control_file(settings, size))
            .await?;

        let deb = &settings.bundle_settings().deb;
        let post = match &deb.post_install_script {
            Some(path) => read_custom_script(ctx, path).await?,
            None => postinst(&venv_setup_body(settings)?),
        };
        let pre = match &deb.pre_remove_script {
            Some(path) => read_custom_script(ctx, path).await?,
            None => prerm(&venv_teardown_body(settings)?),
        };
        tree.write_executable(root.join("DEBIAN/postinst"), post).await?;
        tree.write_executable(root.join("DEBIAN/prerm"), pre).await?;
        log.line(&format!("control file written (Installed-Size: {size} KiB)"))
            .await?;

        self.package_root = Some(tree.join(&root));
        Ok(())
    }

    async fn invoke(
        &mut self,
        ctx: &BuildContext,
        tree: &StagingTree,
        log: &mut BuildLog,
    ) -> Result<ProcessResult> {
        let package_root = self
            .package_root
            .clone()
            .unwrap_or_else(|| tree.join(PACKAGE_ROOT));
        let output = ctx.output_dir().join(Self::artifact_name(ctx.settings()));

        let mut cmd = if command_exists("fakeroot") {
            let mut cmd = tokio::process::Command::new("fakeroot");
            cmd.arg("dpkg-deb");
            cmd
        } else {
            log::debug!("fakeroot not found; relying on --root-owner-group");
            tokio::process::Command::new("dpkg-deb")
        };
        cmd.args(["--build", "--root-owner-group"])
            .arg(&package_root)
            .arg(&output);

        log.section("dpkg-deb").await?;
        run_logged(cmd, log).await
    }

    fn fatal_patterns(&self) -> &'static [&'static str] {
        &[r"dpkg-deb: error"]
    }
}
