//! RPM package driver.
//!
//! Stages the install tree next to a private `_topdir`, generates a `.spec`
//! whose `%install` copies that tree into the buildroot, and runs
//! `rpmbuild -bb`. The binary RPM is written straight into the output
//! directory.

use super::{
    installed_paths, read_custom_script, stage_fhs_tree, venv_setup_body, venv_teardown_body,
};
use crate::bundler::{
    BuildContext, BuildTarget,
    build_log::BuildLog,
    error::{Error, Result},
    platform::TargetDriver,
    process::{ProcessResult, run_logged},
    settings::Settings,
    staging::StagingTree,
};
use handlebars::Handlebars;
use std::path::{Path, PathBuf};

const INSTALL_ROOT: &str = "root";
const TOPDIR: &str = "rpmbuild";

const SPEC_TEMPLATE: &str = r#"%global debug_package %{nil}
%global __brp_mangle_shebangs %{nil}
%global __brp_python_bytecompile %{nil}
%define _build_id_links none

Name:           {{name}}
Version:        {{version}}
Release:        {{release}}
Summary:        {{summary}}
License:        {{license}}
{{#if url}}URL:            {{url}}
{{/if}}BuildArch:      {{arch}}
AutoReqProv:    no
{{#each requires}}Requires:       {{this}}
{{/each}}
%description
{{description}}

%prep

%build

%install
rm -rf %{buildroot}
mkdir -p %{buildroot}
cp -a "{{install_root}}/." %{buildroot}/

%post
{{post}}

%preun
{{preun}}

%files
{{#each files}}{{this}}
{{/each}}"#;

/// RPM package driver.
#[derive(Debug, Default)]
pub struct RpmDriver {
    spec_path: Option<PathBuf>,
}

/// Escape `%` so rpm does not expand user text as macros.
fn escape_macros(text: &str) -> String {
    text.replace('%', "%%")
}

/// Render the `.spec` file.
pub fn spec_file(
    settings: &Settings,
    install_root: &Path,
    post: &str,
    preun: &str,
) -> Result<String> {
    let rpm = &settings.bundle_settings().rpm;
    let package = settings.package();
    let description = package
        .long_description
        .clone()
        .unwrap_or_else(|| settings.description().to_string());

    let data = serde_json::json!({
        "name": settings.package_name(),
        "version": settings.version_string().replace('-', "_"),
        "release": rpm.release,
        "summary": escape_macros(settings.description()),
        "license": package.license,
        "url": package.homepage,
        "arch": rpm.architecture,
        "requires": rpm.requires,
        "description": escape_macros(&description),
        "install_root": install_root.display().to_string(),
        "post": post.trim_end(),
        "preun": preun.trim_end(),
        "files": installed_paths(settings),
    });

    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    Ok(handlebars.render_template(SPEC_TEMPLATE, &data)?)
}

impl TargetDriver for RpmDriver {
    fn target(&self) -> BuildTarget {
        BuildTarget::Rpm
    }

    async fn stage(
        &mut self,
        ctx: &BuildContext,
        tree: &StagingTree,
        log: &mut BuildLog,
    ) -> Result<()> {
        let settings = ctx.settings();
        stage_fhs_tree(ctx, tree, Path::new(INSTALL_ROOT), log).await?;

        for dir in ["BUILD", "RPMS", "SOURCES", "SPECS", "SRPMS"] {
            tree.create_dir(Path::new(TOPDIR).join(dir)).await?;
        }

        let rpm = &settings.bundle_settings().rpm;
        let post = match &rpm.post_install_script {
            Some(path) => read_custom_script(ctx, path).await?,
            // $1 is 1 on install and 2 on upgrade.
            None => venv_setup_body(settings)?,
        };
        let preun = match &rpm.pre_remove_script {
            Some(path) => read_custom_script(ctx, path).await?,
            // $1 is 0 only on final removal.
            None => format!(
                "if [ \"$1\" -eq 0 ]; then\n{}\nfi",
                venv_teardown_body(settings)?
            ),
        };

        let spec = spec_file(settings, &tree.join(INSTALL_ROOT), &post, &preun)?;
        let spec_path = tree
            .write_file(
                Path::new(TOPDIR)
                    .join("SPECS")
                    .join(format!("{}.spec", settings.package_name())),
                spec,
            )
            .await?;
        log.line(&format!("spec written to {}", spec_path.display()))
            .await?;

        self.spec_path = Some(spec_path);
        Ok(())
    }

    async fn invoke(
        &mut self,
        ctx: &BuildContext,
        tree: &StagingTree,
        log: &mut BuildLog,
    ) -> Result<ProcessResult> {
        let spec_path = self
            .spec_path
            .clone()
            .ok_or_else(|| Error::GenericError("rpm spec was not staged".into()))?;

        let mut cmd = tokio::process::Command::new("rpmbuild");
        cmd.arg("-bb")
            .arg("--define")
            .arg(format!("_topdir {}", tree.join(TOPDIR).display()))
            .arg("--define")
            .arg(format!("_rpmdir {}", ctx.output_dir().display()))
            .arg("--define")
            .arg("_build_name_fmt %%{NAME}-%%{VERSION}-%%{RELEASE}.%%{ARCH}.rpm")
            .arg(&spec_path);

        log.section("rpmbuild").await?;
        run_logged(cmd, log).await
    }

    fn fatal_patterns(&self) -> &'static [&'static str] {
        &[
            r"^error: ",
            r"Installed \(but unpackaged\) file\(s\) found",
            r"^RPM build errors:",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::{PackageSettings, SettingsBuilder};

    fn settings() -> Settings {
        SettingsBuilder::new()
            .source_dir("/tmp/src")
            .package_settings(PackageSettings {
                version: "1.1".into(),
                ..Default::default()
            })
            .build()
            .unwrap()
    }

    #[test]
    fn spec_has_header_scriptlets_and_files() {
        let spec = spec_file(
            &settings(),
            Path::new("/scratch/staging/rpm-1/root"),
            "echo post",
            "echo preun",
        )
        .unwrap();

        for needle in [
            "Name:           stemweaver\n",
            "Version:        1.1\n",
            "Release:        1\n",
            "License:        CC-BY-4.0\n",
            "URL:            https://github.com/mangoban/StemWeaver\n",
            "BuildArch:      noarch\n",
            "Requires:       python3 >= 3.8\n",
            "%post\necho post\n",
            "%preun\necho preun\n",
            "cp -a \"/scratch/staging/rpm-1/root/.\" %{buildroot}/",
            "%files\n/usr/bin/stemweaver\n/usr/share/stemweaver\n",
        ] {
            assert!(spec.contains(needle), "missing {needle:?} in\n{spec}");
        }
    }

    #[test]
    fn user_text_cannot_expand_macros() {
        assert_eq!(escape_macros("100% pure"), "100%% pure");
    }
}
