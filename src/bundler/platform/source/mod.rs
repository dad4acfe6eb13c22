//! Source archive with a developer environment bootstrap.
//!
//! The staged tree is the complete payload plus `setup_dev_env.sh` and a
//! `BUILD_INFO` stamp. `python3 -m compileall` acts as a syntax gate before
//! the tree is packed into `<pkg>-<version>-src.tar.gz`.

use crate::bundler::{
    BuildContext, BuildTarget,
    build_log::BuildLog,
    error::{Error, ErrorExt, Result},
    platform::TargetDriver,
    process::{ProcessResult, run_logged},
    settings::Settings,
    staging::{StagingTree, payload_filter},
};
use flate2::{Compression, write::GzEncoder};
use std::path::{Path, PathBuf};

/// Bytecode goes here instead of `__pycache__` inside the payload.
const PYCACHE_DIR: &str = "pycache";

const SETUP_SCRIPT: &str = r#"#!/bin/sh
# Creates a private virtualenv next to this script and installs the
# application's Python dependencies into it.
set -e

HERE="$(cd "$(dirname "$0")" && pwd)"
PYTHON="${PYTHON:-python3}"

"$PYTHON" - <<'EOF'
import sys
if sys.version_info < ({{min_major}}, {{min_minor}}):
    sys.exit("Python {{min_python}} or newer is required, found %d.%d" % sys.version_info[:2])
EOF

"$PYTHON" -m venv "$HERE/venv"
"$HERE/venv/bin/python" -m pip install --upgrade pip
if [ -f "$HERE/{{requirements}}" ]; then
    "$HERE/venv/bin/python" -m pip install -r "$HERE/{{requirements}}"
fi

echo
echo "Development environment ready. Start {{product_name}} with:"
echo "  $HERE/venv/bin/python $HERE/{{entry_point}}"
"#;

/// Source archive driver.
#[derive(Debug, Default)]
pub struct SourceDriver {
    top_dir: Option<String>,
}

impl SourceDriver {
    fn top_dir_name(settings: &Settings) -> String {
        format!("{}-{}", settings.package_name(), settings.version_string())
    }

    fn artifact_name(settings: &Settings) -> String {
        format!("{}-src.tar.gz", Self::top_dir_name(settings))
    }
}

/// Render `setup_dev_env.sh`.
pub fn setup_script(settings: &Settings) -> Result<String> {
    let bundle = settings.bundle_settings();
    let (major, minor) = bundle
        .min_python
        .split_once('.')
        .unwrap_or((bundle.min_python.as_str(), "0"));

    let mut data = std::collections::BTreeMap::new();
    data.insert("min_major", major.trim().to_string());
    data.insert("min_minor", minor.trim().to_string());
    data.insert("min_python", bundle.min_python.clone());
    data.insert(
        "requirements",
        bundle.requirements.to_string_lossy().replace('\\', "/"),
    );
    data.insert("product_name", settings.product_name().to_string());
    data.insert("entry_point", settings.entry_point_str());

    let mut handlebars = handlebars::Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    Ok(handlebars.render_template(SETUP_SCRIPT, &data)?)
}

/// `BUILD_INFO` contents.
pub fn build_info(settings: &Settings, timestamp: &str, revision: Option<&str>) -> String {
    format!(
        "name={}\nversion={}\nbuilt={}\nrevision={}\n",
        settings.product_name(),
        settings.version_string(),
        timestamp,
        revision.unwrap_or("unknown")
    )
}

/// Short git revision of the source tree, if it is a checkout.
async fn git_revision(source: &Path) -> Option<String> {
    if !crate::bundler::probe::command_exists("git") {
        return None;
    }
    let output = tokio::process::Command::new("git")
        .arg("-C")
        .arg(source)
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        log::debug!("{} is not a git checkout", source.display());
        return None;
    }
    let rev = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!rev.is_empty()).then_some(rev)
}

fn write_tarball(staged: &Path, top_dir: &str, archive: &Path) -> Result<()> {
    let file = std::fs::File::create(archive).fs_context("creating source archive", archive)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);
    builder
        .append_dir_all(top_dir, staged)
        .fs_context("archiving staged sources", staged)?;
    let encoder = builder
        .into_inner()
        .fs_context("finishing source archive", archive)?;
    encoder
        .finish()
        .fs_context("compressing source archive", archive)?;
    Ok(())
}

impl TargetDriver for SourceDriver {
    fn target(&self) -> BuildTarget {
        BuildTarget::SourceDevEnv
    }

    async fn stage(
        &mut self,
        ctx: &BuildContext,
        tree: &StagingTree,
        log: &mut BuildLog,
    ) -> Result<()> {
        let settings = ctx.settings();
        let top_dir = Self::top_dir_name(settings);
        let profile = self.target().spec().profile;

        log.section("staging sources").await?;
        let filter = payload_filter(ctx, profile)?;
        let stats = tree.copy_payload(ctx.source_dir(), &top_dir, &filter).await?;
        log.line(&format!("{} files, {} bytes", stats.files, stats.bytes))
            .await?;

        tree.write_executable(
            Path::new(&top_dir).join("setup_dev_env.sh"),
            setup_script(settings)?,
        )
        .await?;

        let revision = git_revision(ctx.source_dir()).await;
        log.line(&format!(
            "revision: {}",
            revision.as_deref().unwrap_or("unknown")
        ))
        .await?;
        tree.write_file(
            Path::new(&top_dir).join("BUILD_INFO"),
            build_info(settings, ctx.timestamp(), revision.as_deref()),
        )
        .await?;

        self.top_dir = Some(top_dir);
        Ok(())
    }

    async fn invoke(
        &mut self,
        ctx: &BuildContext,
        tree: &StagingTree,
        log: &mut BuildLog,
    ) -> Result<ProcessResult> {
        let top_dir = self
            .top_dir
            .clone()
            .ok_or_else(|| Error::GenericError("sources were not staged".into()))?;
        let staged = tree.join(&top_dir);

        let mut cmd = tokio::process::Command::new("python3");
        cmd.args(["-m", "compileall", "-q"])
            .arg(&staged)
            .env("PYTHONPYCACHEPREFIX", tree.join(PYCACHE_DIR));
        log.section("syntax check").await?;
        let result = run_logged(cmd, log).await?;
        result.check(self.fatal_patterns())?;

        let archive: PathBuf = ctx.output_dir().join(Self::artifact_name(ctx.settings()));
        log.section("archive").await?;
        log.line(&format!("writing {}", archive.display())).await?;
        let task_archive = archive.clone();
        tokio::task::spawn_blocking(move || write_tarball(&staged, &top_dir, &task_archive))
            .await
            .map_err(|e| Error::GenericError(format!("archive task panicked: {e}")))??;

        Ok(result)
    }

    fn fatal_patterns(&self) -> &'static [&'static str] {
        &[r"^\*\*\* Error compiling", r"SyntaxError"]
    }
}
