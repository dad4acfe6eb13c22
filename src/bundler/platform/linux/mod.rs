//! Linux package drivers and the filesystem layout they share.
//!
//! Debian and RPM packages install the same tree:
//!
//! ```text
//! usr/bin/<pkg>                                  launcher
//! usr/share/<pkg>/                               payload
//! usr/share/applications/<pkg>.desktop
//! usr/share/icons/hicolor/256x256/apps/<pkg>.png
//! usr/share/pixmaps/<pkg>.png
//! ```

pub mod appimage;
pub mod debian;
pub mod rpm;

use crate::bundler::{
    BuildContext,
    build_log::BuildLog,
    error::{ErrorExt, Result},
    settings::Settings,
    staging::{
        PayloadStats, StagingTree, desktop, icon::AppIcon, launcher, payload_filter,
    },
};
use handlebars::Handlebars;
use std::path::{Path, PathBuf};

/// Relative location of the payload as seen from `usr/bin`.
pub(crate) fn payload_from_bin(settings: &Settings) -> String {
    format!("../share/{}", settings.package_name())
}

/// Lay out the shared FHS tree under `root` (relative to the staging tree).
///
/// Returns the payload statistics.
pub(crate) async fn stage_fhs_tree(
    ctx: &BuildContext,
    tree: &StagingTree,
    root: &Path,
    log: &mut BuildLog,
) -> Result<PayloadStats> {
    let settings = ctx.settings();
    let pkg = settings.package_name();
    let profile = tree.target().spec().profile;

    log.section("staging payload").await?;
    let filter = payload_filter(ctx, profile)?;
    let stats = tree
        .copy_payload(ctx.source_dir(), root.join("usr/share").join(pkg), &filter)
        .await?;
    log.line(&format!(
        "{} files, {} bytes ({:?} profile)",
        stats.files, stats.bytes, profile
    ))
    .await?;

    let script = launcher::posix_launcher(settings, &payload_from_bin(settings))?;
    tree.write_executable(root.join("usr/bin").join(pkg), script)
        .await?;

    let entry = desktop::desktop_entry(settings, &format!("/usr/bin/{pkg}"), pkg);
    tree.write_file(
        root.join("usr/share/applications")
            .join(desktop::desktop_file_name(settings)),
        entry,
    )
    .await?;

    let png = AppIcon::load(settings)?.png()?;
    tree.write_file(
        root.join("usr/share/icons/hicolor/256x256/apps")
            .join(format!("{pkg}.png")),
        &png,
    )
    .await?;
    tree.write_file(root.join("usr/share/pixmaps").join(format!("{pkg}.png")), &png)
        .await?;

    log.line("launcher, desktop entry and icon written").await?;
    Ok(stats)
}

/// Paths (absolute, as installed) that a package owns.
pub(crate) fn installed_paths(settings: &Settings) -> Vec<String> {
    let pkg = settings.package_name();
    vec![
        format!("/usr/bin/{pkg}"),
        format!("/usr/share/{pkg}"),
        format!("/usr/share/applications/{}", desktop::desktop_file_name(settings)),
        format!("/usr/share/icons/hicolor/256x256/apps/{pkg}.png"),
        format!("/usr/share/pixmaps/{pkg}.png"),
    ]
}

const VENV_SETUP: &str = r#"APP_DIR="/usr/share/{{package_name}}"
if command -v python3 >/dev/null 2>&1; then
    if python3 -m venv "$APP_DIR/venv"; then
        if [ -f "$APP_DIR/{{requirements}}" ]; then
            "$APP_DIR/venv/bin/pip" install --quiet --disable-pip-version-check -r "$APP_DIR/{{requirements}}" \
                || echo "{{package_name}}: some Python dependencies failed to install; run the launcher from a terminal for details" >&2
        fi
    else
        echo "{{package_name}}: could not create $APP_DIR/venv; the system python3 will be used" >&2
    fi
fi
if command -v update-desktop-database >/dev/null 2>&1; then
    update-desktop-database -q /usr/share/applications || true
fi
if command -v gtk-update-icon-cache >/dev/null 2>&1; then
    gtk-update-icon-cache -q -t /usr/share/icons/hicolor || true
fi"#;

const VENV_TEARDOWN: &str = r#"APP_DIR="/usr/share/{{package_name}}"
rm -rf "$APP_DIR/venv"
find "$APP_DIR" -type d -name __pycache__ -prune -exec rm -rf {} + 2>/dev/null || true"#;

fn render_hook(template: &str, settings: &Settings) -> Result<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    let data = serde_json::json!({
        "package_name": settings.package_name(),
        "requirements": settings
            .bundle_settings()
            .requirements
            .to_string_lossy()
            .replace('\\', "/"),
    });
    Ok(handlebars.render_template(template, &data)?)
}

/// Shell commands that create the private virtualenv after install.
pub(crate) fn venv_setup_body(settings: &Settings) -> Result<String> {
    render_hook(VENV_SETUP, settings)
}

/// Shell commands that remove the private virtualenv before removal.
pub(crate) fn venv_teardown_body(settings: &Settings) -> Result<String> {
    render_hook(VENV_TEARDOWN, settings)
}

/// Read a user-supplied maintainer script, resolved against the source tree.
pub(crate) async fn read_custom_script(ctx: &BuildContext, path: &Path) -> Result<String> {
    let path: PathBuf = if path.is_absolute() {
        path.to_path_buf()
    } else {
        ctx.source_dir().join(path)
    };
    tokio::fs::read_to_string(&path)
        .await
        .fs_context("reading maintainer script", &path)
}

/// Total size of regular files below `dir`, in KiB (rounded up).
pub(crate) fn installed_size_kib(dir: &Path) -> Result<u64> {
    let mut bytes = 0u64;
    for entry in walkdir::WalkDir::new(dir) {
        let entry = entry?;
        if entry.file_type().is_file() {
            bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
        }
    }
    Ok(bytes.div_ceil(1024))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::SettingsBuilder;

    #[test]
    fn hooks_reference_the_install_prefix() {
        let settings = SettingsBuilder::new().source_dir("/tmp/src").build().unwrap();
        let setup = venv_setup_body(&settings).unwrap();
        assert!(setup.contains(r#"APP_DIR="/usr/share/stemweaver""#));
        assert!(setup.contains("python3 -m venv"));
        assert!(setup.contains("requirements.txt"));

        let teardown = venv_teardown_body(&settings).unwrap();
        assert!(teardown.contains(r#"rm -rf "$APP_DIR/venv""#));
    }

    #[test]
    fn installed_size_rounds_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), vec![0u8; 1500]).unwrap();
        assert_eq!(installed_size_kib(dir.path()).unwrap(), 2);
    }
}
