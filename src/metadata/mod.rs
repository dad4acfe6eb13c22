//! `bundle.toml` loading.
//!
//! The file is optional: every table has defaults describing StemWeaver, so
//! a source tree without one still builds. Values are folded into a
//! [`Settings`] through [`SettingsBuilder`].

use crate::bundler::{
    AppImageSettings, BuildTarget, BundleSettings, DebianSettings, NsisSettings,
    PackageSettings, RpmSettings, Settings, SettingsBuilder, WindowsSettings,
};
use crate::error::{BundlerError, CliError, Result};
use regex::Regex;
use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

/// Default configuration file name inside the source tree.
pub const CONFIG_FILE: &str = "bundle.toml";

/// Parsed `bundle.toml`.
///
/// ```toml
/// [app]
/// version = "1.1"
///
/// [bundle]
/// entry_point = "gui_data/gui_modern_extractor.py"
///
/// [deb]
/// depends = ["python3 (>= 3.8)", "ffmpeg"]
///
/// [workspace]
/// preferred = "/var/cache/stemweaver-build"
///
/// [dispatch]
/// all = ["appimage-x86_64", "deb", "rpm"]
/// ```
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundleManifest {
    /// `[app]`
    pub app: PackageSettings,
    /// `[bundle]`
    pub bundle: BundleSettings,
    /// `[deb]`
    pub deb: DebianSettings,
    /// `[rpm]`
    pub rpm: RpmSettings,
    /// `[appimage]`
    pub appimage: AppImageSettings,
    /// `[nsis]`
    pub nsis: NsisSettings,
    /// `[workspace]`
    pub workspace: WorkspaceSection,
    /// `[dispatch]`
    pub dispatch: DispatchSection,
}

/// `[workspace]` table.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct WorkspaceSection {
    /// First scratch directory candidate.
    pub preferred: Option<PathBuf>,
    /// Tool cache directory.
    pub tools_dir: Option<PathBuf>,
}

/// `[dispatch]` table.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct DispatchSection {
    /// Targets behind menu entry `5`.
    pub all: Option<Vec<BuildTarget>>,
}

impl BundleManifest {
    /// Parse manifest text.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read `path`, or return defaults when it does not exist and was not
    /// asked for explicitly.
    pub fn load(path: &Path, explicit: bool) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                log::debug!("Loading configuration from {}", path.display());
                Self::parse(&text)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => {
                log::debug!("No {} found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(BundlerError::Cli(CliError::ExecutionFailed {
                command: "read_config".to_string(),
                reason: format!("Failed to read {}: {}", path.display(), e),
            })),
        }
    }
}

static VERSION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bv(\d+\.\d+(?:\.\d+)?)\b").expect("static version regex"));

/// Header lines scanned for a version marker.
const HEADER_LINES: usize = 20;

/// Version taken from a `vX.Y[.Z]` marker in the first lines of `text`.
pub fn version_from_header(text: &str) -> Option<String> {
    text.lines()
        .take(HEADER_LINES)
        .find_map(|line| VERSION_MARKER.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Build [`Settings`] for `source`.
///
/// `config` defaults to `<source>/bundle.toml` and may be absent; an explicit
/// `config` must exist. `output` defaults to `<source>/dist`.
pub fn load_settings(
    source: &Path,
    config: Option<&Path>,
    output: Option<&Path>,
) -> Result<Settings> {
    if !source.is_dir() {
        return Err(BundlerError::Cli(CliError::InvalidArguments {
            reason: format!("source directory {} does not exist", source.display()),
        }));
    }

    let config_path = config
        .map(Path::to_path_buf)
        .unwrap_or_else(|| source.join(CONFIG_FILE));
    let manifest = BundleManifest::load(&config_path, config.is_some())?;
    settings_from_manifest(manifest, source, output)
}

/// Fold a parsed manifest into [`Settings`].
pub fn settings_from_manifest(
    manifest: BundleManifest,
    source: &Path,
    output: Option<&Path>,
) -> Result<Settings> {
    let BundleManifest {
        mut app,
        mut bundle,
        deb,
        rpm,
        appimage,
        nsis,
        workspace,
        dispatch,
    } = manifest;

    bundle.deb = deb;
    bundle.rpm = rpm;
    bundle.appimage = appimage;
    bundle.windows = WindowsSettings { nsis };

    if app.version.trim().is_empty() {
        let entry = source.join(&bundle.entry_point);
        match std::fs::read_to_string(&entry) {
            Ok(text) => match version_from_header(&text) {
                Some(version) => {
                    log::debug!("Version {} read from {}", version, entry.display());
                    app.version = version;
                }
                None => log::warn!(
                    "No version marker in {}; using 0.0.0",
                    entry.display()
                ),
            },
            Err(e) => log::warn!(
                "Cannot read entry point {}: {}; using version 0.0.0",
                entry.display(),
                e
            ),
        }
    }

    let mut builder = SettingsBuilder::new()
        .source_dir(source)
        .package_settings(app)
        .bundle_settings(bundle);
    if let Some(output) = output {
        builder = builder.output_dir(output);
    }
    if let Some(preferred) = workspace.preferred {
        builder = builder.preferred_workspace(preferred);
    }
    if let Some(tools_dir) = workspace.tools_dir {
        builder = builder.tools_dir(tools_dir);
    }
    if let Some(all) = dispatch.all {
        builder = builder.dispatch_all(all);
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_marker_comes_from_the_docstring() {
        let header = "#!/usr/bin/env python3\n\"\"\"\nStemWeaver v1.1 - Professional Audio Stem Separation Tool\n\"\"\"\n";
        assert_eq!(version_from_header(header).as_deref(), Some("1.1"));
        assert_eq!(version_from_header("import os\n"), None);
    }

    #[test]
    fn missing_version_falls_back_to_entry_point_then_zero() {
        let dir = tempfile::tempdir().unwrap();
        let settings =
            settings_from_manifest(BundleManifest::default(), dir.path(), None).unwrap();
        assert_eq!(settings.version_string(), "0.0.0");

        std::fs::create_dir_all(dir.path().join("gui_data")).unwrap();
        std::fs::write(
            dir.path().join("gui_data/gui_modern_extractor.py"),
            "\"\"\"\nStemWeaver v1.1 - tool\n\"\"\"\n",
        )
        .unwrap();
        let settings =
            settings_from_manifest(BundleManifest::default(), dir.path(), None).unwrap();
        assert_eq!(settings.version_string(), "1.1");
        assert!(settings.output_dir().ends_with("dist"));
    }

    #[test]
    fn format_tables_land_in_bundle_settings() {
        let manifest = BundleManifest::parse(
            r#"
            [app]
            version = "2.0"

            [rpm]
            release = "3"

            [nsis]
            embed_python = false
            install_mode = "perMachine"

            [dispatch]
            all = ["appimage-x86_64", "rpm"]
            "#,
        )
        .unwrap();
        let settings = settings_from_manifest(manifest, Path::new("/src"), None).unwrap();

        assert_eq!(settings.version_string(), "2.0");
        assert_eq!(settings.bundle_settings().rpm.release, "3");
        assert!(!settings.bundle_settings().windows.nsis.embed_python);
        assert_eq!(
            settings.dispatch_all(),
            &[BuildTarget::AppImageX86_64, BuildTarget::Rpm]
        );
        // Untouched tables keep their defaults.
        assert_eq!(settings.bundle_settings().deb.architecture, "all");
    }

    #[test]
    fn unknown_tables_are_rejected() {
        assert!(BundleManifest::parse("[package]\nname = \"x\"\n").is_err());
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_settings(dir.path(), Some(&missing), None).is_err());
        assert!(load_settings(dir.path(), None, None).is_ok());
    }
}
