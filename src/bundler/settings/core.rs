//! Core Settings struct and implementations.

use super::{BundleSettings, PackageSettings};
use crate::bundler::BuildTarget;
use std::path::{Path, PathBuf};

/// Main settings for bundler operations.
///
/// Constructed via [`SettingsBuilder`](super::SettingsBuilder), usually from
/// `bundle.toml` by [`crate::metadata::load_settings`].
#[derive(Clone, Debug)]
pub struct Settings {
    /// Package metadata.
    package: PackageSettings,

    /// Bundle configuration.
    bundle_settings: BundleSettings,

    /// Application source tree.
    source_dir: PathBuf,

    /// Where finished artifacts are written.
    output_dir: PathBuf,

    /// First workspace candidate tried by the resolver.
    preferred_workspace: PathBuf,

    /// Explicit tool cache location.
    tools_dir: Option<PathBuf>,

    /// Targets selected by the "all Linux targets" menu entry.
    dispatch_all: Vec<BuildTarget>,
}

impl Settings {
    /// Returns the product name.
    pub fn product_name(&self) -> &str {
        &self.package.product_name
    }

    /// Returns the lowercase package identifier.
    pub fn package_name(&self) -> &str {
        &self.package.package_name
    }

    /// Returns the version string.
    pub fn version_string(&self) -> &str {
        &self.package.version
    }

    /// Returns the package description.
    pub fn description(&self) -> &str {
        &self.package.description
    }

    /// Returns the full package metadata.
    pub fn package(&self) -> &PackageSettings {
        &self.package
    }

    /// Returns the bundle settings.
    pub fn bundle_settings(&self) -> &BundleSettings {
        &self.bundle_settings
    }

    /// Returns the application source tree.
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Returns the artifact output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Returns the preferred workspace root.
    pub fn preferred_workspace(&self) -> &Path {
        &self.preferred_workspace
    }

    /// Returns the configured tool cache, if any.
    pub fn tools_dir(&self) -> Option<&Path> {
        self.tools_dir.as_deref()
    }

    /// Returns the "all" selection.
    pub fn dispatch_all(&self) -> &[BuildTarget] {
        &self.dispatch_all
    }

    /// Absolute path of the Python entry point.
    pub fn entry_point_path(&self) -> PathBuf {
        self.source_dir.join(&self.bundle_settings.entry_point)
    }

    /// Absolute path of the configured icon, if any.
    pub fn icon_path(&self) -> Option<PathBuf> {
        self.bundle_settings
            .icon
            .as_ref()
            .map(|icon| self.source_dir.join(icon))
    }

    /// Entry point as a forward-slash string, for launchers and manifests.
    pub fn entry_point_str(&self) -> String {
        self.bundle_settings
            .entry_point
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Creates a new Settings instance (used by SettingsBuilder).
    pub(super) fn new(
        package: PackageSettings,
        bundle_settings: BundleSettings,
        source_dir: PathBuf,
        output_dir: PathBuf,
        preferred_workspace: PathBuf,
        tools_dir: Option<PathBuf>,
        dispatch_all: Vec<BuildTarget>,
    ) -> Self {
        Self {
            package,
            bundle_settings,
            source_dir,
            output_dir,
            preferred_workspace,
            tools_dir,
            dispatch_all,
        }
    }
}
