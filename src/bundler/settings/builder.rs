//! Builder for constructing Settings.

use super::{BundleSettings, PackageSettings, Settings};
use crate::bundler::BuildTarget;
use std::path::{Path, PathBuf};

/// Default first workspace candidate.
pub const DEFAULT_PREFERRED_WORKSPACE: &str = "/var/cache/stemweaver-build";

/// Builder for constructing [`Settings`].
///
/// # Examples
///
/// ```no_run
/// use stemweaver_bundler::bundler::{PackageSettings, SettingsBuilder};
///
/// # fn example() -> stemweaver_bundler::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .source_dir("/src/StemWeaver")
///     .package_settings(PackageSettings {
///         version: "1.1".into(),
///         ..Default::default()
///     })
///     .build()?;
/// assert!(settings.output_dir().ends_with("dist"));
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct SettingsBuilder {
    source_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    package_settings: Option<PackageSettings>,
    bundle_settings: BundleSettings,
    preferred_workspace: Option<PathBuf>,
    tools_dir: Option<PathBuf>,
    dispatch_all: Option<Vec<BuildTarget>>,
}

impl SettingsBuilder {
    /// Creates a new settings builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the application source tree.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn source_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.source_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the artifact output directory.
    ///
    /// Default: `<source_dir>/dist`
    pub fn output_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets package metadata.
    ///
    /// Default: StemWeaver metadata with an empty version.
    pub fn package_settings(mut self, settings: PackageSettings) -> Self {
        self.package_settings = Some(settings);
        self
    }

    /// Sets bundle configuration.
    pub fn bundle_settings(mut self, settings: BundleSettings) -> Self {
        self.bundle_settings = settings;
        self
    }

    /// Sets the preferred workspace root.
    ///
    /// Default: [`DEFAULT_PREFERRED_WORKSPACE`]
    pub fn preferred_workspace<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.preferred_workspace = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the tool cache directory.
    pub fn tools_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.tools_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the targets behind the "all" menu entry.
    ///
    /// Default: [`BuildTarget::DEFAULT_ALL`]
    pub fn dispatch_all(mut self, targets: Vec<BuildTarget>) -> Self {
        self.dispatch_all = Some(targets);
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if `source_dir` is missing or the "all" selection is
    /// empty.
    pub fn build(self) -> crate::bundler::Result<Settings> {
        use crate::bundler::error::Context;

        let source_dir = self.source_dir.context("source_dir is required")?;
        let output_dir = self
            .output_dir
            .unwrap_or_else(|| source_dir.join("dist"));

        let dispatch_all = self
            .dispatch_all
            .unwrap_or_else(|| BuildTarget::DEFAULT_ALL.to_vec());
        if dispatch_all.is_empty() {
            crate::bail!("the \"all\" selection must name at least one target");
        }

        let mut package = self.package_settings.unwrap_or_default();
        if package.version.trim().is_empty() {
            package.version = "0.0.0".to_string();
        }

        Ok(Settings::new(
            package,
            self.bundle_settings,
            source_dir,
            output_dir,
            self.preferred_workspace
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PREFERRED_WORKSPACE)),
            self.tools_dir,
            dispatch_all,
        ))
    }
}
