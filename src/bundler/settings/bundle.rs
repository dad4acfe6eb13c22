//! Bundle configuration shared by all targets.

use super::{AppImageSettings, DebianSettings, RpmSettings, WindowsSettings};
use std::path::PathBuf;

/// Bundle configuration for all targets.
///
/// # Configuration
///
/// ```toml
/// [bundle]
/// entry_point = "gui_data/gui_modern_extractor.py"
/// icon = "gui_data/img/app_icon.png"
/// categories = ["AudioVideo", "Audio"]
/// exclude = ["scratch/**"]
/// ```
///
/// Format-specific tables (`[deb]`, `[rpm]`, `[appimage]`, `[nsis]`) are
/// read separately and attached by the manifest loader.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct BundleSettings {
    /// Python entry point relative to the source tree.
    pub entry_point: PathBuf,

    /// PNG icon relative to the source tree. A placeholder is generated when
    /// the file is missing.
    pub icon: Option<PathBuf>,

    /// freedesktop.org categories.
    pub categories: Vec<String>,

    /// pip requirements file relative to the source tree.
    pub requirements: PathBuf,

    /// Extra exclude patterns applied to every payload copy.
    pub exclude: Vec<String>,

    /// Lowest accepted Python version, `major.minor`.
    pub min_python: String,

    /// Debian package configuration.
    #[serde(skip)]
    pub deb: DebianSettings,

    /// RPM package configuration.
    #[serde(skip)]
    pub rpm: RpmSettings,

    /// AppImage configuration.
    #[serde(skip)]
    pub appimage: AppImageSettings,

    /// Windows installer configuration.
    #[serde(skip)]
    pub windows: WindowsSettings,
}

impl Default for BundleSettings {
    fn default() -> Self {
        Self {
            entry_point: PathBuf::from("gui_data/gui_modern_extractor.py"),
            icon: Some(PathBuf::from("gui_data/img/app_icon.png")),
            categories: vec!["AudioVideo".to_string(), "Audio".to_string()],
            requirements: PathBuf::from("requirements.txt"),
            exclude: Vec::new(),
            min_python: "3.8".to_string(),
            deb: DebianSettings::default(),
            rpm: RpmSettings::default(),
            appimage: AppImageSettings::default(),
            windows: WindowsSettings::default(),
        }
    }
}
