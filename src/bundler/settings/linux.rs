//! Linux platform-specific settings.

use std::path::PathBuf;

/// Debian package (.deb) configuration.
///
/// # Configuration
///
/// ```toml
/// [deb]
/// depends = ["python3 (>= 3.8)", "ffmpeg"]
/// section = "sound"
/// ```
///
/// # Maintainer Scripts
///
/// `postinst` and `prerm` are generated to create and remove the private
/// virtualenv under the install prefix. Either can be replaced with a custom
/// script through `post_install_script` / `pre_remove_script`.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default)]
pub struct DebianSettings {
    /// Package dependencies in Debian syntax.
    pub depends: Vec<String>,

    /// Packages that enhance the application but are not required.
    pub recommends: Vec<String>,

    /// Debian control file section.
    pub section: String,

    /// Package priority.
    pub priority: String,

    /// Control-file architecture. `all` for a pure Python payload.
    pub architecture: String,

    /// Custom `postinst` script replacing the generated one.
    pub post_install_script: Option<PathBuf>,

    /// Custom `prerm` script replacing the generated one.
    pub pre_remove_script: Option<PathBuf>,
}

impl Default for DebianSettings {
    fn default() -> Self {
        Self {
            depends: vec![
                "python3 (>= 3.8)".to_string(),
                "python3-venv".to_string(),
                "python3-pip".to_string(),
                "ffmpeg".to_string(),
                "libsndfile1".to_string(),
            ],
            recommends: Vec::new(),
            section: "sound".to_string(),
            priority: "optional".to_string(),
            architecture: "all".to_string(),
            post_install_script: None,
            pre_remove_script: None,
        }
    }
}

/// RPM package (.rpm) configuration.
///
/// # Configuration
///
/// ```toml
/// [rpm]
/// requires = ["python3 >= 3.8", "libsndfile"]
/// release = "1"
/// ```
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default)]
pub struct RpmSettings {
    /// Package dependencies in RPM syntax.
    pub requires: Vec<String>,

    /// Release number appended to version.
    pub release: String,

    /// `BuildArch`. `noarch` for a pure Python payload.
    pub architecture: String,

    /// Custom `%post` scriptlet body replacing the generated one.
    pub post_install_script: Option<PathBuf>,

    /// Custom `%preun` scriptlet body replacing the generated one.
    pub pre_remove_script: Option<PathBuf>,
}

impl Default for RpmSettings {
    fn default() -> Self {
        Self {
            requires: vec![
                "python3 >= 3.8".to_string(),
                "python3-pip".to_string(),
                "libsndfile".to_string(),
            ],
            release: "1".to_string(),
            architecture: "noarch".to_string(),
            post_install_script: None,
            pre_remove_script: None,
        }
    }
}

/// AppImage portable bundle configuration.
///
/// `appimagetool` is downloaded on first use and cached; it is itself an
/// AppImage and gets extracted so no FUSE mount is needed.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default)]
pub struct AppImageSettings {
    /// Release directory that hosts `appimagetool-<arch>.AppImage`.
    pub tool_base_url: String,

    /// Pinned SHA-256 of the downloaded tool, if any.
    pub tool_sha256: Option<String>,

    /// Directory (relative to the source tree) holding a relocatable Python
    /// runtime to embed as `runtime/`. The launcher prefers it when present.
    pub runtime_dir: Option<PathBuf>,
}

impl Default for AppImageSettings {
    fn default() -> Self {
        Self {
            tool_base_url: "https://github.com/AppImage/appimagetool/releases/download/continuous"
                .to_string(),
            tool_sha256: None,
            runtime_dir: None,
        }
    }
}
