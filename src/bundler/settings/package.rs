//! Package metadata and configuration.

/// Package metadata shared by every output format.
///
/// Loaded from the `[app]` table of `bundle.toml`; the defaults describe
/// StemWeaver itself.
///
/// # Examples
///
/// ```no_run
/// use stemweaver_bundler::bundler::PackageSettings;
///
/// let settings = PackageSettings {
///     version: "1.1".into(),
///     ..Default::default()
/// };
/// assert_eq!(settings.package_name, "stemweaver");
/// ```
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct PackageSettings {
    /// Product name displayed to users.
    pub product_name: String,

    /// Lowercase package identifier used for file names, `/usr/bin` and
    /// package manager names.
    pub package_name: String,

    /// Version string. Empty means "detect from the entry point".
    pub version: String,

    /// One-line summary.
    pub description: String,

    /// Longer description for package managers.
    pub long_description: Option<String>,

    /// Homepage URL.
    pub homepage: Option<String>,

    /// Package authors.
    pub authors: Vec<String>,

    /// Publisher shown by installers.
    pub publisher: String,

    /// License identifier.
    pub license: String,

    /// Maintainer line for Debian packages.
    pub maintainer: String,
}

impl Default for PackageSettings {
    fn default() -> Self {
        Self {
            product_name: "StemWeaver".to_string(),
            package_name: "stemweaver".to_string(),
            version: String::new(),
            description: "Professional audio stem separation tool".to_string(),
            long_description: Some(
                "Separates songs into vocals, drums, bass and other stems \
                 using Demucs models or spectral processing, with MIDI export."
                    .to_string(),
            ),
            homepage: Some("https://github.com/mangoban/StemWeaver".to_string()),
            authors: vec!["bendeb creations".to_string()],
            publisher: "bendeb creations".to_string(),
            license: "CC-BY-4.0".to_string(),
            maintainer: "bendeb creations <noreply@github.com>".to_string(),
        }
    }
}
