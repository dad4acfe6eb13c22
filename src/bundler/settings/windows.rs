//! Windows platform-specific settings.

/// Windows installer configuration.
#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct WindowsSettings {
    /// NSIS EXE installer settings.
    pub nsis: NsisSettings,
}

/// NSIS installer configuration.
///
/// # Configuration
///
/// ```toml
/// [nsis]
/// install_mode = "currentUser"
/// compression = "lzma"
/// embed_python = true
/// ```
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default)]
pub struct NsisSettings {
    /// Installation scope.
    pub install_mode: NSISInstallerMode,

    /// Compression algorithm. None means LZMA.
    pub compression: Option<NsisCompression>,

    /// Ship the Windows embeddable Python distribution as `runtime\`.
    pub embed_python: bool,

    /// Download URL of the embeddable Python zip.
    pub python_embed_url: String,

    /// Pinned SHA-256 of the embeddable Python zip, if any.
    pub python_embed_sha256: Option<String>,
}

impl Default for NsisSettings {
    fn default() -> Self {
        Self {
            install_mode: NSISInstallerMode::default(),
            compression: None,
            embed_python: true,
            python_embed_url:
                "https://www.python.org/ftp/python/3.11.9/python-3.11.9-embed-amd64.zip"
                    .to_string(),
            python_embed_sha256: None,
        }
    }
}

/// NSIS installer installation mode.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NSISInstallerMode {
    /// Install for the current user only (no elevation).
    #[default]
    CurrentUser,
    /// Install for all users (requires elevation).
    PerMachine,
    /// Let the user choose.
    Both,
}

/// NSIS compression algorithm.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NsisCompression {
    /// No compression.
    None,
    /// Zlib.
    Zlib,
    /// Bzip2.
    Bzip2,
    /// LZMA (best ratio).
    Lzma,
}
