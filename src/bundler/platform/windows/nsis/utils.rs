//! NSIS utility functions.
//!
//! Helper functions for install modes, version formatting, compression
//! settings and file operations.

use crate::bundler::{
    error::{ErrorExt, Result},
    settings::{NSISInstallerMode, NsisCompression},
};
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Map compression setting to NSIS compression string.
///
/// Defaults to LZMA if no compression is specified.
pub fn map_compression(compression: Option<NsisCompression>) -> &'static str {
    match compression.unwrap_or(NsisCompression::Lzma) {
        NsisCompression::None => "none",
        NsisCompression::Zlib => "zlib",
        NsisCompression::Bzip2 => "bzip2",
        NsisCompression::Lzma => "lzma",
    }
}

/// `RequestExecutionLevel` for an install mode.
pub fn execution_level(mode: NSISInstallerMode) -> &'static str {
    match mode {
        NSISInstallerMode::CurrentUser => "user",
        NSISInstallerMode::PerMachine => "admin",
        NSISInstallerMode::Both => "highest",
    }
}

/// `SetShellVarContext` for an install mode.
pub fn shell_context(mode: NSISInstallerMode) -> &'static str {
    match mode {
        NSISInstallerMode::CurrentUser => "current",
        NSISInstallerMode::PerMachine | NSISInstallerMode::Both => "all",
    }
}

/// Default install directory for an install mode.
pub fn install_dir(mode: NSISInstallerMode, product_name: &str) -> String {
    match mode {
        NSISInstallerMode::CurrentUser => format!("$LOCALAPPDATA\\Programs\\{product_name}"),
        NSISInstallerMode::PerMachine | NSISInstallerMode::Both => {
            format!("$PROGRAMFILES64\\{product_name}")
        }
    }
}

/// Format version string for NSIS VIProductVersion.
///
/// NSIS requires exactly 4 numeric parts (major.minor.patch.build).
/// Non-numeric parts (pre-release tags) become 0:
/// - "1" -> "1.0.0.0"
/// - "1.1" -> "1.1.0.0"
/// - "1.2.3-beta" -> "1.2.3.0"
/// - "1.2.3.4.5" -> "1.2.3.4" (truncates to first 4)
pub fn format_version_for_nsis(version: &str) -> String {
    let mut parts: Vec<u32> = version
        .split('.')
        .take(4)
        .map(|p| {
            let digits: String = p.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().unwrap_or(0)
        })
        .collect();
    parts.resize(4, 0);
    parts
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

/// Write file with UTF-8 BOM (required by NSIS).
///
/// NSIS requires installer scripts to be encoded with UTF-8 BOM (byte order mark).
/// This function writes the BOM (EF BB BF) followed by the content.
pub async fn write_utf8_bom(path: &Path, content: &str) -> Result<()> {
    let mut file = tokio::fs::File::create(path)
        .await
        .fs_context("creating NSI script file", path)?;

    file.write_all(&[0xEF, 0xBB, 0xBF])
        .await
        .fs_context("writing UTF-8 BOM", path)?;
    file.write_all(content.as_bytes())
        .await
        .fs_context("writing NSI content", path)?;
    file.flush().await.fs_context("flushing NSI file", path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_are_padded_to_four_parts() {
        assert_eq!(format_version_for_nsis("1"), "1.0.0.0");
        assert_eq!(format_version_for_nsis("1.1"), "1.1.0.0");
        assert_eq!(format_version_for_nsis("1.2.3-beta"), "1.2.3.0");
        assert_eq!(format_version_for_nsis("1.2.3.4.5"), "1.2.3.4");
    }

    #[test]
    fn current_user_installs_need_no_elevation() {
        assert_eq!(execution_level(NSISInstallerMode::CurrentUser), "user");
        assert_eq!(shell_context(NSISInstallerMode::CurrentUser), "current");
        assert!(install_dir(NSISInstallerMode::CurrentUser, "StemWeaver").starts_with("$LOCALAPPDATA"));
    }

    #[tokio::test]
    async fn scripts_start_with_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installer.nsi");
        write_utf8_bom(&path, "Name \"x\"\n").await.unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..3], &[0xEF, 0xBB, 0xBF]);
    }
}
