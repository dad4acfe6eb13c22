//! CPU architecture types and utilities.

/// CPU architecture of a produced package.
///
/// Packaging formats disagree on how to spell architectures, so each format
/// has its own accessor.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// x86_64 / AMD64 (64-bit)
    X86_64,
    /// AArch64 / ARM64 (64-bit)
    AArch64,
}

impl Arch {
    /// Architecture of the machine running the bundler.
    ///
    /// Anything that is not aarch64 is treated as x86_64.
    pub fn host() -> Self {
        match std::env::consts::ARCH {
            "aarch64" => Arch::AArch64,
            _ => Arch::X86_64,
        }
    }

    /// Name used by AppImage tooling (`ARCH=` and file names).
    pub fn appimage_name(self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::AArch64 => "aarch64",
        }
    }

    /// Name used by NSIS scripts and installer file names.
    pub fn nsis_name(self) -> &'static str {
        match self {
            Arch::X86_64 => "x64",
            Arch::AArch64 => "arm64",
        }
    }
}
