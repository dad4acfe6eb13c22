//! The fixed set of build targets.
//!
//! Each [`BuildTarget`] maps to one immutable [`TargetSpec`] row: its label,
//! menu number, host tools, payload profile and duration estimate. Drivers
//! are looked up from the same enum in [`crate::bundler::platform`].

use super::{
    probe::ToolSpec,
    settings::{Arch, Settings},
    staging::PayloadProfile,
};
use std::{fmt, str::FromStr};

/// One supported output format plus its recipe.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Deserialize, serde::Serialize)]
pub enum BuildTarget {
    /// Portable AppImage for x86_64.
    #[serde(rename = "appimage-x86_64")]
    AppImageX86_64,
    /// Portable AppImage for aarch64.
    #[serde(rename = "appimage-aarch64")]
    AppImageAArch64,
    /// Debian package.
    #[serde(rename = "deb")]
    Deb,
    /// RPM package.
    #[serde(rename = "rpm")]
    Rpm,
    /// Windows NSIS installer.
    #[serde(rename = "windows-nsis")]
    WindowsNsis,
    /// Source tarball with a developer environment bootstrap script.
    #[serde(rename = "source-dev-env")]
    SourceDevEnv,
}

/// Static description of a target.
#[derive(Debug)]
pub struct TargetSpec {
    /// Stable identifier used in file names and configuration.
    pub id: &'static str,
    /// Menu label.
    pub label: &'static str,
    /// Number typed at the interactive prompt.
    pub menu_key: u32,
    /// Host tools, in probe order.
    pub tools: &'static [ToolSpec],
    /// Which payload files are shipped.
    pub profile: PayloadProfile,
    /// Rough wall-clock estimate in minutes.
    pub estimate_minutes: u32,
}

static TARGETS: [TargetSpec; 6] = [
    TargetSpec {
        id: "appimage-x86_64",
        label: "AppImage (x86_64, complete)",
        menu_key: 1,
        tools: &[],
        profile: PayloadProfile::Complete,
        estimate_minutes: 3,
    },
    TargetSpec {
        id: "appimage-aarch64",
        label: "AppImage (aarch64, light)",
        menu_key: 2,
        tools: &[],
        profile: PayloadProfile::Light,
        estimate_minutes: 3,
    },
    TargetSpec {
        id: "deb",
        label: "Debian package (.deb)",
        menu_key: 3,
        tools: &[
            ToolSpec::required("dpkg-deb", "dpkg"),
            ToolSpec::optional("fakeroot", "fakeroot"),
        ],
        profile: PayloadProfile::Light,
        estimate_minutes: 2,
    },
    TargetSpec {
        id: "rpm",
        label: "RPM package (.rpm)",
        menu_key: 4,
        tools: &[ToolSpec::required("rpmbuild", "rpm-build")],
        profile: PayloadProfile::Light,
        estimate_minutes: 3,
    },
    TargetSpec {
        id: "windows-nsis",
        label: "Windows installer (NSIS .exe)",
        menu_key: 6,
        tools: &[ToolSpec::required("makensis", "nsis")],
        profile: PayloadProfile::Complete,
        estimate_minutes: 4,
    },
    TargetSpec {
        id: "source-dev-env",
        label: "Source archive + developer environment",
        menu_key: 7,
        tools: &[
            ToolSpec::required("python3", "python3"),
            ToolSpec::optional("git", "git"),
        ],
        profile: PayloadProfile::Complete,
        estimate_minutes: 1,
    },
];

impl BuildTarget {
    /// Every target, in menu order.
    pub const ALL: [BuildTarget; 6] = [
        BuildTarget::AppImageX86_64,
        BuildTarget::AppImageAArch64,
        BuildTarget::Deb,
        BuildTarget::Rpm,
        BuildTarget::WindowsNsis,
        BuildTarget::SourceDevEnv,
    ];

    /// Default members of the "all Linux targets" menu entry.
    pub const DEFAULT_ALL: [BuildTarget; 2] = [BuildTarget::AppImageX86_64, BuildTarget::Deb];

    /// The static table row for this target.
    pub fn spec(self) -> &'static TargetSpec {
        let index = match self {
            BuildTarget::AppImageX86_64 => 0,
            BuildTarget::AppImageAArch64 => 1,
            BuildTarget::Deb => 2,
            BuildTarget::Rpm => 3,
            BuildTarget::WindowsNsis => 4,
            BuildTarget::SourceDevEnv => 5,
        };
        &TARGETS[index]
    }

    /// Stable identifier.
    pub fn id(self) -> &'static str {
        self.spec().id
    }

    /// Human label.
    pub fn label(self) -> &'static str {
        self.spec().label
    }

    /// Looks a target up by its menu number.
    pub fn from_menu_key(key: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.spec().menu_key == key)
    }

    /// Architecture of the produced package.
    pub fn arch(self) -> Arch {
        match self {
            BuildTarget::AppImageAArch64 => Arch::AArch64,
            _ => Arch::X86_64,
        }
    }

    /// File-name glob the finished artifact must match inside the output
    /// directory.
    pub fn artifact_glob(self, settings: &Settings) -> String {
        let version = settings.version_string();
        match self {
            BuildTarget::AppImageX86_64 | BuildTarget::AppImageAArch64 => format!(
                "{}-{}-{}.AppImage",
                settings.product_name(),
                version,
                self.arch().appimage_name()
            ),
            BuildTarget::Deb => format!(
                "{}_{}_{}.deb",
                settings.package_name(),
                version,
                settings.bundle_settings().deb.architecture
            ),
            BuildTarget::Rpm => format!(
                "{}-{}-{}*.{}.rpm",
                settings.package_name(),
                version,
                settings.bundle_settings().rpm.release,
                settings.bundle_settings().rpm.architecture
            ),
            BuildTarget::WindowsNsis => format!(
                "{}_{}_{}-setup.exe",
                settings.product_name(),
                version,
                self.arch().nsis_name()
            ),
            BuildTarget::SourceDevEnv => {
                format!("{}-{}-src.tar.gz", settings.package_name(), version)
            }
        }
    }

    /// Whether the finished artifact is run directly by users.
    pub fn executable_artifact(self) -> bool {
        matches!(
            self,
            BuildTarget::AppImageX86_64 | BuildTarget::AppImageAArch64
        )
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for BuildTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.id() == s)
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|t| t.id()).collect();
                format!("unknown target `{s}` (known: {})", known.join(", "))
            })
    }
}
