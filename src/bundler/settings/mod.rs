//! Configuration structures for bundling operations.
//!
//! Package metadata, per-format settings and the builder that assembles them
//! into one immutable [`Settings`] value.

mod arch;
mod builder;
mod bundle;
mod core;
mod linux;
mod package;
mod windows;

pub use arch::Arch;
pub use builder::{DEFAULT_PREFERRED_WORKSPACE, SettingsBuilder};
pub use bundle::BundleSettings;
pub use self::core::Settings;
pub use linux::{AppImageSettings, DebianSettings, RpmSettings};
pub use package::PackageSettings;
pub use windows::{NSISInstallerMode, NsisCompression, NsisSettings, WindowsSettings};
