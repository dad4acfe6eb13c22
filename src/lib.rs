//! Package build orchestrator for the StemWeaver audio stem separation tool.
//!
//! This library turns the StemWeaver source tree into:
//! - Portable AppImages (x86_64, aarch64)
//! - Linux packages (.deb, .rpm)
//! - A Windows installer (.exe via NSIS)
//! - A source archive with a developer environment bootstrap
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod bundler;
pub mod cli;
pub mod error;
pub mod metadata;

// Re-export commonly used types
pub use error::{BundlerError, CliError, Result};
