//! Command line argument parsing and validation.

use clap::Parser;
use std::path::PathBuf;

/// Package build orchestrator for StemWeaver
#[derive(Parser, Debug)]
#[command(
    name = "stemweaver_bundler",
    version,
    about = "Build AppImage, deb, rpm, Windows and source packages of StemWeaver",
    long_about = "Builds distributable packages of the StemWeaver audio stem separation tool.

Without --select an interactive menu is shown:
  1  AppImage (x86_64)      4  RPM package
  2  AppImage (aarch64)     5  all Linux targets
  3  Debian package         6  Windows installer (NSIS)
  7  source archive + developer environment
  0  exit

Usage:
  stemweaver_bundler --source ~/src/StemWeaver
  stemweaver_bundler --source . --select 1,3 --yes

Environment:
  STEMWEAVER_BUILD_DIR  scratch directory override
  RUST_LOG              log filter

Exit codes: 0 success, 1 build or usage failure, 2 environment failure, 130 interrupted."
)]
pub struct Args {
    /// Application source tree
    #[arg(short = 's', long, value_name = "DIR", default_value = ".")]
    pub source: PathBuf,

    /// Configuration file (default: <source>/bundle.toml, optional)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Artifact output directory (default: <source>/dist)
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Menu selection, e.g. "1,3" or "5"; skips the interactive menu
    #[arg(long, value_name = "TOKENS")]
    pub select: Option<String>,

    /// Answer yes to every confirmation (selection, tool installation)
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Keep staging trees of successful jobs
    #[arg(long)]
    pub keep_staging: bool,

    /// Show debug output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show warnings, errors and the summary
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.source.as_os_str().is_empty() {
            return Err("Source cannot be empty".to_string());
        }
        if self.select.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err("--select needs at least one menu number".to_string());
        }
        Ok(())
    }

    /// Default log filter for these flags; `RUST_LOG` overrides it.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}
