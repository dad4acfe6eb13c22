//! NSIS installer build execution.
//!
//! Compiles NSI scripts into Windows installer executables using makensis.

use crate::bundler::{
    build_log::BuildLog,
    error::{ErrorExt, Result},
    process::{ProcessResult, run_logged},
};
use std::path::Path;

/// Run makensis to compile the NSI script.
///
/// The output path is baked into the script (`OutFile`), so only its parent
/// directory is created here.
pub async fn run_makensis(
    nsi_path: &Path,
    output_path: &Path,
    log: &mut BuildLog,
) -> Result<ProcessResult> {
    if let Some(parent) = output_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .fs_context("creating installer output directory", parent)?;
    }

    let mut cmd = tokio::process::Command::new("makensis");
    cmd.args(["-V3", "-INPUTCHARSET", "UTF8"]).arg(nsi_path);

    log.section("makensis").await?;
    run_logged(cmd, log).await
}
