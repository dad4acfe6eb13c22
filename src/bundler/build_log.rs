//! Per-job append-only build logs.

use crate::bundler::{
    BuildTarget,
    error::{ErrorExt, Result},
};
use std::path::{Path, PathBuf};
use tokio::{fs::OpenOptions, io::AsyncWriteExt};

/// Combined output of one build job.
///
/// Named `<target-id>-<run timestamp>.log` so a run's logs sort together and
/// never collide with another job of the same run.
#[derive(Debug)]
pub struct BuildLog {
    path: PathBuf,
    file: tokio::fs::File,
}

impl BuildLog {
    /// Deterministic file name for `target` in the run stamped `timestamp`.
    pub fn file_name(target: BuildTarget, timestamp: &str) -> String {
        format!("{}-{}.log", target.id(), timestamp)
    }

    /// Open (or continue) the log for `target` in `dir`.
    pub async fn create(dir: &Path, target: BuildTarget, timestamp: &str) -> Result<Self> {
        tokio::fs::create_dir_all(dir)
            .await
            .fs_context("creating log directory", dir)?;

        let path = dir.join(Self::file_name(target, timestamp));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .fs_context("opening build log", &path)?;

        Ok(Self { path, file })
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line.
    pub async fn line(&mut self, line: &str) -> Result<()> {
        self.file
            .write_all(format!("{line}\n").as_bytes())
            .await
            .fs_context("writing build log", &self.path)?;
        self.file
            .flush()
            .await
            .fs_context("flushing build log", &self.path)
    }

    /// Append a visually separated heading.
    pub async fn section(&mut self, title: &str) -> Result<()> {
        self.line(&format!("==> {title}")).await
    }
}
