//! Immutable per-run build context.

use super::{settings::Settings, workspace::Workspace};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// Timestamp format shared by log names and staging directories.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Everything a job needs to know about the run it belongs to.
///
/// Built once after the workspace is resolved and passed by reference into
/// every component; nothing downstream reads the process environment or the
/// current directory.
#[derive(Clone, Debug)]
pub struct BuildContext {
    settings: Settings,
    workspace: Workspace,
    tools_dir: PathBuf,
    started_at: DateTime<Local>,
    timestamp: String,
    keep_staging: bool,
}

impl BuildContext {
    /// Context for a run starting now.
    pub fn new(settings: Settings, workspace: Workspace) -> Self {
        let tools_dir = settings
            .tools_dir()
            .map(Path::to_path_buf)
            .or_else(|| dirs::cache_dir().map(|d| d.join("stemweaver-bundler").join("tools")))
            .unwrap_or_else(|| workspace.tools_dir());
        let started_at = Local::now();

        Self {
            timestamp: started_at.format(TIMESTAMP_FORMAT).to_string(),
            settings,
            workspace,
            tools_dir,
            started_at,
            keep_staging: false,
        }
    }

    /// Keep staging trees of successful jobs too.
    pub fn with_keep_staging(mut self, keep: bool) -> Self {
        self.keep_staging = keep;
        self
    }

    /// Override the tool cache location.
    pub fn with_tools_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tools_dir = dir.into();
        self
    }

    /// Override the run timestamp.
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Bundler settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Resolved scratch workspace.
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Directory holding this run's logs.
    pub fn logs_dir(&self) -> PathBuf {
        self.workspace.logs_dir()
    }

    /// Directory holding staging trees.
    pub fn staging_root(&self) -> PathBuf {
        self.workspace.staging_dir()
    }

    /// Tool cache shared across runs.
    pub fn tools_dir(&self) -> &Path {
        &self.tools_dir
    }

    /// Application source tree.
    pub fn source_dir(&self) -> &Path {
        self.settings.source_dir()
    }

    /// Artifact output directory.
    pub fn output_dir(&self) -> &Path {
        self.settings.output_dir()
    }

    /// Run timestamp, formatted with [`TIMESTAMP_FORMAT`].
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// When the run started.
    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Whether successful staging trees are kept.
    pub fn keep_staging(&self) -> bool {
        self.keep_staging
    }
}
