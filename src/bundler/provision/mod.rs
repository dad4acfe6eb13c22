//! Download and cache third-party packaging binaries.
//!
//! Tools live in a cache directory shared across runs. Each download is
//! recorded in `manifest.json` (size and SHA-256) and a cached copy is reused
//! only while it still matches that record. Self-extracting bundles are
//! unpacked once so later invocations need no FUSE mount.

pub mod download;
pub mod extract;

use crate::bundler::{
    builder::checksum::calculate_sha256,
    error::{Error, ErrorExt, Result},
    settings::{Arch, Settings},
    utils::fs,
};
use chrono::{DateTime, Utc};
use download::{Downloader, default_strategies, download_with};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Name of the cache manifest inside the tools directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// How a downloaded file is turned into something runnable.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ToolKind {
    /// Executable as downloaded.
    Plain,
    /// AppImage bundle, unpacked with `--appimage-extract`.
    SelfExtracting,
    /// Zip archive; `marker` must exist after extraction.
    ZipArchive {
        /// File (relative to the extraction root) proving a complete unpack.
        marker: String,
    },
}

/// A third-party binary the bundler fetches on demand.
#[derive(Clone, Debug)]
pub struct ToolBinary {
    name: String,
    url: String,
    kind: ToolKind,
    sha256: Option<String>,
    file_name: String,
}

impl ToolBinary {
    /// Tool `name` downloaded from `url`. The cache file name is the last
    /// URL path segment.
    pub fn new(name: impl Into<String>, url: impl Into<String>, kind: ToolKind) -> Self {
        let url = url.into();
        let file_name = url_file_name(&url);
        Self {
            name: name.into(),
            url,
            kind,
            sha256: None,
            file_name,
        }
    }

    /// Require the download to match a pinned checksum.
    pub fn with_sha256(mut self, sha256: Option<String>) -> Self {
        self.sha256 = sha256.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());
        self
    }

    /// `appimagetool` for `arch`.
    pub fn appimagetool(settings: &Settings, arch: Arch) -> Self {
        let appimage = &settings.bundle_settings().appimage;
        let url = format!(
            "{}/appimagetool-{}.AppImage",
            appimage.tool_base_url.trim_end_matches('/'),
            arch.appimage_name()
        );
        Self::new("appimagetool", url, ToolKind::SelfExtracting)
            .with_sha256(appimage.tool_sha256.clone())
    }

    /// Windows embeddable Python distribution.
    pub fn python_embed(settings: &Settings) -> Self {
        let nsis = &settings.bundle_settings().windows.nsis;
        Self::new(
            "python-embed",
            nsis.python_embed_url.clone(),
            ToolKind::ZipArchive {
                marker: "python.exe".to_string(),
            },
        )
        .with_sha256(nsis.python_embed_sha256.clone())
    }

    /// Tool name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Tool kind.
    pub fn kind(&self) -> &ToolKind {
        &self.kind
    }

    /// Cache file name.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    fn unpacked_dir_name(&self) -> String {
        let stem = self
            .file_name
            .trim_end_matches(".AppImage")
            .trim_end_matches(".zip")
            .replace('.', "_");
        format!("{stem}-extracted")
    }
}

fn url_file_name(url: &str) -> String {
    let last = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .rsplit('/')
        .next()
        .unwrap_or_default();
    let sanitized: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        "download".to_string()
    } else {
        sanitized
    }
}

/// How to run a provisioned tool.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ToolInvocation {
    /// Run the path directly.
    Direct(PathBuf),
    /// Run the bundle with `--appimage-extract-and-run`; used when extraction
    /// failed.
    ExtractAndRun(PathBuf),
}

impl ToolInvocation {
    /// Command prepared for this invocation style.
    pub fn command(&self) -> tokio::process::Command {
        match self {
            ToolInvocation::Direct(path) => tokio::process::Command::new(path),
            ToolInvocation::ExtractAndRun(path) => {
                let mut cmd = tokio::process::Command::new(path);
                cmd.arg("--appimage-extract-and-run")
                    .env("APPIMAGE_EXTRACT_AND_RUN", "1");
                cmd
            }
        }
    }

    /// Executable path.
    pub fn path(&self) -> &Path {
        match self {
            ToolInvocation::Direct(path) | ToolInvocation::ExtractAndRun(path) => path,
        }
    }
}

/// A tool ready for use.
#[derive(Clone, Debug)]
pub struct ProvisionedTool {
    /// Tool name.
    pub name: String,
    /// Cached download.
    pub download: PathBuf,
    /// Unpacked tree, for extracted bundles and archives.
    pub unpacked: Option<PathBuf>,
    /// How to run it. Archives are not run; their invocation points at the
    /// marker file.
    pub invocation: ToolInvocation,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
struct CacheEntry {
    url: String,
    sha256: String,
    size: u64,
    downloaded_at: DateTime<Utc>,
}

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct CacheManifest {
    #[serde(default)]
    tools: BTreeMap<String, CacheEntry>,
}

impl CacheManifest {
    async fn load(dir: &Path) -> Self {
        let path = dir.join(MANIFEST_FILE);
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable tool manifest {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    async fn save(&self, dir: &Path) -> Result<()> {
        let path = dir.join(MANIFEST_FILE);
        let json = serde_json::to_vec_pretty(self)?;
        fs::write_file(&path, json).await
    }
}

/// Fetches, verifies and unpacks tools into a cache directory.
pub struct Provisioner {
    tools_dir: PathBuf,
    downloaders: Vec<Box<dyn Downloader>>,
}

impl Provisioner {
    /// Provisioner using the default download strategies.
    pub fn new(tools_dir: impl Into<PathBuf>) -> Self {
        Self::with_downloaders(tools_dir, default_strategies())
    }

    /// Provisioner with explicit download strategies.
    pub fn with_downloaders(
        tools_dir: impl Into<PathBuf>,
        downloaders: Vec<Box<dyn Downloader>>,
    ) -> Self {
        Self {
            tools_dir: tools_dir.into(),
            downloaders,
        }
    }

    /// Cache directory.
    pub fn tools_dir(&self) -> &Path {
        &self.tools_dir
    }

    /// Make `tool` available, downloading and unpacking it if needed.
    ///
    /// Calling this twice for the same tool performs no network I/O the
    /// second time and returns the same paths.
    ///
    /// # Errors
    ///
    /// [`Error::Provision`] naming the tool.
    pub async fn provision(&self, tool: &ToolBinary) -> Result<ProvisionedTool> {
        self.provision_inner(tool)
            .await
            .map_err(|e| match e {
                Error::Provision { .. } => e,
                other => Error::Provision {
                    tool: tool.name.clone(),
                    reason: other.to_string(),
                },
            })
    }

    async fn provision_inner(&self, tool: &ToolBinary) -> Result<ProvisionedTool> {
        fs::create_dir_all(&self.tools_dir, false).await?;
        let (download, fresh) = self.ensure_download(tool).await?;
        let unpacked_dir = self.tools_dir.join(tool.unpacked_dir_name());
        if fresh {
            fs::remove_dir_all(&unpacked_dir).await?;
        }

        match &tool.kind {
            ToolKind::Plain => Ok(ProvisionedTool {
                name: tool.name.clone(),
                invocation: ToolInvocation::Direct(download.clone()),
                download,
                unpacked: None,
            }),
            ToolKind::SelfExtracting => {
                let apprun = unpacked_dir.join("AppRun");
                if apprun.exists() {
                    log::debug!("{} already extracted at {}", tool.name, unpacked_dir.display());
                } else if let Err(e) = extract::extract_bundle(&download, &unpacked_dir).await {
                    log::warn!(
                        "Could not extract {} ({}); falling back to --appimage-extract-and-run",
                        tool.name,
                        e
                    );
                    return Ok(ProvisionedTool {
                        name: tool.name.clone(),
                        invocation: ToolInvocation::ExtractAndRun(download.clone()),
                        download,
                        unpacked: None,
                    });
                }
                fs::set_mode(&apprun, 0o755).await?;
                Ok(ProvisionedTool {
                    name: tool.name.clone(),
                    download,
                    unpacked: Some(unpacked_dir),
                    invocation: ToolInvocation::Direct(apprun),
                })
            }
            ToolKind::ZipArchive { marker } => {
                let marker_path = unpacked_dir.join(marker);
                if !marker_path.exists() {
                    fs::remove_dir_all(&unpacked_dir).await?;
                    extract::extract_zip(&download, &unpacked_dir).await?;
                    if !marker_path.exists() {
                        fs::remove_dir_all(&unpacked_dir).await?;
                        return Err(Error::Provision {
                            tool: tool.name.clone(),
                            reason: format!("archive does not contain {marker}"),
                        });
                    }
                }
                Ok(ProvisionedTool {
                    name: tool.name.clone(),
                    download,
                    unpacked: Some(unpacked_dir),
                    invocation: ToolInvocation::Direct(marker_path),
                })
            }
        }
    }

    /// Returns the cached download and whether it was fetched just now.
    async fn ensure_download(&self, tool: &ToolBinary) -> Result<(PathBuf, bool)> {
        let path = self.tools_dir.join(&tool.file_name);
        let mut manifest = CacheManifest::load(&self.tools_dir).await;

        if self.cached_copy_valid(tool, &path, manifest.tools.get(&tool.file_name)).await {
            log::debug!("Using cached {} at {}", tool.name, path.display());
            return Ok((path, false));
        }

        download_with(&self.downloaders, &tool.url, &path).await?;

        let sha256 = calculate_sha256(&path).await?;
        if let Some(expected) = &tool.sha256 {
            if &sha256 != expected {
                let _ = tokio::fs::remove_file(&path).await;
                return Err(Error::Provision {
                    tool: tool.name.clone(),
                    reason: format!("checksum mismatch: expected {expected}, got {sha256}"),
                });
            }
        }

        let size = tokio::fs::metadata(&path)
            .await
            .fs_context("reading downloaded tool", &path)?
            .len();
        if !matches!(tool.kind, ToolKind::ZipArchive { .. }) {
            fs::set_mode(&path, 0o755).await?;
        }

        manifest.tools.insert(
            tool.file_name.clone(),
            CacheEntry {
                url: tool.url.clone(),
                sha256,
                size,
                downloaded_at: Utc::now(),
            },
        );
        manifest.save(&self.tools_dir).await?;
        log::info!("✓ Cached {} ({} bytes) at {}", tool.name, size, path.display());

        Ok((path, true))
    }

    async fn cached_copy_valid(
        &self,
        tool: &ToolBinary,
        path: &Path,
        entry: Option<&CacheEntry>,
    ) -> bool {
        let Some(entry) = entry else {
            return false;
        };
        let Ok(meta) = tokio::fs::metadata(path).await else {
            return false;
        };
        if meta.len() == 0 || meta.len() != entry.size || entry.url != tool.url {
            return false;
        }
        if tool.sha256.as_ref().is_some_and(|pinned| pinned != &entry.sha256) {
            return false;
        }
        match calculate_sha256(path).await {
            Ok(actual) if actual == entry.sha256 => true,
            Ok(_) => {
                log::warn!("Cached {} does not match its manifest entry; re-downloading", tool.name);
                false
            }
            Err(_) => false,
        }
    }
}
