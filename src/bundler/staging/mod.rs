//! Per-target staging trees.
//!
//! A [`StagingTree`] is the scratch filesystem layout a driver hands to its
//! packaging tool. Payload files are copied through an [`ExcludeFilter`]; the
//! launcher, desktop entry and icon come from the submodules.

pub mod desktop;
pub mod icon;
pub mod launcher;

use crate::bundler::{
    BuildContext, BuildTarget,
    error::{Error, Result},
    utils::fs,
};
use glob::Pattern;
use std::path::{Path, PathBuf};

/// Which payload files a target ships.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadProfile {
    /// Sources and assets only. Model weights and documentation are left out.
    Light,
    /// Everything except build leftovers.
    Complete,
}

/// Excluded from every payload wherever they appear: VCS metadata, caches,
/// virtualenvs and packaged outputs.
pub const COMMON_EXCLUDES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".gitignore",
    "__pycache__",
    "*.pyc",
    "*.pyo",
    ".venv",
    "venv",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    "*.egg-info",
    ".idea",
    ".vscode",
    "*.AppImage",
    "*.AppDir",
    "*.deb",
    "*.rpm",
    "*-setup.exe",
    "*-src.tar.gz",
];

/// Excluded only at the top of the source tree, where earlier builds leave
/// their outputs. Nested directories with these names are application code.
pub const ROOT_EXCLUDES: &[&str] = &["dist", "build", "staging", "env"];

/// Additionally excluded from light payloads.
pub const LIGHT_EXCLUDES: &[&str] = &[
    "models",
    "pretrained_models",
    "*.pth",
    "*.th",
    "*.ckpt",
    "*.onnx",
    "*.pt",
    "*.safetensors",
    "docs",
    "*.md",
    "*.pdf",
];

/// Decides which source entries stay out of a payload.
///
/// A pattern matches either an entry's file name or its path relative to the
/// source root (forward slashes). Root patterns match the relative path only.
/// Excluded directories are not descended into.
#[derive(Clone, Debug)]
pub struct ExcludeFilter {
    patterns: Vec<Pattern>,
    root_patterns: Vec<Pattern>,
    skipped_dirs: Vec<PathBuf>,
}

impl ExcludeFilter {
    /// Filter for `profile` plus user-supplied patterns.
    pub fn new(profile: PayloadProfile, extra: &[String]) -> Result<Self> {
        let mut raw: Vec<&str> = COMMON_EXCLUDES.to_vec();
        if profile == PayloadProfile::Light {
            raw.extend_from_slice(LIGHT_EXCLUDES);
        }
        raw.extend(extra.iter().map(String::as_str));

        let patterns = raw
            .into_iter()
            .map(Pattern::new)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let root_patterns = ROOT_EXCLUDES
            .iter()
            .copied()
            .map(Pattern::new)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            patterns,
            root_patterns,
            skipped_dirs: Vec::new(),
        })
    }

    /// Filter that keeps everything, for copying prepared trees such as a
    /// bundled interpreter.
    pub fn none() -> Self {
        Self {
            patterns: Vec::new(),
            root_patterns: Vec::new(),
            skipped_dirs: Vec::new(),
        }
    }

    /// Also skip an absolute directory, e.g. an output directory that lives
    /// inside the source tree under a custom name. Stored canonicalized so
    /// it compares equal to the walked paths.
    pub fn skip_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.skipped_dirs.push(std::fs::canonicalize(&dir).unwrap_or(dir));
        self
    }

    /// Whether the entry at `relative` (to the source root) is excluded.
    pub fn is_excluded(&self, relative: &Path) -> bool {
        let rel = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let name = relative
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        self.patterns
            .iter()
            .any(|p| p.matches(&name) || p.matches(&rel))
            || self.root_patterns.iter().any(|p| p.matches(&rel))
    }

    fn is_skipped_dir(&self, absolute: &Path) -> bool {
        self.skipped_dirs.iter().any(|d| absolute == d)
    }
}

/// What a payload copy produced.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PayloadStats {
    /// Regular files copied.
    pub files: usize,
    /// Bytes copied.
    pub bytes: u64,
}

/// Scratch layout for one job: `<workspace>/staging/<target-id>-<timestamp>`.
#[derive(Debug)]
pub struct StagingTree {
    root: PathBuf,
    target: BuildTarget,
}

impl StagingTree {
    /// Create an empty staging tree for `target`. Leftovers from an earlier
    /// job with the same name are erased.
    pub async fn create(ctx: &BuildContext, target: BuildTarget) -> Result<Self> {
        let root = ctx
            .staging_root()
            .join(format!("{}-{}", target.id(), ctx.timestamp()));
        fs::create_dir_all(&root, true)
            .await
            .map_err(|e| Error::Staging(format!("cannot create staging tree: {e}")))?;
        log::debug!("Staging {} in {}", target, root.display());
        Ok(Self { root, target })
    }

    /// Root of the tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Target this tree belongs to.
    pub fn target(&self) -> BuildTarget {
        self.target
    }

    /// Path inside the tree.
    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Create a directory inside the tree.
    pub async fn create_dir(&self, relative: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = self.join(relative);
        fs::create_dir_all(&dir, false).await?;
        Ok(dir)
    }

    /// Write a regular file inside the tree.
    pub async fn write_file(
        &self,
        relative: impl AsRef<Path>,
        contents: impl AsRef<[u8]>,
    ) -> Result<PathBuf> {
        let path = self.join(relative);
        fs::write_file(&path, contents).await?;
        Ok(path)
    }

    /// Write an executable file inside the tree.
    pub async fn write_executable(
        &self,
        relative: impl AsRef<Path>,
        contents: impl AsRef<[u8]>,
    ) -> Result<PathBuf> {
        let path = self.join(relative);
        fs::write_executable(&path, contents).await?;
        Ok(path)
    }

    /// Copy `source` into `dest` (relative to the tree) through `filter`.
    ///
    /// # Errors
    ///
    /// [`Error::Staging`] when the source is missing or nothing was copied.
    pub async fn copy_payload(
        &self,
        source: &Path,
        dest: impl AsRef<Path>,
        filter: &ExcludeFilter,
    ) -> Result<PayloadStats> {
        if !source.is_dir() {
            return Err(Error::Staging(format!(
                "source directory {} does not exist",
                source.display()
            )));
        }

        let source = source.to_path_buf();
        let dest = self.join(dest);
        let filter = filter.clone();

        let stats = tokio::task::spawn_blocking(move || copy_filtered(&source, &dest, &filter))
            .await
            .map_err(|e| Error::GenericError(format!("payload copy task panicked: {e}")))??;

        if stats.files == 0 {
            return Err(Error::Staging(
                "payload copy produced no files; check the exclude patterns".to_string(),
            ));
        }

        log::info!(
            "Staged {} payload files ({} bytes) for {}",
            stats.files,
            stats.bytes,
            self.target
        );
        Ok(stats)
    }

    /// Remove the tree.
    pub async fn cleanup(self) -> Result<()> {
        log::debug!("Removing staging tree {}", self.root.display());
        fs::remove_dir_all(&self.root).await
    }
}

fn copy_filtered(source: &Path, dest: &Path, filter: &ExcludeFilter) -> Result<PayloadStats> {
    std::fs::create_dir_all(dest)?;
    let mut stats = PayloadStats::default();

    // Walked paths must line up with the canonical skipped directories.
    let source = std::fs::canonicalize(source)?;
    let source = source.as_path();
    let walker = walkdir::WalkDir::new(source)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            if entry.file_type().is_dir() && filter.is_skipped_dir(entry.path()) {
                return false;
            }
            match entry.path().strip_prefix(source) {
                Ok(rel) => !filter.is_excluded(rel),
                Err(_) => false,
            }
        });

    for entry in walker {
        let entry = entry?;
        let rel = entry.path().strip_prefix(source)?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let target = dest.join(rel);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_symlink() {
            // Dangling or external links are not shipped; resolved files are.
            match std::fs::metadata(entry.path()) {
                Ok(meta) if meta.is_file() => {
                    stats.bytes += std::fs::copy(entry.path(), &target)?;
                    stats.files += 1;
                }
                _ => log::debug!("Skipping link {}", entry.path().display()),
            }
        } else {
            stats.bytes += std::fs::copy(entry.path(), &target)?;
            stats.files += 1;
        }
    }

    Ok(stats)
}

/// The configured entry point, which must exist before anything is staged.
pub fn require_entry_point(ctx: &BuildContext) -> Result<PathBuf> {
    let entry = ctx.settings().entry_point_path();
    if entry.is_file() {
        Ok(entry)
    } else {
        Err(Error::Staging(format!(
            "entry point {} not found in the source tree",
            entry.display()
        )))
    }
}

/// Filter for a target's payload, honoring configured extras and keeping the
/// output directory and workspace out of the copy.
pub fn payload_filter(ctx: &BuildContext, profile: PayloadProfile) -> Result<ExcludeFilter> {
    Ok(
        ExcludeFilter::new(profile, &ctx.settings().bundle_settings().exclude)?
            .skip_dir(ctx.output_dir())
            .skip_dir(ctx.workspace().root()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_profile_drops_weights_and_docs() {
        let filter = ExcludeFilter::new(PayloadProfile::Light, &[]).unwrap();
        assert!(filter.is_excluded(Path::new("models/htdemucs.th")));
        assert!(filter.is_excluded(Path::new("weights/vocals.pth")));
        assert!(filter.is_excluded(Path::new("README.md")));
        assert!(filter.is_excluded(Path::new("docs")));
        assert!(!filter.is_excluded(Path::new("gui_data/gui_modern_extractor.py")));
    }

    #[test]
    fn complete_profile_keeps_weights_but_not_caches() {
        let filter = ExcludeFilter::new(PayloadProfile::Complete, &[]).unwrap();
        assert!(!filter.is_excluded(Path::new("models/htdemucs.th")));
        assert!(!filter.is_excluded(Path::new("README.md")));
        assert!(filter.is_excluded(Path::new("gui_data/__pycache__")));
        assert!(filter.is_excluded(Path::new(".git")));
    }

    #[test]
    fn extra_patterns_match_relative_paths() {
        let filter =
            ExcludeFilter::new(PayloadProfile::Complete, &["scratch/**".to_string()]).unwrap();
        assert!(filter.is_excluded(Path::new("scratch/take1.wav")));
        assert!(!filter.is_excluded(Path::new("gui_data/scratch.py")));
    }

    #[test]
    fn build_output_names_are_only_excluded_at_the_root() {
        let filter = ExcludeFilter::new(PayloadProfile::Complete, &[]).unwrap();
        assert!(filter.is_excluded(Path::new("build")));
        assert!(filter.is_excluded(Path::new("dist")));
        assert!(filter.is_excluded(Path::new("env")));
        assert!(!filter.is_excluded(Path::new("lib/build")));
        assert!(!filter.is_excluded(Path::new("lib/build/x.py")));
        assert!(!filter.is_excluded(Path::new("gui_data/staging/queue.py")));
        assert!(!filter.is_excluded(Path::new("separate/env")));
        assert!(filter.is_excluded(Path::new("gui_data/venv")));
    }

    #[test]
    fn skipped_dirs_compare_after_normalization() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        std::fs::create_dir_all(&out).unwrap();
        let filter = ExcludeFilter::none().skip_dir(dir.path().join("out/../out"));
        assert!(filter.is_skipped_dir(&std::fs::canonicalize(&out).unwrap()));
    }

    #[test]
    fn invalid_extra_pattern_is_rejected() {
        assert!(ExcludeFilter::new(PayloadProfile::Light, &["[".to_string()]).is_err());
    }
}
