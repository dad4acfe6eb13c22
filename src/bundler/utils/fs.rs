//! File system utilities for bundling.
//!
//! Idempotent directory helpers plus the write/permission primitives used by
//! staging and artifact verification.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::{io, path::Path};
use tokio::fs;

/// Creates all of the directories of the specified path, erasing it first if specified.
pub async fn create_dir_all(path: &Path, erase: bool) -> Result<()> {
    if erase {
        remove_dir_all(path).await?;
    }

    fs::create_dir_all(path)
        .await
        .fs_context("creating directory", path)
}

/// Removes the directory and its contents if it exists.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Fs {
            context: "removing directory",
            path: path.to_path_buf(),
            error: e,
        }),
    }
}

/// Writes `contents` to `path`, creating any parent directories as needed.
pub async fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .fs_context("creating parent directory", parent)?;
    }
    fs::write(path, contents).await.fs_context("writing file", path)
}

/// Copies a regular file from one path to another, creating any parent
/// directories of the destination path as necessary.
///
/// Fails if the source path is a directory or doesn't exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.is_file() {
        return Err(Error::GenericError(format!(
            "{} does not exist or is not a file",
            from.display()
        )));
    }
    if let Some(dest_dir) = to.parent() {
        fs::create_dir_all(dest_dir)
            .await
            .fs_context("creating parent directory", dest_dir)?;
    }
    fs::copy(from, to).await.fs_context("copying file to", to)?;
    Ok(())
}

/// Sets unix permission bits. No-op elsewhere.
#[cfg(unix)]
pub async fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .fs_context("setting permissions on", path)
}

/// Sets unix permission bits. No-op elsewhere.
#[cfg(not(unix))]
pub async fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Writes an executable script (mode 0755).
pub async fn write_executable(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    write_file(path, contents).await?;
    set_mode(path, 0o755).await
}

/// Makes a relative symbolic link. Falls back to a copy where links are
/// unsupported.
pub async fn symlink_file(target: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        if fs::symlink_metadata(link).await.is_ok() {
            fs::remove_file(link)
                .await
                .fs_context("replacing existing link", link)?;
        }
        fs::symlink(target, link)
            .await
            .fs_context("creating symlink", link)
    }
    #[cfg(not(unix))]
    {
        let source = link.parent().map(|p| p.join(target)).unwrap_or_else(|| target.to_path_buf());
        copy_file(&source, link).await
    }
}
