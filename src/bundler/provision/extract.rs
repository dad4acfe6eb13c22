//! Unpacking of self-extracting bundles and zip archives.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::path::Path;

/// Argument lists tried in order to unpack an AppImage without FUSE.
const EXTRACT_METHODS: [&[&str]; 2] = [&["--appimage-extract"], &["--appimage-extract", "*"]];

/// Unpack an AppImage-style bundle into `dest`.
///
/// The bundle writes `squashfs-root/` into its working directory; that tree
/// becomes `dest` once its `AppRun` exists.
pub async fn extract_bundle(bundle: &Path, dest: &Path) -> Result<()> {
    let work_dir = dest.with_extension("extracting");
    let mut failures = Vec::new();

    for args in EXTRACT_METHODS {
        crate::bundler::utils::fs::create_dir_all(&work_dir, true).await?;
        log::info!("Extracting {} ({})", bundle.display(), args.join(" "));

        let result = tokio::process::Command::new(bundle)
            .args(args)
            .current_dir(&work_dir)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        let squashfs_root = work_dir.join("squashfs-root");
        match result {
            Ok(output) if output.status.success() && squashfs_root.join("AppRun").exists() => {
                crate::bundler::utils::fs::remove_dir_all(dest).await?;
                tokio::fs::rename(&squashfs_root, dest)
                    .await
                    .fs_context("moving extracted bundle into place", dest)?;
                crate::bundler::utils::fs::remove_dir_all(&work_dir).await?;
                return Ok(());
            }
            Ok(output) => {
                let reason = format!(
                    "`{}` exited with {:?} without producing squashfs-root/AppRun",
                    args.join(" "),
                    output.status.code()
                );
                log::warn!("{}", reason);
                failures.push(reason);
            }
            Err(e) => {
                let reason = format!("`{}` could not run: {}", args.join(" "), e);
                log::warn!("{}", reason);
                failures.push(reason);
            }
        }
    }

    crate::bundler::utils::fs::remove_dir_all(&work_dir).await?;
    Err(Error::GenericError(failures.join("; ")))
}

/// Unpack a zip archive into `dest`.
pub async fn extract_zip(archive: &Path, dest: &Path) -> Result<()> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let file = std::fs::File::open(&archive).fs_context("opening zip archive", &archive)?;
        let mut zip = zip::ZipArchive::new(file)?;
        std::fs::create_dir_all(&dest).fs_context("creating extraction directory", &dest)?;
        log::info!(
            "Extracting {} entries from {}",
            zip.len(),
            archive.display()
        );
        zip.extract(&dest)?;
        Ok(())
    })
    .await
    .map_err(|e| Error::GenericError(format!("zip extraction task panicked: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn zip_entries_land_under_dest() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("python-embed.zip");
        {
            let file = std::fs::File::create(&archive).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("python.exe", options).unwrap();
            zip.write_all(b"MZ").unwrap();
            zip.start_file("Lib/site.py", options).unwrap();
            zip.write_all(b"# site").unwrap();
            zip.finish().unwrap();
        }

        let dest = dir.path().join("runtime");
        extract_zip(&archive, &dest).await.unwrap();
        assert!(dest.join("python.exe").is_file());
        assert!(dest.join("Lib/site.py").is_file());
    }
}
