//! Download strategies.
//!
//! Strategies are tried in order and the first one that leaves a non-empty
//! file wins. Every attempt writes to `<name>.part` and only a finished
//! download is renamed into place.

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    probe::command_exists,
};
use std::{
    future::Future,
    path::{Path, PathBuf},
    pin::Pin,
};
use tokio::io::AsyncWriteExt;

/// Future returned by [`Downloader::fetch`].
pub type DownloadFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// One way of fetching a URL to a local file.
pub trait Downloader: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Whether the strategy can run on this host.
    fn available(&self) -> bool {
        true
    }

    /// Fetch `url` into `dest`, overwriting it.
    fn fetch<'a>(&'a self, url: &'a str, dest: &'a Path) -> DownloadFuture<'a>;
}

/// In-process HTTP client.
pub struct ReqwestDownloader {
    client: reqwest::Client,
}

impl ReqwestDownloader {
    /// Client with a descriptive user agent.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl Downloader for ReqwestDownloader {
    fn name(&self) -> &'static str {
        "reqwest"
    }

    fn fetch<'a>(&'a self, url: &'a str, dest: &'a Path) -> DownloadFuture<'a> {
        Box::pin(async move {
            let mut response = self.client.get(url).send().await?.error_for_status()?;
            let mut file = tokio::fs::File::create(dest)
                .await
                .fs_context("creating download file", dest)?;
            while let Some(chunk) = response.chunk().await? {
                file.write_all(&chunk)
                    .await
                    .fs_context("writing download file", dest)?;
            }
            file.flush().await.fs_context("flushing download file", dest)?;
            Ok(())
        })
    }
}

/// The `curl` command.
pub struct CurlDownloader;

impl Downloader for CurlDownloader {
    fn name(&self) -> &'static str {
        "curl"
    }

    fn available(&self) -> bool {
        command_exists("curl")
    }

    fn fetch<'a>(&'a self, url: &'a str, dest: &'a Path) -> DownloadFuture<'a> {
        Box::pin(async move {
            let mut cmd = tokio::process::Command::new("curl");
            cmd.args(["--fail", "--location", "--silent", "--show-error", "--retry", "2", "--output"])
                .arg(dest)
                .arg(url);
            run_download_command(cmd, "curl").await
        })
    }
}

/// The `wget` command.
pub struct WgetDownloader;

impl Downloader for WgetDownloader {
    fn name(&self) -> &'static str {
        "wget"
    }

    fn available(&self) -> bool {
        command_exists("wget")
    }

    fn fetch<'a>(&'a self, url: &'a str, dest: &'a Path) -> DownloadFuture<'a> {
        Box::pin(async move {
            let mut cmd = tokio::process::Command::new("wget");
            cmd.args(["--quiet", "--tries=2", "-O"]).arg(dest).arg(url);
            run_download_command(cmd, "wget").await
        })
    }
}

async fn run_download_command(mut cmd: tokio::process::Command, name: &str) -> Result<()> {
    let output = cmd
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|error| Error::CommandFailed {
            command: name.to_string(),
            error,
        })?;
    if !output.status.success() {
        return Err(Error::GenericError(format!(
            "{} exited with {:?}: {}",
            name,
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

/// `reqwest`, then `curl`, then `wget`.
pub fn default_strategies() -> Vec<Box<dyn Downloader>> {
    let mut strategies: Vec<Box<dyn Downloader>> = Vec::new();
    match ReqwestDownloader::new() {
        Ok(downloader) => strategies.push(Box::new(downloader)),
        Err(e) => log::warn!("HTTP client unavailable, falling back to external tools: {}", e),
    }
    strategies.push(Box::new(CurlDownloader));
    strategies.push(Box::new(WgetDownloader));
    strategies
}

/// Partial-download path for `dest`.
pub fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

/// Download `url` to `dest` with the first strategy that works.
pub async fn download_with(
    strategies: &[Box<dyn Downloader>],
    url: &str,
    dest: &Path,
) -> Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .fs_context("creating download directory", parent)?;
    }

    let part = part_path(dest);
    let mut failures = Vec::new();

    for strategy in strategies {
        if !strategy.available() {
            log::debug!("Download strategy {} not available, skipping", strategy.name());
            continue;
        }

        log::info!("Downloading {} (via {})", url, strategy.name());
        let _ = tokio::fs::remove_file(&part).await;

        let outcome = match strategy.fetch(url, &part).await {
            Ok(()) => match tokio::fs::metadata(&part).await {
                Ok(meta) if meta.len() > 0 => Ok(()),
                Ok(_) => Err("downloaded file is empty".to_string()),
                Err(e) => Err(format!("download produced no file: {e}")),
            },
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(()) => {
                tokio::fs::rename(&part, dest)
                    .await
                    .fs_context("moving finished download into place", dest)?;
                return Ok(());
            }
            Err(reason) => {
                log::warn!("Download via {} failed: {}", strategy.name(), reason);
                failures.push(format!("{}: {}", strategy.name(), reason));
            }
        }
    }

    let _ = tokio::fs::remove_file(&part).await;
    if failures.is_empty() {
        failures.push("no download strategy available".to_string());
    }
    Err(Error::GenericError(format!(
        "could not download {}: {}",
        url,
        failures.join("; ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl Downloader for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn fetch<'a>(&'a self, _url: &'a str, dest: &'a Path) -> DownloadFuture<'a> {
            Box::pin(async move {
                tokio::fs::write(dest, b"half").await?;
                Err(Error::GenericError("connection reset".into()))
            })
        }
    }

    struct Working;

    impl Downloader for Working {
        fn name(&self) -> &'static str {
            "working"
        }

        fn fetch<'a>(&'a self, _url: &'a str, dest: &'a Path) -> DownloadFuture<'a> {
            Box::pin(async move {
                tokio::fs::write(dest, b"complete").await?;
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn falls_through_to_next_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("tool");
        let strategies: Vec<Box<dyn Downloader>> = vec![Box::new(Broken), Box::new(Working)];

        download_with(&strategies, "https://example.invalid/tool", &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"complete");
        assert!(!part_path(&dest).exists());
    }

    #[tokio::test]
    async fn failed_download_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("tool");
        let strategies: Vec<Box<dyn Downloader>> = vec![Box::new(Broken)];

        let err = download_with(&strategies, "https://example.invalid/tool", &dest)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("connection reset"));
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }
}
