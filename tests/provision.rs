//! Tool provisioning against a fake download strategy.

use std::{
    io::Write,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use stemweaver_bundler::bundler::{
    Error,
    provision::{
        MANIFEST_FILE, Provisioner, ToolBinary, ToolInvocation, ToolKind,
        download::{DownloadFuture, Downloader},
    },
};

/// Serves fixed bytes and counts fetches.
struct Counting {
    body: Vec<u8>,
    fetches: Arc<AtomicUsize>,
}

impl Downloader for Counting {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn fetch<'a>(&'a self, _url: &'a str, dest: &'a Path) -> DownloadFuture<'a> {
        Box::pin(async move {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            tokio::fs::write(dest, &self.body).await?;
            Ok(())
        })
    }
}

fn provisioner(tools: &Path, body: Vec<u8>) -> (Provisioner, Arc<AtomicUsize>) {
    let fetches = Arc::new(AtomicUsize::new(0));
    let downloader = Counting {
        body,
        fetches: Arc::clone(&fetches),
    };
    (
        Provisioner::with_downloaders(tools, vec![Box::new(downloader)]),
        fetches,
    )
}

fn plain_tool() -> ToolBinary {
    ToolBinary::new(
        "fake-tool",
        "https://downloads.example.invalid/tools/fake-tool",
        ToolKind::Plain,
    )
}

#[tokio::test]
async fn second_provision_uses_the_cache() {
    let dir = tempfile::tempdir().unwrap();
    let (provisioner, fetches) = provisioner(dir.path(), b"#!/bin/sh\necho tool\n".to_vec());

    let first = provisioner.provision(&plain_tool()).await.unwrap();
    let second = provisioner.provision(&plain_tool()).await.unwrap();

    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert_eq!(first.download, second.download);
    assert_eq!(first.invocation, second.invocation);
    assert_eq!(
        first.invocation,
        ToolInvocation::Direct(dir.path().join("fake-tool"))
    );
    assert!(dir.path().join(MANIFEST_FILE).is_file());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&first.download).unwrap().permissions().mode();
        assert_eq!(mode & 0o755, 0o755);
    }
}

#[tokio::test]
async fn tampered_cache_is_downloaded_again() {
    let dir = tempfile::tempdir().unwrap();
    let (provisioner, fetches) = provisioner(dir.path(), b"original tool".to_vec());

    let tool = provisioner.provision(&plain_tool()).await.unwrap();
    std::fs::write(&tool.download, b"corrupted bits").unwrap();

    provisioner.provision(&plain_tool()).await.unwrap();
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
    assert_eq!(std::fs::read(&tool.download).unwrap(), b"original tool");
}

#[tokio::test]
async fn pinned_checksum_mismatch_is_a_provision_failure() {
    let dir = tempfile::tempdir().unwrap();
    let (provisioner, _) = provisioner(dir.path(), b"something else".to_vec());
    let tool = plain_tool().with_sha256(Some("00".repeat(32)));

    let err = provisioner.provision(&tool).await.unwrap_err();
    match err {
        Error::Provision { tool, reason } => {
            assert_eq!(tool, "fake-tool");
            assert!(reason.contains("checksum mismatch"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join("fake-tool").exists());
}

fn zip_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buffer);
        let options = zip::write::SimpleFileOptions::default();
        for (name, body) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(body).unwrap();
        }
        zip.finish().unwrap();
    }
    buffer.into_inner()
}

fn runtime_archive() -> ToolBinary {
    ToolBinary::new(
        "python-embed",
        "https://downloads.example.invalid/python-3.11.9-embed-amd64.zip",
        ToolKind::ZipArchive {
            marker: "python.exe".to_string(),
        },
    )
}

#[tokio::test]
async fn archives_are_unpacked_once() {
    let dir = tempfile::tempdir().unwrap();
    let body = zip_with(&[("python.exe", b"MZ"), ("python311._pth", b"python311.zip\r\n.\r\n")]);
    let (provisioner, fetches) = provisioner(dir.path(), body);

    let first = provisioner.provision(&runtime_archive()).await.unwrap();
    let unpacked = first.unpacked.clone().unwrap();
    assert!(unpacked.join("python.exe").is_file());
    assert!(unpacked.join("python311._pth").is_file());

    let second = provisioner.provision(&runtime_archive()).await.unwrap();
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert_eq!(second.unpacked, Some(unpacked));
}

#[tokio::test]
async fn archive_without_marker_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let body = zip_with(&[("README.txt", b"not python")]);
    let (provisioner, _) = provisioner(dir.path(), body);

    let err = provisioner.provision(&runtime_archive()).await.unwrap_err();
    assert!(matches!(err, Error::Provision { .. }));
    assert!(err.to_string().contains("python.exe"));
}

#[cfg(unix)]
fn bundled_tool() -> ToolBinary {
    ToolBinary::new(
        "fake-appimagetool",
        "https://downloads.example.invalid/tools/fake-appimagetool-x86_64.AppImage",
        ToolKind::SelfExtracting,
    )
}

#[cfg(unix)]
#[tokio::test]
async fn extraction_retries_with_the_wildcard_form() {
    let dir = tempfile::tempdir().unwrap();
    // Only `--appimage-extract '*'` unpacks this bundle.
    let script = "#!/bin/sh\n\
        [ \"$1\" = \"--appimage-extract\" ] && [ \"$2\" = \"*\" ] || exit 1\n\
        mkdir -p squashfs-root && printf '#!/bin/sh\\n' > squashfs-root/AppRun\n";
    let (provisioner, fetches) = provisioner(dir.path(), script.as_bytes().to_vec());

    let tool = provisioner.provision(&bundled_tool()).await.unwrap();
    let unpacked = tool.unpacked.clone().unwrap();
    assert_eq!(tool.invocation, ToolInvocation::Direct(unpacked.join("AppRun")));
    assert!(unpacked.join("AppRun").is_file());
    assert!(
        !dir.path()
            .join("fake-appimagetool-x86_64-extracted.extracting")
            .exists()
    );

    let again = provisioner.provision(&bundled_tool()).await.unwrap();
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert_eq!(again.invocation, tool.invocation);
}

#[cfg(unix)]
#[tokio::test]
async fn unextractable_bundle_runs_through_extract_and_run() {
    let dir = tempfile::tempdir().unwrap();
    let (provisioner, _) = provisioner(dir.path(), b"#!/bin/sh\nexit 1\n".to_vec());

    let tool = provisioner.provision(&bundled_tool()).await.unwrap();
    assert_eq!(tool.unpacked, None);
    assert_eq!(
        tool.invocation,
        ToolInvocation::ExtractAndRun(tool.download.clone())
    );

    let command = tool.invocation.command();
    let args: Vec<_> = command.as_std().get_args().collect();
    assert_eq!(args, ["--appimage-extract-and-run"]);
    assert_eq!(command.as_std().get_program(), tool.download.as_os_str());
}
