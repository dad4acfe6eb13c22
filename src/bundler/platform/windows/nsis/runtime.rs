//! Embedded Python runtime for the Windows installer.
//!
//! The embeddable distribution ships a `python3XX._pth` file that pins
//! `sys.path`. It is rewritten so the installed payload (one level above
//! `runtime\`) is importable and `site` is enabled for pip installs.

use crate::bundler::{
    error::{ErrorExt, Result},
    provision::ProvisionedTool,
    staging::{ExcludeFilter, PayloadStats, StagingTree},
};
use std::path::Path;

/// Copy the unpacked runtime into `<dest>` inside the tree and patch its
/// `._pth` files.
pub async fn stage_runtime(
    tool: &ProvisionedTool,
    tree: &StagingTree,
    dest: &Path,
) -> Result<PayloadStats> {
    let source = tool
        .unpacked
        .as_deref()
        .unwrap_or_else(|| tool.download.as_path());
    let stats = tree.copy_payload(source, dest, &ExcludeFilter::none()).await?;

    let runtime_dir = tree.join(dest);
    let mut entries = tokio::fs::read_dir(&runtime_dir)
        .await
        .fs_context("listing runtime directory", &runtime_dir)?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .fs_context("listing runtime directory", &runtime_dir)?
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("_pth") {
            let original = tokio::fs::read_to_string(&path)
                .await
                .fs_context("reading path configuration", &path)?;
            tokio::fs::write(&path, patch_pth(&original))
                .await
                .fs_context("writing path configuration", &path)?;
            log::debug!("Patched {}", path.display());
        }
    }

    Ok(stats)
}

/// Keep existing entries, add the parent directory and enable `site`.
pub fn patch_pth(original: &str) -> String {
    let mut lines: Vec<String> = original
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && *l != "import site" && *l != "#import site")
        .map(str::to_string)
        .collect();
    if !lines.iter().any(|l| l == "..") {
        lines.push("..".to_string());
    }
    lines.push("import site".to_string());
    let mut text = lines.join("\r\n");
    text.push_str("\r\n");
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pth_gains_parent_and_site() {
        let patched = patch_pth("python311.zip\r\n.\r\n\r\n# Uncomment to run site.main() automatically\r\n#import site\r\n");
        let lines: Vec<_> = patched.lines().collect();
        assert_eq!(
            lines,
            vec![
                "python311.zip",
                ".",
                "# Uncomment to run site.main() automatically",
                "..",
                "import site"
            ]
        );
    }
}
