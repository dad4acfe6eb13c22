//! Payload copies into per-target staging trees.

use std::{fs, path::Path};
use stemweaver_bundler::bundler::{
    BuildContext, BuildLog, BuildTarget, Error, PackageSettings, PayloadProfile,
    SettingsBuilder, StagingTree, TargetDriver, WorkspaceResolver, staging::payload_filter,
};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn context(dir: &TempDir) -> BuildContext {
    let scratch = dir.path().join("scratch");
    context_with_workspace(dir, WorkspaceResolver::with_candidates(vec![scratch]))
}

fn context_with_workspace(dir: &TempDir, resolver: WorkspaceResolver) -> BuildContext {
    let source = dir.path().join("src");
    let settings = SettingsBuilder::new()
        .source_dir(&source)
        .package_settings(PackageSettings {
            version: "1.1".into(),
            ..Default::default()
        })
        .build()
        .unwrap();
    let workspace = resolver.resolve().unwrap();
    workspace.create_layout().unwrap();
    BuildContext::new(settings, workspace)
        .with_tools_dir(dir.path().join("tools"))
        .with_timestamp("20250101-120000")
}

fn source_tree(root: &Path) {
    write(root, "gui_data/gui_modern_extractor.py", "print('StemWeaver')\n");
    write(root, "gui_data/img/app_icon.png", "png");
    write(root, "models/htdemucs.th", "weights");
    write(root, "weights/vocals.pth", "weights");
    write(root, "README.md", "# StemWeaver\n");
    write(root, "gui_data/__pycache__/gui.cpython-311.pyc", "bytecode");
    write(root, ".git/HEAD", "ref: refs/heads/main\n");
    write(root, "dist/stemweaver_1.0_all.deb", "old package");
}

#[tokio::test]
async fn light_payload_drops_models_and_docs() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir);
    source_tree(ctx.source_dir());

    let tree = StagingTree::create(&ctx, BuildTarget::Deb).await.unwrap();
    assert!(tree.root().ends_with("deb-20250101-120000"));
    let filter = payload_filter(&ctx, PayloadProfile::Light).unwrap();
    let stats = tree
        .copy_payload(ctx.source_dir(), "payload", &filter)
        .await
        .unwrap();

    let payload = tree.join("payload");
    assert!(payload.join("gui_data/gui_modern_extractor.py").is_file());
    assert!(payload.join("gui_data/img/app_icon.png").is_file());
    assert!(!payload.join("models").exists());
    assert!(!payload.join("weights/vocals.pth").exists());
    assert!(!payload.join("README.md").exists());
    assert!(!payload.join("gui_data/__pycache__").exists());
    assert!(!payload.join(".git").exists());
    assert!(!payload.join("dist").exists());
    assert_eq!(stats.files, 2);
}

#[tokio::test]
async fn complete_payload_keeps_models() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir);
    source_tree(ctx.source_dir());

    let tree = StagingTree::create(&ctx, BuildTarget::AppImageX86_64)
        .await
        .unwrap();
    let filter = payload_filter(&ctx, PayloadProfile::Complete).unwrap();
    tree.copy_payload(ctx.source_dir(), "app", &filter)
        .await
        .unwrap();

    assert!(tree.join("app/models/htdemucs.th").is_file());
    assert!(tree.join("app/README.md").is_file());
    assert!(!tree.join("app/gui_data/__pycache__").exists());
}

#[tokio::test]
async fn empty_payload_is_a_staging_failure() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir);
    write(ctx.source_dir(), "README.md", "docs only");
    write(ctx.source_dir(), "models/a.pth", "weights");

    let tree = StagingTree::create(&ctx, BuildTarget::Rpm).await.unwrap();
    let filter = payload_filter(&ctx, PayloadProfile::Light).unwrap();
    let err = tree
        .copy_payload(ctx.source_dir(), "payload", &filter)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Staging(_)));
}

#[tokio::test]
async fn recreating_a_tree_erases_leftovers() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir);

    let tree = StagingTree::create(&ctx, BuildTarget::Deb).await.unwrap();
    tree.write_file("stale.txt", "old").await.unwrap();

    let again = StagingTree::create(&ctx, BuildTarget::Deb).await.unwrap();
    assert_eq!(again.root(), tree.root());
    assert!(!again.join("stale.txt").exists());

    let root = again.root().to_path_buf();
    again.cleanup().await.unwrap();
    assert!(!root.exists());
}

#[tokio::test]
async fn scratch_dir_inside_the_source_stays_out_of_the_payload() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("src");
    source_tree(&source);
    // Pinned through a path that is not normalized.
    let pinned = source.join("gui_data/../.scratch");
    let ctx = context_with_workspace(
        &dir,
        WorkspaceResolver::with_candidates(Vec::new()).with_override(Some(pinned)),
    );
    assert_eq!(ctx.workspace().root(), source.join(".scratch"));
    write(&ctx.logs_dir(), "deb-20240101-000000.log", "old run\n");

    let tree = StagingTree::create(&ctx, BuildTarget::Deb).await.unwrap();
    let filter = payload_filter(&ctx, PayloadProfile::Light).unwrap();
    let stats = tree
        .copy_payload(ctx.source_dir(), "payload", &filter)
        .await
        .unwrap();

    assert!(!tree.join("payload/.scratch").exists());
    assert!(tree.join("payload/gui_data/gui_modern_extractor.py").is_file());
    assert_eq!(stats.files, 2);
}

#[tokio::test]
async fn nested_build_directories_are_application_code() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir);
    source_tree(ctx.source_dir());
    write(ctx.source_dir(), "lib/build/graph.py", "GRAPH = {}\n");
    write(ctx.source_dir(), "build/lib/stale.py", "old\n");

    let tree = StagingTree::create(&ctx, BuildTarget::Deb).await.unwrap();
    let filter = payload_filter(&ctx, PayloadProfile::Light).unwrap();
    tree.copy_payload(ctx.source_dir(), "payload", &filter)
        .await
        .unwrap();

    assert!(tree.join("payload/lib/build/graph.py").is_file());
    assert!(!tree.join("payload/build").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn appimage_manifest_reads_back() {
    use stemweaver_bundler::bundler::platform::linux::appimage::{
        AppImageDriver, BUNDLE_MANIFEST, BundleManifest,
    };

    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir);
    source_tree(ctx.source_dir());
    let target = BuildTarget::AppImageAArch64;

    let tree = StagingTree::create(&ctx, target).await.unwrap();
    let mut log = BuildLog::create(&ctx.logs_dir(), target, ctx.timestamp())
        .await
        .unwrap();
    AppImageDriver::new(target)
        .stage(&ctx, &tree, &mut log)
        .await
        .unwrap();

    let app_dir = tree.join(format!("{}.AppDir", ctx.settings().product_name()));
    let bytes = fs::read(app_dir.join(BUNDLE_MANIFEST)).unwrap();
    let manifest: BundleManifest = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(manifest.profile, PayloadProfile::Light);
    assert_eq!(manifest.arch, "aarch64");
    assert!(
        manifest
            .entry_point
            .ends_with("gui_data/gui_modern_extractor.py")
    );
    assert!(app_dir.join(&manifest.entry_point).is_file());
    assert!(!manifest.bundled_runtime);
}
