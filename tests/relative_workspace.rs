//! A relative scratch override resolved from inside the source tree.
//!
//! Kept in its own test binary because it changes the process working
//! directory.

use std::{fs, path::PathBuf};
use stemweaver_bundler::bundler::{
    BuildContext, BuildTarget, PackageSettings, PayloadProfile, SettingsBuilder, StagingTree,
    WorkspaceResolver, staging::payload_filter,
};

#[tokio::test]
async fn relative_override_is_anchored_and_excluded() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("src");
    fs::create_dir_all(source.join("gui_data")).unwrap();
    fs::write(source.join("gui_data/gui_modern_extractor.py"), "print(1)\n").unwrap();
    std::env::set_current_dir(&source).unwrap();

    let workspace = WorkspaceResolver::with_candidates(Vec::new())
        .with_override(Some(PathBuf::from(".scratch")))
        .resolve()
        .unwrap();
    assert!(workspace.root().is_absolute());
    assert!(workspace.root().ends_with(".scratch"));
    workspace.create_layout().unwrap();
    fs::write(workspace.logs_dir().join("deb-20240101-000000.log"), "old\n").unwrap();

    let settings = SettingsBuilder::new()
        .source_dir(&source)
        .package_settings(PackageSettings {
            version: "1.1".into(),
            ..Default::default()
        })
        .build()
        .unwrap();
    let ctx = BuildContext::new(settings, workspace).with_timestamp("20250101-120000");

    let tree = StagingTree::create(&ctx, BuildTarget::Deb).await.unwrap();
    assert!(tree.root().is_absolute());
    let filter = payload_filter(&ctx, PayloadProfile::Light).unwrap();
    let stats = tree
        .copy_payload(ctx.source_dir(), "payload", &filter)
        .await
        .unwrap();

    assert!(!tree.join("payload/.scratch").exists());
    assert_eq!(stats.files, 1);
}
