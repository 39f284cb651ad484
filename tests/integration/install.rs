//! End-to-end install pipeline tests against an in-memory remote

use super::common::{collect_events, files_under, labels};
use component_install::di::mocks::MockRemote;
use component_install::package::{InstallEvent, Installer, TaskState};
use component_install::InstallErrorKind;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_install_writes_release_directory() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("components");
    let remote = MockRemote::new()
        .with_release("pkg/a", "1.0.0", "{}")
        .with_release("pkg/a", "1.0.5", r#"{"files":["index.js"]}"#)
        .with_release("pkg/a", "2.0.0", "{}")
        .with_file("pkg/a", "1.0.5", "index.js", "module.exports = 'a';");
    let installer = Installer::with_remote(Arc::new(remote), &root);

    let task = installer.install("pkg/a", "1.x");
    let events = collect_events(&task).await;

    let labels = labels(&events);
    assert_eq!(labels.len(), 4);
    assert_eq!(labels[0], "resolved(1.0.5)");
    let mut files = labels[1..3].to_vec();
    files.sort();
    assert_eq!(files, vec!["file(component.json)", "file(index.js)"]);
    assert_eq!(labels[3], "end");

    let release_dir = root.join("pkg/a/1.0.5");
    assert_eq!(files_under(&release_dir), vec!["component.json", "index.js"]);
    assert_eq!(
        std::fs::read_to_string(release_dir.join("index.js")).unwrap(),
        "module.exports = 'a';"
    );
    assert_eq!(
        std::fs::read_to_string(release_dir.join("component.json")).unwrap(),
        r#"{"files":["index.js"]}"#
    );
    assert_eq!(task.state(), TaskState::Completed);
}

#[tokio::test]
async fn test_unresolvable_range_emits_single_error() {
    let temp = TempDir::new().unwrap();
    let remote = MockRemote::new().with_release("pkg/a", "0.3.0", "{}");
    let installer = Installer::with_remote(Arc::new(remote), temp.path());

    let task = installer.install("pkg/a", "1.x");
    let events = collect_events(&task).await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        InstallEvent::Error(err) => {
            assert_eq!(err.kind, InstallErrorKind::Resolution);
            assert!(err.message.contains("pkg/a"));
            assert!(err.message.contains("1.x"));
        }
        other => panic!("expected error, got {:?}", other),
    }
    assert_eq!(files_under(temp.path()), Vec::<String>::new());
}

#[tokio::test]
async fn test_on_disk_files_match_manifest() {
    let temp = TempDir::new().unwrap();
    let manifest = r#"{
        "name": "widget",
        "scripts": ["index.js", "lib/util.js"],
        "styles": ["widget.css"],
        "templates": ["widget.html"],
        "json": ["data.json"],
        "fonts": ["icons.woff"],
        "images": ["logo.png"],
        "files": ["README.md"],
        "dependencies": {}
    }"#;
    let mut remote = MockRemote::new().with_release("ui/widget", "0.2.1", manifest);
    for file in [
        "index.js",
        "lib/util.js",
        "widget.css",
        "widget.html",
        "data.json",
        "icons.woff",
        "logo.png",
        "README.md",
    ] {
        remote = remote.with_file("ui/widget", "0.2.1", file, file);
    }
    let installer = Installer::with_remote(Arc::new(remote), temp.path());

    let task = installer.install("ui/widget", "~0.2.0");
    let events = collect_events(&task).await;

    // File events follow manifest order, manifest last
    let file_events: Vec<String> = labels(&events)
        .into_iter()
        .filter(|l| l.starts_with("file("))
        .collect();
    assert_eq!(
        file_events,
        vec![
            "file(index.js)",
            "file(lib/util.js)",
            "file(widget.css)",
            "file(widget.html)",
            "file(data.json)",
            "file(icons.woff)",
            "file(logo.png)",
            "file(README.md)",
            "file(component.json)",
        ]
    );

    let mut expected: Vec<String> = task.manifest().unwrap().transfer_list();
    expected.sort();
    assert_eq!(files_under(&temp.path().join("ui/widget/0.2.1")), expected);
}

#[tokio::test]
async fn test_duplicate_entries_are_transferred_twice() {
    let temp = TempDir::new().unwrap();
    let remote = MockRemote::new()
        .with_release("pkg/a", "1.0.0", r#"{"scripts":["a.js"],"files":["a.js"]}"#)
        .with_file("pkg/a", "1.0.0", "a.js", "a");
    let installer = Installer::with_remote(Arc::new(remote.clone()), temp.path());

    let task = installer.install("pkg/a", "*");
    let events = collect_events(&task).await;

    let file_events = labels(&events)
        .into_iter()
        .filter(|l| l == "file(a.js)")
        .count();
    assert_eq!(file_events, 2);
    assert_eq!(remote.open_count(), 3);
}

#[tokio::test]
async fn test_at_most_six_transfers_in_flight() {
    let temp = TempDir::new().unwrap();
    let files: Vec<String> = (0..30).map(|i| format!("asset-{}.png", i)).collect();
    let manifest = serde_json::json!({ "images": files }).to_string();
    let mut remote = MockRemote::new()
        .with_release("pkg/big", "1.0.0", &manifest)
        .with_open_delay(Duration::from_millis(15));
    for file in &files {
        remote = remote.with_file("pkg/big", "1.0.0", file, "png");
    }
    let installer = Installer::with_remote(Arc::new(remote.clone()), temp.path());

    let task = installer.install("pkg/big", "*");
    task.finished().await.unwrap();

    assert_eq!(remote.open_count(), 31);
    assert!(remote.peak_concurrent_opens() <= 6);
    assert_eq!(remote.peak_concurrent_opens(), 6);
}

#[tokio::test]
async fn test_two_installs_of_same_package_are_independent() {
    let temp = TempDir::new().unwrap();
    let remote = MockRemote::new()
        .with_release("pkg/a", "1.0.5", r#"{"files":["index.js"]}"#)
        .with_file("pkg/a", "1.0.5", "index.js", "x");
    let installer = Installer::with_remote(Arc::new(remote.clone()), temp.path());

    let first = installer.install("pkg/a", "1.x");
    let second = installer.install("pkg/a", "1.x");
    first.finished().await.unwrap();
    second.finished().await.unwrap();

    assert_eq!(
        remote.lookup_calls(),
        vec![
            ("pkg/a".to_string(), "1.x".to_string()),
            ("pkg/a".to_string(), "1.x".to_string()),
        ]
    );
    assert_eq!(remote.open_count(), 4);
}

#[tokio::test]
async fn test_mid_batch_failure_emits_one_error_and_no_end() {
    let temp = TempDir::new().unwrap();
    let mut remote = MockRemote::new()
        .with_release(
            "pkg/a",
            "1.0.0",
            r#"{"scripts":["a.js","b.js","c.js","d.js","e.js","f.js","g.js","h.js"]}"#,
        )
        .with_failing_file("c.js");
    for file in ["a.js", "b.js", "c.js", "d.js", "e.js", "f.js", "g.js", "h.js"] {
        remote = remote.with_file("pkg/a", "1.0.0", file, "x");
    }
    let installer = Installer::with_remote(Arc::new(remote), temp.path());

    let task = installer.install("pkg/a", "*");
    let events = collect_events(&task).await;

    let errors: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            InstallEvent::Error(err) => Some(err),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, InstallErrorKind::FileTransfer);
    assert!(errors[0].message.contains("c.js"));
    assert!(!events.iter().any(|e| matches!(e, InstallEvent::End(_))));
    assert!(matches!(events.last(), Some(InstallEvent::Error(_))));
    assert_eq!(task.state(), TaskState::Failed);
}
