//! Common utilities for integration tests

use component_install::package::{InstallEvent, InstallTask};
use std::path::Path;
use std::process::Command;
use walkdir::WalkDir;

pub fn component_command() -> Command {
    Command::new(env!("CARGO_BIN_EXE_component"))
}

/// Every event of `task`, once it finished
pub async fn collect_events(task: &InstallTask) -> Vec<InstallEvent> {
    let mut events = task.subscribe();
    let mut seen = Vec::new();
    while let Some(event) = events.recv().await {
        seen.push(event);
    }
    seen
}

/// Short labels for asserting event order
pub fn labels(events: &[InstallEvent]) -> Vec<String> {
    events
        .iter()
        .map(|event| match event {
            InstallEvent::Resolved(release) => format!("resolved({})", release),
            InstallEvent::File(path) => format!("file({})", path),
            InstallEvent::Error(_) => "error".to_string(),
            InstallEvent::End(_) => "end".to_string(),
        })
        .collect()
}

/// Relative paths of all files under `dir`, sorted
pub fn files_under(dir: &Path) -> Vec<String> {
    let mut found: Vec<String> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            entry
                .path()
                .strip_prefix(dir)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    found.sort();
    found
}
