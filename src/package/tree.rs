//! Recursive installs
//!
//! Tasks know nothing about each other. A tree is grown from the outside:
//! whenever a task ends, the dependencies listed in its manifest are
//! installed as new, independent tasks.

use crate::package::events::InstallEvent;
use crate::package::installer::Installer;
use crate::package::manifest::Manifest;
use crate::package::task::InstallTask;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::warn;

/// Receives progress of every task in a tree.
pub trait InstallReporter: Send + Sync {
    /// A task was started
    fn on_start(&self, _task: &InstallTask) {}

    /// A task published an event
    fn on_event(&self, task: &InstallTask, event: &InstallEvent);

    /// A finished task is about to install `count` dependencies
    fn on_dependencies(&self, _task: &InstallTask, _count: usize) {}

    /// A task finished and its dependencies were started
    fn on_installed(&self, _task: &InstallTask) {}
}

/// Outcome counts for a whole tree.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TreeSummary {
    pub installed: usize,
    pub failed: usize,
}

impl TreeSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Install `name` and, transitively, every dependency it declares.
///
/// Resolves once every task in the tree has finished. There is no
/// de-duplication: a package reachable twice is installed twice, and a
/// dependency cycle never finishes.
pub async fn install_tree(
    installer: &Installer,
    name: &str,
    version_range: &str,
    reporter: Arc<dyn InstallReporter>,
) -> TreeSummary {
    let mut watchers = JoinSet::new();
    let mut summary = TreeSummary::default();

    watchers.spawn(watch(
        installer.install(name, version_range),
        Arc::clone(&reporter),
    ));

    while let Some(joined) = watchers.join_next().await {
        match joined {
            Ok(Some((task, manifest))) => {
                summary.installed += 1;

                let dependencies: Vec<(&str, &str)> = manifest.dependencies().collect();
                if !dependencies.is_empty() {
                    reporter.on_dependencies(&task, dependencies.len());
                }
                for (dependency, range) in dependencies {
                    watchers.spawn(watch(
                        installer.install(dependency, range),
                        Arc::clone(&reporter),
                    ));
                }

                reporter.on_installed(&task);
            }
            Ok(None) => summary.failed += 1,
            Err(e) => {
                warn!("install watcher panicked: {}", e);
                summary.failed += 1;
            }
        }
    }

    summary
}

/// Forward a task's events to `reporter`; yields the manifest on success.
async fn watch(
    task: InstallTask,
    reporter: Arc<dyn InstallReporter>,
) -> Option<(InstallTask, Arc<Manifest>)> {
    reporter.on_start(&task);

    let mut events = task.subscribe();
    let mut manifest = None;
    while let Some(event) = events.recv().await {
        reporter.on_event(&task, &event);
        if let InstallEvent::End(ref m) = event {
            manifest = Some(Arc::clone(m));
        }
    }

    manifest.map(|m| (task, m))
}
