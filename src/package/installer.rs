//! Install coordinator

use crate::config::Config;
use crate::di::Remote;
use crate::github::GitHubRemote;
use crate::package::task::{InstallTask, TaskContext};
use component_core::ComponentResult;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Files transferred at once per package, unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 6;

/// Destination root, unless configured otherwise.
pub const DEFAULT_DESTINATION: &str = "components";

/// Starts package installs against one remote and destination root.
///
/// The installer keeps no record of what it installed: every call to
/// [`Installer::install`] is independent, even for the same name and range.
#[derive(Clone)]
pub struct Installer {
    remote: Arc<dyn Remote>,
    destination_root: PathBuf,
    concurrency: usize,
}

impl Installer {
    /// Create an installer backed by GitHub, configured from `config`
    pub fn new(config: &Config) -> ComponentResult<Self> {
        let remote = GitHubRemote::new(&config.github)?;
        Ok(Self::with_remote(Arc::new(remote), &config.destination_root)
            .with_concurrency(config.concurrency))
    }

    /// Create an installer using any remote
    pub fn with_remote(remote: Arc<dyn Remote>, destination_root: impl Into<PathBuf>) -> Self {
        Self {
            remote,
            destination_root: destination_root.into(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Set how many files of one package transfer at once (at least one)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Install `name` at the best release satisfying `version_range`.
    ///
    /// Returns immediately; progress and failures are reported through the
    /// returned task's events. Must be called from within a Tokio runtime.
    pub fn install(&self, name: &str, version_range: &str) -> InstallTask {
        let task = InstallTask::new(name, version_range);
        debug!(package = %name, range = %version_range, "starting install");

        let ctx = TaskContext {
            remote: Arc::clone(&self.remote),
            root: self.destination_root.clone(),
            concurrency: self.concurrency,
        };
        tokio::spawn(task.clone().run(ctx));

        task
    }
}
