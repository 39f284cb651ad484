//! Per-package install pipeline
//!
//! An [`InstallTask`] walks one package through resolution, manifest
//! fetch, directory setup and file transfer, publishing an
//! [`InstallEvent`] at each milestone. It ends in exactly one `End` or
//! `Error` event.

use crate::di::{Release, Remote};
use crate::package::events::{EventPublisher, InstallEvent};
use crate::package::manifest::Manifest;
use crate::package::runner::{JobError, JobRunner};
use component_core::core::path::release_dir;
use component_core::{ComponentError, InstallError, InstallErrorKind};
use futures_util::StreamExt;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

/// Lifecycle state of an install task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Created,
    Resolving,
    Resolved,
    FetchingManifest,
    HasManifest,
    PreparingDirectory,
    TransferringFiles,
    Completed,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }

    /// The error kind for a failure that happens while in this state.
    fn failure_kind(self) -> InstallErrorKind {
        match self {
            TaskState::Created | TaskState::Resolving => InstallErrorKind::Resolution,
            TaskState::Resolved | TaskState::FetchingManifest => InstallErrorKind::Manifest,
            TaskState::HasManifest | TaskState::PreparingDirectory => InstallErrorKind::Directory,
            TaskState::TransferringFiles | TaskState::Completed | TaskState::Failed => {
                InstallErrorKind::FileTransfer
            }
        }
    }
}

/// Everything a running task needs from its coordinator.
pub(crate) struct TaskContext {
    pub remote: Arc<dyn Remote>,
    pub root: PathBuf,
    pub concurrency: usize,
}

/// Handle to one package install. Cheap to clone; all clones observe the
/// same task.
#[derive(Clone)]
pub struct InstallTask {
    shared: Arc<TaskShared>,
}

struct TaskShared {
    name: String,
    version_range: String,
    progress: Mutex<TaskProgress>,
    events: EventPublisher<InstallEvent>,
}

struct TaskProgress {
    state: TaskState,
    release: Option<Release>,
    manifest: Option<Arc<Manifest>>,
    destination_dir: Option<PathBuf>,
}

/// Closes the event stream even if the pipeline future is dropped.
struct CloseEvents(Arc<TaskShared>);

impl Drop for CloseEvents {
    fn drop(&mut self) {
        self.0.events.close();
    }
}

impl InstallTask {
    pub(crate) fn new(name: &str, version_range: &str) -> Self {
        Self {
            shared: Arc::new(TaskShared {
                name: name.to_string(),
                version_range: version_range.to_string(),
                progress: Mutex::new(TaskProgress {
                    state: TaskState::Created,
                    release: None,
                    manifest: None,
                    destination_dir: None,
                }),
                events: EventPublisher::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn version_range(&self) -> &str {
        &self.shared.version_range
    }

    pub fn state(&self) -> TaskState {
        self.progress().state
    }

    /// The resolved release, once resolution succeeded
    pub fn release(&self) -> Option<Release> {
        self.progress().release.clone()
    }

    /// The parsed manifest, once it was fetched
    pub fn manifest(&self) -> Option<Arc<Manifest>> {
        self.progress().manifest.clone()
    }

    /// `<root>/<name>/<release>`, once directory setup began
    pub fn destination_dir(&self) -> Option<PathBuf> {
        self.progress().destination_dir.clone()
    }

    /// Subscribe to this task's events.
    ///
    /// Events already published are replayed first. The receiver ends after
    /// the terminal `End` or `Error` event.
    pub fn subscribe(&self) -> UnboundedReceiver<InstallEvent> {
        self.shared.events.subscribe()
    }

    /// Events published so far
    pub fn events(&self) -> Vec<InstallEvent> {
        self.shared.events.history()
    }

    /// Wait for the task to finish.
    pub async fn finished(&self) -> Result<Arc<Manifest>, InstallError> {
        let mut events = self.subscribe();
        while let Some(event) = events.recv().await {
            match event {
                InstallEvent::End(manifest) => return Ok(manifest),
                InstallEvent::Error(err) => return Err(err),
                InstallEvent::Resolved(_) | InstallEvent::File(_) => {}
            }
        }

        // The pipeline was dropped before reaching a terminal state, which
        // only happens when the runtime shuts down under it.
        Err(InstallError::new(
            self.state().failure_kind(),
            format!(
                "install of {}@{} was abandoned",
                self.name(),
                self.version_range()
            ),
        ))
    }

    fn progress(&self) -> MutexGuard<'_, TaskProgress> {
        self.shared
            .progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, state: TaskState) {
        debug!(package = %self.name(), ?state, "install state");
        self.progress().state = state;
    }

    fn publish(&self, event: InstallEvent) {
        self.shared.events.publish(event);
    }

    /// Drive the pipeline to completion. Publishes exactly one terminal event.
    pub(crate) async fn run(self, ctx: TaskContext) {
        let _close = CloseEvents(Arc::clone(&self.shared));

        match self.drive(&ctx).await {
            Ok(manifest) => {
                self.transition(TaskState::Completed);
                self.publish(InstallEvent::End(manifest));
            }
            Err(err) => {
                warn!(
                    package = %self.name(),
                    range = %self.version_range(),
                    kind = %err.kind,
                    "install failed: {}",
                    err
                );
                self.transition(TaskState::Failed);
                self.publish(InstallEvent::Error(err));
            }
        }
    }

    async fn drive(&self, ctx: &TaskContext) -> Result<Arc<Manifest>, InstallError> {
        let release = self.resolve(ctx).await?;
        let manifest = self.fetch_manifest(ctx, &release).await?;
        let dir = self.prepare_directory(ctx, &release).await?;
        self.transfer_files(ctx, &release, &manifest, &dir).await?;
        Ok(manifest)
    }

    async fn resolve(&self, ctx: &TaskContext) -> Result<Release, InstallError> {
        self.transition(TaskState::Resolving);

        let found = ctx
            .remote
            .lookup(self.name(), self.version_range())
            .await
            .map_err(|e| {
                InstallError::resolution(format!(
                    "failed to look up {}@{}: {}",
                    self.name(),
                    self.version_range(),
                    e
                ))
            })?;

        let release = found.ok_or_else(|| {
            InstallError::resolution(format!(
                "failed to find a release that satisfies {}@{}",
                self.name(),
                self.version_range()
            ))
        })?;

        self.progress().release = Some(release.clone());
        self.transition(TaskState::Resolved);
        self.publish(InstallEvent::Resolved(release.clone()));
        Ok(release)
    }

    async fn fetch_manifest(
        &self,
        ctx: &TaskContext,
        release: &Release,
    ) -> Result<Arc<Manifest>, InstallError> {
        self.transition(TaskState::FetchingManifest);

        let manifest_error = |e: ComponentError| {
            InstallError::manifest(format!(
                "failed to read manifest of {}@{}: {}",
                self.name(),
                release,
                e
            ))
        };

        let encoded = ctx
            .remote
            .fetch_manifest(self.name(), release)
            .await
            .map_err(manifest_error)?;
        let manifest = Arc::new(Manifest::decode(&encoded).map_err(manifest_error)?);

        self.progress().manifest = Some(Arc::clone(&manifest));
        self.transition(TaskState::HasManifest);
        Ok(manifest)
    }

    async fn prepare_directory(
        &self,
        ctx: &TaskContext,
        release: &Release,
    ) -> Result<PathBuf, InstallError> {
        self.transition(TaskState::PreparingDirectory);

        let dir = release_dir(&ctx.root, self.name(), &release.name);
        self.progress().destination_dir = Some(dir.clone());

        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            InstallError::directory(format!("failed to create {}: {}", dir.display(), e))
        })?;
        Ok(dir)
    }

    async fn transfer_files(
        &self,
        ctx: &TaskContext,
        release: &Release,
        manifest: &Manifest,
        dir: &Path,
    ) -> Result<(), InstallError> {
        self.transition(TaskState::TransferringFiles);

        let files = manifest.transfer_list();
        debug!(package = %self.name(), files = files.len(), "transferring files");

        let mut runner = JobRunner::new(ctx.concurrency);
        for file in files {
            let task = self.clone();
            let remote = Arc::clone(&ctx.remote);
            let release = release.clone();
            let dir = dir.to_path_buf();

            runner.push(move || {
                task.publish(InstallEvent::File(file.clone()));
                async move { transfer_file(remote.as_ref(), task.name(), &release, &file, &dir).await }
            });
        }

        runner.end().await.map_err(|e| match e {
            JobError::Failed(err) => err,
            JobError::Panicked(message) => InstallError::file_transfer(message),
        })
    }
}

/// Stream one remote file to `<dir>/<path>`.
async fn transfer_file(
    remote: &dyn Remote,
    name: &str,
    release: &Release,
    path: &str,
    dir: &Path,
) -> Result<(), InstallError> {
    let fail = |e: ComponentError| {
        InstallError::file_transfer(format!(
            "failed to fetch {}@{}/{}: {}",
            name, release, path, e
        ))
    };

    let dest = contained_path(dir, path).ok_or_else(|| {
        InstallError::file_transfer(format!(
            "refusing to write {} outside of {}",
            path,
            dir.display()
        ))
    })?;

    let mut stream = remote
        .open_file_stream(name, release, path)
        .await
        .map_err(fail)?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| fail(e.into()))?;
    }
    let mut out = tokio::fs::File::create(&dest)
        .await
        .map_err(|e| fail(e.into()))?;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(fail)?;
        out.write_all(&chunk).await.map_err(|e| fail(e.into()))?;
    }
    out.flush().await.map_err(|e| fail(e.into()))?;

    Ok(())
}

/// Join a manifest-relative path onto `dir`, rejecting absolute paths and
/// `..` segments.
fn contained_path(dir: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    let safe = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    (safe && !relative.as_os_str().is_empty()).then(|| dir.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::mocks::MockRemote;
    use tempfile::TempDir;

    fn context(remote: MockRemote, root: &Path) -> TaskContext {
        TaskContext {
            remote: Arc::new(remote),
            root: root.to_path_buf(),
            concurrency: 6,
        }
    }

    #[tokio::test]
    async fn test_successful_run_walks_every_state() {
        let temp = TempDir::new().unwrap();
        let remote = MockRemote::new()
            .with_release("pkg/a", "1.0.5", r#"{"files":["index.js"]}"#)
            .with_file("pkg/a", "1.0.5", "index.js", "module.exports = 1;");

        let task = InstallTask::new("pkg/a", "1.x");
        assert_eq!(task.state(), TaskState::Created);
        assert!(task.release().is_none());

        task.clone().run(context(remote, temp.path())).await;

        assert_eq!(task.state(), TaskState::Completed);
        assert_eq!(task.release(), Some(Release::new("1.0.5")));
        assert_eq!(
            task.destination_dir(),
            Some(temp.path().join("pkg/a").join("1.0.5"))
        );
        assert_eq!(task.manifest().unwrap().files(), vec!["index.js"]);
        assert!(task.finished().await.is_ok());
    }

    #[tokio::test]
    async fn test_unresolvable_range_fails_with_resolution_error() {
        let temp = TempDir::new().unwrap();
        let remote = MockRemote::new().with_release("pkg/a", "0.1.0", "{}");

        let task = InstallTask::new("pkg/a", "1.x");
        task.clone().run(context(remote, temp.path())).await;

        assert_eq!(task.state(), TaskState::Failed);
        let err = task.finished().await.unwrap_err();
        assert_eq!(err.kind, InstallErrorKind::Resolution);
        assert!(err.message.contains("pkg/a@1.x"));
        assert!(task.destination_dir().is_none());
    }

    #[tokio::test]
    async fn test_lookup_transport_error_is_resolution_error() {
        let temp = TempDir::new().unwrap();
        let remote = MockRemote::new().with_lookup_error("connection refused");

        let task = InstallTask::new("pkg/a", "*");
        task.clone().run(context(remote, temp.path())).await;

        let err = task.finished().await.unwrap_err();
        assert_eq!(err.kind, InstallErrorKind::Resolution);
        assert!(err.message.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_bad_manifest_leaves_manifest_unset() {
        let temp = TempDir::new().unwrap();
        let remote = MockRemote::new().with_encoded_manifest(
            "pkg/a",
            "1.0.0",
            b"%%% not base64 %%%".to_vec(),
        );

        let task = InstallTask::new("pkg/a", "1.0.0");
        task.clone().run(context(remote, temp.path())).await;

        let err = task.finished().await.unwrap_err();
        assert_eq!(err.kind, InstallErrorKind::Manifest);
        assert!(task.manifest().is_none());
        assert_eq!(task.release(), Some(Release::new("1.0.0")));
    }

    #[tokio::test]
    async fn test_unparseable_manifest_json() {
        let temp = TempDir::new().unwrap();
        let remote = MockRemote::new().with_release("pkg/a", "1.0.0", "{ not json");

        let task = InstallTask::new("pkg/a", "*");
        task.clone().run(context(remote, temp.path())).await;

        assert_eq!(
            task.finished().await.unwrap_err().kind,
            InstallErrorKind::Manifest
        );
    }

    #[tokio::test]
    async fn test_directory_error() {
        let temp = TempDir::new().unwrap();
        // A regular file where the package directory should go
        std::fs::write(temp.path().join("pkg"), "in the way").unwrap();
        let remote = MockRemote::new().with_release("pkg", "1.0.0", "{}");

        let task = InstallTask::new("pkg", "*");
        task.clone().run(context(remote, temp.path())).await;

        let err = task.finished().await.unwrap_err();
        assert_eq!(err.kind, InstallErrorKind::Directory);
        assert!(task.manifest().is_some());
    }

    #[tokio::test]
    async fn test_missing_file_is_file_transfer_error() {
        let temp = TempDir::new().unwrap();
        let remote = MockRemote::new().with_release("pkg/a", "1.0.0", r#"{"files":["gone.js"]}"#);

        let task = InstallTask::new("pkg/a", "*");
        task.clone().run(context(remote, temp.path())).await;

        let err = task.finished().await.unwrap_err();
        assert_eq!(err.kind, InstallErrorKind::FileTransfer);
        assert!(err.message.contains("gone.js"));
    }

    #[tokio::test]
    async fn test_nested_paths_are_created() {
        let temp = TempDir::new().unwrap();
        let remote = MockRemote::new()
            .with_release("pkg", "1.0.0", r#"{"templates":["tpl/list.html"]}"#)
            .with_file("pkg", "1.0.0", "tpl/list.html", "<ul></ul>");

        let task = InstallTask::new("pkg", "*");
        task.clone().run(context(remote, temp.path())).await;

        task.finished().await.unwrap();
        let written = std::fs::read_to_string(temp.path().join("pkg/1.0.0/tpl/list.html")).unwrap();
        assert_eq!(written, "<ul></ul>");
    }

    #[tokio::test]
    async fn test_escaping_path_is_rejected() {
        let temp = TempDir::new().unwrap();
        let remote = MockRemote::new()
            .with_release("pkg", "1.0.0", r#"{"files":["../../evil.js"]}"#)
            .with_file("pkg", "1.0.0", "../../evil.js", "x");

        let task = InstallTask::new("pkg", "*");
        task.clone().run(context(remote, temp.path())).await;

        let err = task.finished().await.unwrap_err();
        assert_eq!(err.kind, InstallErrorKind::FileTransfer);
        assert!(!temp.path().join("evil.js").exists());
    }

    #[test]
    fn test_contained_path() {
        let dir = Path::new("/root/pkg/1.0.0");
        assert_eq!(
            contained_path(dir, "lib/a.js"),
            Some(PathBuf::from("/root/pkg/1.0.0/lib/a.js"))
        );
        assert_eq!(contained_path(dir, "../a.js"), None);
        assert_eq!(contained_path(dir, "/etc/passwd"), None);
        assert_eq!(contained_path(dir, ""), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(!TaskState::TransferringFiles.is_terminal());
    }
}
