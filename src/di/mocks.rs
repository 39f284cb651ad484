//! In-memory remote for testing

use super::traits::{FileStream, Release, Remote};
use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use component_core::{ComponentError, ComponentResult, VersionRange};
use futures_util::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::package::manifest::MANIFEST_FILE;

/// Mock remote package host
///
/// Serves releases, manifests and files from memory. The manifest of every
/// release is also served as the file `component.json`.
///
/// # Example
///
/// ```
/// use component_install::di::mocks::MockRemote;
///
/// let remote = MockRemote::new()
///     .with_release("pkg/a", "1.0.0", "{}")
///     .with_release("pkg/a", "1.0.5", r#"{"files":["index.js"]}"#)
///     .with_file("pkg/a", "1.0.5", "index.js", "module.exports = 1;");
///
/// assert_eq!(remote.peak_concurrent_opens(), 0);
/// ```
#[derive(Clone, Default)]
pub struct MockRemote {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    packages: HashMap<String, MockPackage>,
    lookups: Vec<(String, String)>,
    lookup_error: Option<String>,
    failing_files: HashSet<String>,
    open_delay: Option<Duration>,
    opens: usize,
    in_flight: usize,
    peak_in_flight: usize,
}

#[derive(Default)]
struct MockPackage {
    releases: Vec<String>,
    manifests: HashMap<String, Vec<u8>>,
    files: HashMap<(String, String), Vec<u8>>,
}

impl MockRemote {
    /// Create an empty mock remote
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a release of `name` whose manifest is the JSON text `manifest`
    pub fn with_release(self, name: &str, release: &str, manifest: &str) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(manifest);
        self.with_encoded_manifest(name, release, encoded.into_bytes())
    }

    /// Add a release whose manifest is served exactly as `encoded`
    pub fn with_encoded_manifest(self, name: &str, release: &str, encoded: Vec<u8>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let package = state.packages.entry(name.to_string()).or_default();
            if !package.releases.iter().any(|r| r == release) {
                package.releases.push(release.to_string());
            }
            package.manifests.insert(release.to_string(), encoded);
        }
        self
    }

    /// Add the contents of a file at a release
    pub fn with_file(self, name: &str, release: &str, path: &str, content: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let package = state.packages.entry(name.to_string()).or_default();
            package.files.insert(
                (release.to_string(), path.to_string()),
                content.as_bytes().to_vec(),
            );
        }
        self
    }

    /// Make every stream for `path` fail after its first chunk
    pub fn with_failing_file(self, path: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_files
            .insert(path.to_string());
        self
    }

    /// Make every lookup fail with a transport error
    pub fn with_lookup_error(self, message: &str) -> Self {
        self.state.lock().unwrap().lookup_error = Some(message.to_string());
        self
    }

    /// Delay each `open_file_stream` call, to make overlap observable
    pub fn with_open_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().open_delay = Some(delay);
        self
    }

    /// Every `(name, range)` passed to `lookup`, in call order
    pub fn lookup_calls(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().lookups.clone()
    }

    /// Number of `open_file_stream` calls so far
    pub fn open_count(&self) -> usize {
        self.state.lock().unwrap().opens
    }

    /// Highest number of transfers that overlapped. A transfer lasts from
    /// `open_file_stream` until its stream is dropped.
    pub fn peak_concurrent_opens(&self) -> usize {
        self.state.lock().unwrap().peak_in_flight
    }
}

#[async_trait]
impl Remote for MockRemote {
    async fn lookup(&self, name: &str, range: &str) -> ComponentResult<Option<Release>> {
        let mut state = self.state.lock().unwrap();
        state.lookups.push((name.to_string(), range.to_string()));

        if let Some(ref message) = state.lookup_error {
            return Err(ComponentError::Remote(message.clone()));
        }

        let Some(package) = state.packages.get(name) else {
            return Ok(None);
        };
        let range = VersionRange::parse(range);
        Ok(range
            .best_match(package.releases.iter().map(String::as_str))
            .map(Release::new))
    }

    async fn fetch_manifest(&self, name: &str, release: &Release) -> ComponentResult<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state
            .packages
            .get(name)
            .and_then(|p| p.manifests.get(&release.name))
            .cloned()
            .ok_or_else(|| {
                ComponentError::Remote(format!("no manifest for {}@{}", name, release))
            })
    }

    async fn open_file_stream(
        &self,
        name: &str,
        release: &Release,
        path: &str,
    ) -> ComponentResult<FileStream> {
        let guard = InFlight::enter(&self.state);
        let delay = self.state.lock().unwrap().open_delay;

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock().unwrap();

        let package = state.packages.get(name);
        let content = if path == MANIFEST_FILE {
            package
                .and_then(|p| p.manifests.get(&release.name))
                .map(|encoded| {
                    base64::engine::general_purpose::STANDARD
                        .decode(encoded)
                        .unwrap_or_else(|_| encoded.clone())
                })
        } else {
            package.and_then(|p| p.files.get(&(release.name.clone(), path.to_string())).cloned())
        };

        let Some(content) = content else {
            return Err(ComponentError::Remote(format!(
                "HTTP 404 Not Found: {}@{}/{}",
                name, release, path
            )));
        };

        let mut chunks = vec![Ok(Bytes::from(content))];
        if state.failing_files.contains(path) {
            let message = format!("connection reset while reading {}", path);
            chunks.push(Err(ComponentError::Remote(message)));
        }

        Ok(stream::iter(chunks)
            .map(move |chunk| {
                let _transfer = &guard;
                chunk
            })
            .boxed())
    }
}

/// Counts one transfer as in flight until dropped
struct InFlight(Arc<Mutex<MockState>>);

impl InFlight {
    fn enter(state: &Arc<Mutex<MockState>>) -> Self {
        let mut locked = state.lock().unwrap();
        locked.opens += 1;
        locked.in_flight += 1;
        locked.peak_in_flight = locked.peak_in_flight.max(locked.in_flight);
        drop(locked);
        Self(Arc::clone(state))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Ok(mut state) = self.0.lock() {
            state.in_flight -= 1;
        }
    }
}
