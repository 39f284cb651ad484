//! Trait definitions for the remote package host

use async_trait::async_trait;
use bytes::Bytes;
use component_core::ComponentResult;
use futures_util::stream::BoxStream;
use std::fmt;

/// A concrete release chosen by resolution, e.g. the tag `1.0.5`.
///
/// Used as the fetch key for the manifest and every file of the package.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Release {
    pub name: String,
}

impl Release {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Body of a remote file. Ends on success, or yields an error and stops.
pub type FileStream = BoxStream<'static, ComponentResult<Bytes>>;

/// Trait for the remote package host
///
/// Anything that can resolve a range, hand back a manifest and stream files
/// can act as a remote: the GitHub API, a local mirror, or a test fixture.
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Remote: Send + Sync {
    /// Resolve `range` to a release of `name`. `Ok(None)` means nothing
    /// satisfies the range; `Err` means the host could not be asked.
    async fn lookup(&self, name: &str, range: &str) -> ComponentResult<Option<Release>>;

    /// Fetch the manifest of `name` at `release`, still in its base64
    /// transport encoding.
    async fn fetch_manifest(&self, name: &str, release: &Release) -> ComponentResult<Vec<u8>>;

    /// Open a stream over the file at `path` of `name` at `release`.
    async fn open_file_stream(
        &self,
        name: &str,
        release: &Release,
        path: &str,
    ) -> ComponentResult<FileStream>;
}
