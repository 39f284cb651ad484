//! GitHub as a component host
//!
//! Components live in GitHub repositories named `owner/repo`. Releases are
//! git tags (or, for non-semver ranges, branches), manifests are read
//! through the contents API, and files are streamed from the raw host.

pub mod client;
pub mod types;

pub use client::GitHubRemote;
pub use types::{GitHubBranch, GitHubRepo, GitHubTag};
