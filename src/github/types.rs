//! GitHub API type definitions

use serde::{Deserialize, Serialize};

/// GitHub tag information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubTag {
    pub name: String,
    pub commit: TagCommit,
}

/// Commit information in a tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagCommit {
    pub sha: String,
}

/// GitHub branch information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubBranch {
    pub name: String,
}

/// GitHub repository information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub name: String,
    pub full_name: String,
    pub default_branch: String,
}

/// Response of the contents API for a single file
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ContentResponse {
    pub content: String,
    pub encoding: String,
}
