use std::fmt;
use thiserror::Error;

pub type ComponentResult<T> = Result<T, ComponentError>;

#[derive(Error, Debug)]
pub enum ComponentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Path error: {0}")]
    Path(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The remote host answered, but not with what we asked for.
    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Version error: {0}")]
    Version(String),
}

/// Which pipeline stage of a package install failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallErrorKind {
    /// No release satisfies the requested range, or lookup itself failed.
    Resolution,
    /// The manifest could not be fetched, decoded or parsed.
    Manifest,
    /// The destination directory could not be created.
    Directory,
    /// A file stream could not be opened, read or written.
    FileTransfer,
}

impl fmt::Display for InstallErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallErrorKind::Resolution => write!(f, "resolution"),
            InstallErrorKind::Manifest => write!(f, "manifest"),
            InstallErrorKind::Directory => write!(f, "directory"),
            InstallErrorKind::FileTransfer => write!(f, "file transfer"),
        }
    }
}

/// Terminal failure of a single package install.
///
/// Cloneable so it can be delivered to every subscriber of a task.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct InstallError {
    pub kind: InstallErrorKind,
    pub message: String,
}

impl InstallError {
    pub fn new(kind: InstallErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        Self::new(InstallErrorKind::Resolution, message)
    }

    pub fn manifest(message: impl Into<String>) -> Self {
        Self::new(InstallErrorKind::Manifest, message)
    }

    pub fn directory(message: impl Into<String>) -> Self {
        Self::new(InstallErrorKind::Directory, message)
    }

    pub fn file_transfer(message: impl Into<String>) -> Self {
        Self::new(InstallErrorKind::FileTransfer, message)
    }
}
