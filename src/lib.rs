//! Component installer
//!
//! Installs component packages and their dependencies from a remote host
//! (GitHub by default) into `<root>/<name>/<release>` directories.
//!
//! ```no_run
//! use component_install::config::Config;
//! use component_install::package::{InstallEvent, Installer};
//!
//! # async fn example() -> component_core::ComponentResult<()> {
//! let installer = Installer::new(&Config::default())?;
//! let task = installer.install("component/events", "1.x");
//!
//! let mut events = task.subscribe();
//! while let Some(event) = events.recv().await {
//!     if let InstallEvent::File(path) = event {
//!         println!("GET {}", path);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub use component_core::{
    ComponentError, ComponentResult, InstallError, InstallErrorKind, VersionRange,
};

/// Configuration management.
pub mod config;

/// Remote package host abstraction.
pub mod di;

/// GitHub integration for package sources.
pub mod github;

/// Package install pipeline.
pub mod package;
