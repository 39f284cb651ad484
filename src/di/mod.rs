//! Remote abstraction for the installer
//!
//! The install pipeline only talks to the package host through the
//! [`Remote`] trait, so the GitHub client can be swapped for an in-memory
//! fixture in tests.
//!
//! # Example (Testing)
//! ```
//! use component_install::di::mocks::MockRemote;
//!
//! let remote = MockRemote::new()
//!     .with_release("pkg/a", "1.0.5", r#"{"files":["index.js"]}"#)
//!     .with_file("pkg/a", "1.0.5", "index.js", "module.exports = 1;");
//! assert!(remote.lookup_calls().is_empty());
//! ```

pub mod mocks;
pub mod traits;

// Re-export key types
pub use traits::{FileStream, Release, Remote};
