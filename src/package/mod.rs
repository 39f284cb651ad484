pub mod events;
pub mod installer;
pub mod manifest;
pub mod runner;
pub mod task;
pub mod tree;

pub use events::{EventPublisher, InstallEvent};
pub use installer::{Installer, DEFAULT_CONCURRENCY, DEFAULT_DESTINATION};
pub use manifest::{Manifest, FILE_PROPERTIES, MANIFEST_FILE};
pub use runner::{JobError, JobRunner};
pub use task::{InstallTask, TaskState};
pub use tree::{install_tree, InstallReporter, TreeSummary};
