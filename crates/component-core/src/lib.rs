//! Core utilities shared by the component installer: error types, path
//! helpers and version range handling.

pub mod core {
    pub mod error;
    pub mod path;
    pub mod version;
}

pub use crate::core::error::{
    ComponentError, ComponentResult, InstallError, InstallErrorKind,
};
pub use crate::core::version::VersionRange;
