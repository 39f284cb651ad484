use crate::core::error::{ComponentError, ComponentResult};
use std::path::{Path, PathBuf};

/// Get the component installer home directory
///
/// Platform-specific locations:
/// - Windows: %APPDATA%\component
/// - Linux: ~/.config/component
/// - macOS: ~/Library/Application Support/component
pub fn component_home() -> ComponentResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| ComponentError::Path("Could not determine config directory".to_string()))?;
    Ok(config_dir.join("component"))
}

/// Get the config file path (`<component_home>/config.yaml`)
pub fn config_file() -> ComponentResult<PathBuf> {
    Ok(component_home()?.join("config.yaml"))
}

/// Directory a package release is installed into: `<root>/<name>/<release>`.
///
/// Scoped names such as `owner/repo` produce nested directories.
pub fn release_dir(root: &Path, name: &str, release: &str) -> PathBuf {
    root.join(name).join(release)
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> ComponentResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
