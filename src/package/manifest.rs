//! The `component.json` package manifest

use base64::Engine;
use component_core::{ComponentError, ComponentResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// File name of the manifest inside every package release.
pub const MANIFEST_FILE: &str = "component.json";

/// Manifest keys whose arrays name files to fetch, in fetch order.
pub const FILE_PROPERTIES: [&str; 7] = [
    "scripts",
    "styles",
    "templates",
    "json",
    "fonts",
    "images",
    "files",
];

/// Parsed `component.json`. Only dependencies and file groups are
/// interpreted; every other key is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Dependency name -> version range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fonts: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
}

impl Manifest {
    /// Parse manifest JSON text
    pub fn parse(content: &str) -> ComponentResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Decode a base64 transport-encoded manifest and parse it.
    ///
    /// Embedded line breaks (GitHub wraps base64 at 60 columns) are ignored.
    pub fn decode(encoded: &[u8]) -> ComponentResult<Self> {
        let compact: Vec<u8> = encoded
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        let raw = base64::engine::general_purpose::STANDARD
            .decode(&compact)
            .map_err(|e| ComponentError::Remote(format!("Failed to decode manifest: {}", e)))?;
        let text = String::from_utf8(raw)
            .map_err(|e| ComponentError::Remote(format!("Invalid UTF-8 in manifest: {}", e)))?;
        Self::parse(&text)
    }

    /// Files declared under `property`, if it is one of [`FILE_PROPERTIES`]
    pub fn file_group(&self, property: &str) -> Option<&[String]> {
        let group = match property {
            "scripts" => &self.scripts,
            "styles" => &self.styles,
            "templates" => &self.templates,
            "json" => &self.json,
            "fonts" => &self.fonts,
            "images" => &self.images,
            "files" => &self.files,
            _ => return None,
        };
        group.as_deref()
    }

    /// Every declared file, group by group in [`FILE_PROPERTIES`] order.
    /// Duplicates are kept.
    pub fn files(&self) -> Vec<String> {
        FILE_PROPERTIES
            .iter()
            .filter_map(|prop| self.file_group(prop))
            .flatten()
            .cloned()
            .collect()
    }

    /// The files to transfer for this package: [`Manifest::files`] followed
    /// by the manifest itself.
    pub fn transfer_list(&self) -> Vec<String> {
        let mut files = self.files();
        files.push(MANIFEST_FILE.to_string());
        files
    }

    /// Dependencies in a stable order
    pub fn dependencies(&self) -> impl Iterator<Item = (&str, &str)> {
        self.dependencies
            .iter()
            .flatten()
            .map(|(name, range)| (name.as_str(), range.as_str()))
    }
}
