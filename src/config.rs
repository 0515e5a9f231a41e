//! Bundle configuration, optionally read from a JSON file next to the entry document.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{BundleError, Result};

/// File name looked up in the entry document's directory.
pub const DEFAULT_CONFIG_FILE: &str = "offline-bundle.config.json";

/// Tunables for packaging and extraction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Prefix added to the entry file name to derive the default output name.
    pub output_prefix: String,
    /// Lowercased extensions that are always stored base64-encoded.
    pub binary_extensions: Vec<String>,
    /// Name of the manifest written by the extractor.
    pub manifest_file: String,
    /// Number of payload characters kept per entry in the extraction manifest.
    pub manifest_preview_chars: usize,
    /// Shortest base64 run accepted as an embedded payload during extraction.
    pub min_payload_len: usize,
    /// zlib compression level (0-9) for the embedded payload.
    pub compression_level: u32,
    /// Whether symbolic links are followed while walking the asset tree.
    pub follow_links: bool,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            output_prefix: "SELF_CONTAINED_".into(),
            binary_extensions: ["png", "jpg", "jpeg", "woff", "woff2", "eot", "ttf", "gif", "ico"]
                .into_iter()
                .map(String::from)
                .collect(),
            manifest_file: "file_tree.json".into(),
            manifest_preview_chars: 100,
            min_payload_len: 128,
            compression_level: 6,
            follow_links: true,
        }
    }
}

impl BundleConfig {
    /// Attempt to load configuration from the provided directory.
    ///
    /// A missing or unparsable file yields the defaults so packaging can always proceed.
    pub fn discover(dir: &Path) -> Self {
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if !candidate.is_file() {
            return Self::default();
        }
        match Self::from_path(&candidate) {
            Ok(config) => {
                log::debug!("using configuration from {}", candidate.display());
                config
            }
            Err(err) => {
                log::warn!("ignoring {}: {err}", candidate.display());
                Self::default()
            }
        }
    }

    /// Read configuration from a specific JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|err| BundleError::io(path, err))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Default output file name for an entry document called `entry_name`.
    pub fn output_name(&self, entry_name: &str) -> String {
        format!("{}{}", self.output_prefix, entry_name)
    }

    /// Whether `extension` (already lowercased) is always stored base64-encoded.
    pub fn is_binary_extension(&self, extension: &str) -> bool {
        self.binary_extensions.iter().any(|known| known == extension)
    }
}
