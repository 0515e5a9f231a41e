//! Data structures embedded into, and recovered from, a packaged document.

use std::collections::BTreeMap;

use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};

/// Marker appended to truncated payloads in extraction manifests.
pub const PREVIEW_ELLIPSIS: &str = "...";

/// Embedded form of a single file from the packaged tree.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AssetRecord {
  /// Literal text content, or the base64 representation of binary content.
  pub data: String,
  /// MIME type resolved from the original path and bytes.
  pub mime_type: String,
  /// Whether `data` must be base64-decoded to recover the stored bytes.
  #[serde(rename = "base64encoded", alias = "base64_encoded")]
  pub base64_encoded: bool,
}

impl AssetRecord {
  /// Record holding literal text.
  pub fn text(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
    Self {
      data: data.into(),
      mime_type: mime_type.into(),
      base64_encoded: false,
    }
  }

  /// Record holding base64-encoded binary content.
  pub fn binary(bytes: &[u8], mime_type: impl Into<String>) -> Self {
    Self {
      data: general_purpose::STANDARD.encode(bytes),
      mime_type: mime_type.into(),
      base64_encoded: true,
    }
  }

  /// Recover the stored bytes.
  pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
    if self.base64_encoded {
      general_purpose::STANDARD.decode(self.data.as_bytes())
    } else {
      Ok(self.data.as_bytes().to_vec())
    }
  }

  /// Copy of the record with `data` cut to `limit` characters and an ellipsis appended.
  pub fn preview(&self, limit: usize) -> Self {
    let mut data: String = self.data.chars().take(limit).collect();
    data.push_str(PREVIEW_ELLIPSIS);
    Self {
      data,
      mime_type: self.mime_type.clone(),
      base64_encoded: self.base64_encoded,
    }
  }
}

/// Mapping from POSIX-style relative path to the embedded asset.
pub type FileTree = BTreeMap<String, AssetRecord>;

/// Remote reference that could be fetched and embedded for offline use.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RemoteResource {
  /// Absolute URL of the resource.
  pub url: String,
  /// MIME type, when known.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mime_type: Option<String>,
}

/// Unit serialized, compressed and embedded into the packaged document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GlobalContext {
  /// Relative path of the entry document inside the file tree.
  #[serde(default)]
  pub current_path: String,
  /// Every packaged asset.
  pub file_tree: FileTree,
  /// Reserved for offline copies of remote references; always empty for now.
  #[serde(default)]
  pub remote_resources: Vec<RemoteResource>,
  /// Runtime script evaluated by the bootstrap once the context is unpacked.
  #[serde(default)]
  pub main: String,
}

/// Human readable summary of an extraction run, written next to the extracted files.
pub type Manifest = FileTree;

/// Build the manifest for a file tree, truncating every payload to `limit` characters.
pub fn manifest_for(file_tree: &FileTree, limit: usize) -> Manifest {
  file_tree
    .iter()
    .map(|(key, record)| (key.clone(), record.preview(limit)))
    .collect()
}
