//! Recover the asset tree embedded in a packaged document.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use regex::Regex;

use crate::config::BundleConfig;
use crate::error::{BundleError, Result};
use crate::models::{GlobalContext, Manifest, manifest_for};
use crate::payload::decode_payload;

/// Splits packaged documents back into their files.
pub struct Extractor<'a> {
  config: &'a BundleConfig,
}

impl<'a> Extractor<'a> {
  /// Create an extractor using the payload and manifest settings from `config`.
  pub fn new(config: &'a BundleConfig) -> Self {
    Self { config }
  }

  /// Decode the global context embedded in the document at `document_path`.
  ///
  /// Fails with [`BundleError::NotPackaged`] when no payload can be located or decoded.
  pub fn read_context(&self, document_path: &Path) -> Result<GlobalContext> {
    let not_packaged = |reason: String| BundleError::NotPackaged {
      path: document_path.to_path_buf(),
      reason,
    };

    let html = fs::read_to_string(document_path).map_err(|err| match err.kind() {
      ErrorKind::NotFound => BundleError::NotFound {
        path: document_path.to_path_buf(),
      },
      ErrorKind::InvalidData => not_packaged(format!("not UTF-8 text: {err}")),
      _ => BundleError::io(document_path, err),
    })?;

    let payload = self
      .locate_payload(&html)?
      .ok_or_else(|| not_packaged("no embedded payload found".into()))?;
    decode_payload(payload).map_err(|err| not_packaged(err.to_string()))
  }

  /// Write every embedded file below `output_dir` together with a manifest.
  ///
  /// The payload is fully decoded before anything is written, so a document without one
  /// leaves `output_dir` untouched. Writing is best effort after that point.
  pub fn extract(&self, document_path: &Path, output_dir: &Path) -> Result<Manifest> {
    let context = self.read_context(document_path)?;

    for (key, record) in &context.file_tree {
      let Some(relative) = safe_relative_path(key) else {
        log::warn!("skipping entry with unsafe path: {key}");
        continue;
      };
      let bytes = match record.decode() {
        Ok(bytes) => bytes,
        Err(err) => {
          log::warn!("skipping {key}: {err}");
          continue;
        }
      };

      let destination = output_dir.join(relative);
      if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|err| BundleError::io(parent, err))?;
      }
      fs::write(&destination, bytes).map_err(|err| BundleError::io(&destination, err))?;
      log::debug!("extracted {}", destination.display());
    }

    let manifest = manifest_for(&context.file_tree, self.config.manifest_preview_chars);
    let manifest_path = output_dir.join(&self.config.manifest_file);
    fs::create_dir_all(output_dir).map_err(|err| BundleError::io(output_dir, err))?;
    fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)
      .map_err(|err| BundleError::io(&manifest_path, err))?;

    log::info!(
      "extracted {} files to {}",
      context.file_tree.len(),
      output_dir.display()
    );
    Ok(manifest)
  }

  fn locate_payload<'h>(&self, html: &'h str) -> Result<Option<&'h str>> {
    let pattern = Regex::new(&format!(
      r#"<script[^>]*>[^<]*?window\.[A-Za-z_$][\w$]*\s*=\s*"(?P<blob>[A-Za-z0-9+/]{{{},}}={{0,2}})""#,
      self.config.min_payload_len.max(1)
    ))?;
    Ok(
      pattern
        .captures(html)
        .and_then(|caps| caps.name("blob"))
        .map(|blob| blob.as_str()),
    )
  }
}

/// Convert a file tree key into a path that stays inside the output directory.
fn safe_relative_path(key: &str) -> Option<PathBuf> {
  let relative = PathBuf::from(key);
  let safe = !key.is_empty()
    && relative
      .components()
      .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
  safe.then_some(relative)
}
