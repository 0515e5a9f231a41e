//! Turn one file on disk into the [`AssetRecord`] stored in the file tree.

use std::fs;
use std::path::Path;

use crate::config::BundleConfig;
use crate::error::{BundleError, Result};
use crate::mime::MimeResolver;
use crate::models::AssetRecord;
use crate::rewrite::{embed_css_resources, inject_scripts};

/// How a file is stored, decided from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
  /// Stylesheet whose references are inlined.
  Stylesheet,
  /// HTML document that receives the runtime scripts.
  Document,
  /// Known binary format, always base64-encoded.
  Binary,
  /// Anything else: text when it decodes as UTF-8, base64 otherwise.
  Other,
}

impl AssetKind {
  /// Classify `path` by its lowercased extension.
  pub fn classify(path: &Path, config: &BundleConfig) -> Self {
    let extension = path
      .extension()
      .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
      .unwrap_or_default();

    match extension.as_str() {
      "css" => Self::Stylesheet,
      "html" | "htm" => Self::Document,
      ext if config.is_binary_extension(ext) => Self::Binary,
      _ => Self::Other,
    }
  }
}

/// Prepares files for the file tree, rewriting stylesheets and HTML on the way.
pub struct AssetNormalizer<'a> {
  config: &'a BundleConfig,
  resolver: &'a dyn MimeResolver,
  before: &'a str,
  after: &'a str,
}

impl<'a> AssetNormalizer<'a> {
  /// `before` and `after` are the script bodies injected into every HTML document.
  pub fn new(
    config: &'a BundleConfig,
    resolver: &'a dyn MimeResolver,
    before: &'a str,
    after: &'a str,
  ) -> Self {
    Self {
      config,
      resolver,
      before,
      after,
    }
  }

  /// Read `path` and build its record.
  pub fn normalize(&self, path: &Path) -> Result<AssetRecord> {
    let bytes = fs::read(path).map_err(|err| BundleError::io(path, err))?;
    self.normalize_bytes(path, bytes)
  }

  /// Build the record for `bytes`, read from `path`.
  ///
  /// The MIME type is resolved from the original bytes, before any rewriting.
  pub fn normalize_bytes(&self, path: &Path, bytes: Vec<u8>) -> Result<AssetRecord> {
    let mime_type = self.resolver.resolve(path, &bytes);

    let record = match AssetKind::classify(path, self.config) {
      AssetKind::Stylesheet => {
        let css = String::from_utf8_lossy(&bytes);
        AssetRecord::text(embed_css_resources(&css, path, self.resolver)?, mime_type)
      }
      AssetKind::Document => {
        let html = String::from_utf8_lossy(&bytes);
        AssetRecord::text(inject_scripts(&html, self.before, self.after), mime_type)
      }
      AssetKind::Binary => AssetRecord::binary(&bytes, mime_type),
      AssetKind::Other => match String::from_utf8(bytes) {
        Ok(text) => AssetRecord::text(text, mime_type),
        Err(err) => AssetRecord::binary(err.as_bytes(), mime_type),
      },
    };

    log::debug!(
      "loaded file: {} [{}, {} bytes]",
      path.display(),
      record.mime_type,
      record.data.len()
    );
    Ok(record)
  }
}
