//! Error type shared by the packaging and extraction pipelines.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BundleError>;

/// Failures that abort a packaging or extraction run.
///
/// Problems local to a single asset (a missing stylesheet reference, an unknown MIME type)
/// are logged and never surface here.
#[derive(Debug, Error)]
pub enum BundleError {
  /// The entry document or the directory to walk does not exist.
  #[error("no such file: {}", .path.display())]
  NotFound {
    /// Path that was expected to exist.
    path: PathBuf,
  },
  /// The extraction input carries no readable embedded payload.
  #[error("does not look like a packaged document: {} ({reason})", .path.display())]
  NotPackaged {
    /// Document that was inspected.
    path: PathBuf,
    /// What went wrong while locating or decoding the payload.
    reason: String,
  },
  /// A stylesheet imports itself, directly or through other stylesheets.
  #[error("cyclic stylesheet import of {} (via {})", .path.display(), format_chain(.chain))]
  CyclicImport {
    /// Stylesheet that was reached a second time.
    path: PathBuf,
    /// Stylesheets being rewritten when the cycle was detected, outermost first.
    chain: Vec<PathBuf>,
  },
  /// Two files mapped onto the same file tree key.
  #[error("file tree already contains an asset at `{key}`")]
  DuplicateAsset {
    /// Relative key that collided.
    key: String,
  },
  /// Reading or writing a specific path failed.
  #[error("failed to access {}: {source}", .path.display())]
  Io {
    /// Path that caused the error.
    path: PathBuf,
    /// Source I/O error.
    #[source]
    source: std::io::Error,
  },
  /// Serializing the global context failed.
  #[error("failed to serialize global context: {0}")]
  Json(#[from] serde_json::Error),
  /// The exclusion glob could not be compiled.
  #[error("invalid exclude pattern: {0}")]
  Pattern(#[from] glob::PatternError),
  /// A payload locator pattern could not be compiled.
  #[error("invalid pattern: {0}")]
  Regex(#[from] regex::Error),
}

impl BundleError {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io {
      path: path.into(),
      source,
    }
  }
}

fn format_chain(chain: &[PathBuf]) -> String {
  chain
    .iter()
    .map(|path| path.display().to_string())
    .collect::<Vec<_>>()
    .join(" -> ")
}
