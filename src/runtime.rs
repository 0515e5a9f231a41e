//! Static template pieces and browser runtime written into every packaged document.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{BundleError, Result};

/// Template markup, styles and scripts injected around the embedded payload.
///
/// The crate treats every piece as opaque text. The defaults are compiled in; a directory
/// holding files with the names listed on each field can replace any subset of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeAssets {
  /// `init.css`: style sheet of the outer document.
  pub style: String,
  /// `init.html`: markup shown while the payload is unpacked.
  pub body: String,
  /// `inject_pre.js`: script inserted as the first child of every `<head>`.
  pub inject_pre: String,
  /// `inject_post.js`: script appended to every `<body>`.
  pub inject_post: String,
  /// `main.js`: runtime evaluated once the global context is unpacked.
  pub main: String,
  /// `pako.min.js`: optional inflate implementation. Left empty, the bootstrap uses the
  /// browser's `DecompressionStream`.
  pub decompressor: String,
  /// `bootstrap.js`: decodes and inflates the payload, then starts `main`.
  pub bootstrap: String,
  /// `LICENSE`: notice embedded in a trailing comment.
  pub license: String,
}

impl Default for RuntimeAssets {
  fn default() -> Self {
    Self {
      style: include_str!("../assets/init.css").into(),
      body: include_str!("../assets/init.html").into(),
      inject_pre: include_str!("../assets/inject_pre.js").into(),
      inject_post: include_str!("../assets/inject_post.js").into(),
      main: include_str!("../assets/main.js").into(),
      decompressor: String::new(),
      bootstrap: include_str!("../assets/bootstrap.js").into(),
      license: include_str!("../assets/LICENSE").into(),
    }
  }
}

impl RuntimeAssets {
  /// Load runtime pieces from `dir`, keeping the built-in version of any missing file.
  pub fn from_dir(dir: &Path) -> Result<Self> {
    if !dir.is_dir() {
      return Err(BundleError::NotFound {
        path: dir.to_path_buf(),
      });
    }

    let mut assets = Self::default();
    let slots: [(&str, &mut String); 8] = [
      ("init.css", &mut assets.style),
      ("init.html", &mut assets.body),
      ("inject_pre.js", &mut assets.inject_pre),
      ("inject_post.js", &mut assets.inject_post),
      ("main.js", &mut assets.main),
      ("pako.min.js", &mut assets.decompressor),
      ("bootstrap.js", &mut assets.bootstrap),
      ("LICENSE", &mut assets.license),
    ];

    for (name, slot) in slots {
      let path = dir.join(name);
      match fs::read_to_string(&path) {
        Ok(content) => {
          log::debug!("runtime override: {}", path.display());
          *slot = content;
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(BundleError::io(path, err)),
      }
    }

    Ok(assets)
  }

  /// Script inserted into `<head>`, followed by caller supplied code.
  pub fn before_script(&self, append: &str) -> String {
    format!("{}{}", self.inject_pre, append)
  }

  /// Script appended to `<body>`, followed by caller supplied code.
  pub fn after_script(&self, append: &str) -> String {
    format!("{}{}", self.inject_post, append)
  }
}
