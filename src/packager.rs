//! Packaging orchestrator: load the asset tree, encode it, and write the single-file document.

use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use same_file::is_same_file;

use crate::config::BundleConfig;
use crate::error::{BundleError, Result};
use crate::mime::MimeResolver;
use crate::models::GlobalContext;
use crate::normalize::AssetNormalizer;
use crate::payload::encode_payload;
use crate::runtime::RuntimeAssets;
use crate::tree::TreeLoader;

/// Per-run packaging options.
#[derive(Debug, Clone, Default)]
pub struct PackOptions {
  /// Explicit output path. Defaults to the configured prefix plus the entry file name,
  /// next to the entry document.
  pub output: Option<PathBuf>,
  /// Code appended to the script injected at the top of every `<head>`.
  pub append_pre: String,
  /// Code appended to the script injected at the end of every `<body>`.
  pub append_post: String,
}

/// Location of the entry document within the directory being packaged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDocument {
  /// Directory walked for assets.
  pub base_dir: PathBuf,
  /// File name of the entry document, used as `current_path`.
  pub file_name: String,
}

impl EntryDocument {
  /// Split `entry_path` into its containing directory and file name.
  pub fn locate(entry_path: &Path) -> Result<Self> {
    if !entry_path.is_file() {
      return Err(BundleError::NotFound {
        path: entry_path.to_path_buf(),
      });
    }

    let file_name = entry_path
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .ok_or_else(|| BundleError::NotFound {
        path: entry_path.to_path_buf(),
      })?;
    let base_dir = match entry_path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
      _ => PathBuf::from("."),
    };

    Ok(Self {
      base_dir,
      file_name,
    })
  }
}

/// Builds self-contained documents from an entry HTML file and its sibling assets.
pub struct Packager<'a> {
  config: &'a BundleConfig,
  runtime: &'a RuntimeAssets,
  resolver: &'a dyn MimeResolver,
}

impl<'a> Packager<'a> {
  /// Create a packager for the provided configuration, runtime and MIME capability.
  pub fn new(
    config: &'a BundleConfig,
    runtime: &'a RuntimeAssets,
    resolver: &'a dyn MimeResolver,
  ) -> Self {
    Self {
      config,
      runtime,
      resolver,
    }
  }

  /// Package `entry_path` and write the result, returning the output path.
  pub fn pack(&self, entry_path: &Path, options: &PackOptions) -> Result<PathBuf> {
    let entry = EntryDocument::locate(entry_path)?;
    let output_path = self.output_path(&entry, options);

    if output_path.exists()
      && is_same_file(entry_path, &output_path).map_err(|err| BundleError::io(&output_path, err))?
    {
      return Err(BundleError::Io {
        path: output_path,
        source: std::io::Error::new(
          std::io::ErrorKind::AlreadyExists,
          "output would overwrite the entry document",
        ),
      });
    }

    let document = self.render_entry(&entry, &output_path, options)?;
    fs::write(&output_path, document).map_err(|err| BundleError::io(&output_path, err))?;

    log::info!("Result written to: {}", output_path.display());
    Ok(output_path)
  }

  /// Package `entry_path` and return the document without writing it.
  pub fn render(&self, entry_path: &Path, options: &PackOptions) -> Result<String> {
    let entry = EntryDocument::locate(entry_path)?;
    let output_path = self.output_path(&entry, options);
    self.render_entry(&entry, &output_path, options)
  }

  /// Build the global context that gets embedded for `entry_path`.
  pub fn build_context(&self, entry_path: &Path, options: &PackOptions) -> Result<GlobalContext> {
    let entry = EntryDocument::locate(entry_path)?;
    let output_path = self.output_path(&entry, options);
    self.context_for(&entry, &output_path, options)
  }

  /// Where the document for `entry` is written.
  pub fn output_path(&self, entry: &EntryDocument, options: &PackOptions) -> PathBuf {
    match &options.output {
      Some(path) => path.clone(),
      None => entry.base_dir.join(self.config.output_name(&entry.file_name)),
    }
  }

  fn render_entry(
    &self,
    entry: &EntryDocument,
    output_path: &Path,
    options: &PackOptions,
  ) -> Result<String> {
    let context = self.context_for(entry, output_path, options)?;
    let payload = encode_payload(&context, self.config.compression_level)?;
    Ok(render_document(self.runtime, &payload))
  }

  fn context_for(
    &self,
    entry: &EntryDocument,
    output_path: &Path,
    options: &PackOptions,
  ) -> Result<GlobalContext> {
    let before = self.runtime.before_script(&options.append_pre);
    let after = self.runtime.after_script(&options.append_post);
    let normalizer = AssetNormalizer::new(self.config, self.resolver, &before, &after);

    let mut loader = TreeLoader::new(&normalizer).follow_links(self.config.follow_links);
    if let Some(output_name) = output_path.file_name() {
      loader = loader.exclude(&Pattern::escape(&output_name.to_string_lossy()))?;
    }
    let file_tree = loader.load(&entry.base_dir)?;

    Ok(GlobalContext {
      current_path: entry.file_name.clone(),
      file_tree,
      remote_resources: Vec::new(),
      main: self.runtime.main.clone(),
    })
  }
}

/// Placeholder written into the decompressor slot when no inflate library is bundled.
pub const NO_DECOMPRESSOR_NOTE: &str =
  "/* no inflate library bundled, bootstrap.js falls back to DecompressionStream */";

/// Wrap an encoded payload into the final HTML document.
pub fn render_document(runtime: &RuntimeAssets, payload: &str) -> String {
  let decompressor = if runtime.decompressor.trim().is_empty() {
    NO_DECOMPRESSOR_NOTE
  } else {
    runtime.decompressor.as_str()
  };
  format!(
    r#"
<!DOCTYPE html>
<html>
<head><style>{style}</style></head>
<body>{body}
<script>window.global_context = "{payload}"</script>
<script>{decompressor} //# sourceURL=decompressor.js</script>
<script>{bootstrap} //# sourceURL=bootstrap.js</script>
</body><!-- {license} --></html>
"#,
    style = runtime.style,
    body = runtime.body,
    payload = payload,
    decompressor = decompressor,
    bootstrap = runtime.bootstrap,
    license = runtime.license.replace("-->", "-- >"),
  )
}
