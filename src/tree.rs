//! Directory walking that builds the [`FileTree`] for a packaging run.

use std::collections::btree_map::Entry;
use std::path::{Component, Path};

use glob::Pattern;
use walkdir::WalkDir;

use crate::error::{BundleError, Result};
use crate::models::{AssetRecord, FileTree};
use crate::normalize::AssetNormalizer;

/// Recursively loads every file below a base directory.
pub struct TreeLoader<'a> {
  normalizer: &'a AssetNormalizer<'a>,
  exclude: Option<Pattern>,
  follow_links: bool,
}

impl<'a> TreeLoader<'a> {
  /// Create a loader that prepares files with `normalizer`.
  pub fn new(normalizer: &'a AssetNormalizer<'a>) -> Self {
    Self {
      normalizer,
      exclude: None,
      follow_links: true,
    }
  }

  /// Skip every entry whose file name matches the glob `pattern`.
  pub fn exclude(mut self, pattern: &str) -> Result<Self> {
    self.exclude = Some(Pattern::new(pattern)?);
    Ok(self)
  }

  /// Whether symbolic links are followed while walking.
  pub fn follow_links(mut self, follow_links: bool) -> Self {
    self.follow_links = follow_links;
    self
  }

  /// Walk `base_dir` and normalize every file into the returned tree.
  ///
  /// Files that cannot be read are logged and skipped. Stylesheet import cycles and key
  /// collisions abort the load.
  pub fn load(&self, base_dir: &Path) -> Result<FileTree> {
    if !base_dir.is_dir() {
      return Err(BundleError::NotFound {
        path: base_dir.to_path_buf(),
      });
    }

    let mut tree = FileTree::new();
    let walker = WalkDir::new(base_dir)
      .follow_links(self.follow_links)
      .into_iter()
      .filter_entry(|entry| entry.depth() == 0 || !self.is_excluded(entry.file_name()));

    for entry in walker {
      let entry = match entry {
        Ok(entry) => entry,
        Err(err) => {
          log::warn!("skipping unreadable entry: {err}");
          continue;
        }
      };
      if !entry.file_type().is_file() {
        continue;
      }

      let Some(key) = tree_key(base_dir, entry.path()) else {
        log::warn!("skipping {}: not below {}", entry.path().display(), base_dir.display());
        continue;
      };

      let record = match self.normalizer.normalize(entry.path()) {
        Ok(record) => record,
        Err(BundleError::Io { path, source }) => {
          log::warn!("skipping {}: {source}", path.display());
          continue;
        }
        Err(err) => return Err(err),
      };

      log::debug!("packed file {key} [{} bytes]", record.data.len());
      insert_record(&mut tree, key, record)?;
    }

    Ok(tree)
  }

  fn is_excluded(&self, file_name: &std::ffi::OsStr) -> bool {
    self
      .exclude
      .as_ref()
      .is_some_and(|pattern| pattern.matches(&file_name.to_string_lossy()))
  }
}

/// Relative POSIX-style key of `path` below `base_dir`.
pub fn tree_key(base_dir: &Path, path: &Path) -> Option<String> {
  let relative = path.strip_prefix(base_dir).ok()?;
  let segments: Vec<String> = relative
    .components()
    .map(|component| match component {
      Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
      _ => None,
    })
    .collect::<Option<_>>()?;

  if segments.is_empty() {
    None
  } else {
    Some(segments.join("/"))
  }
}

/// Add `record` under `key`, refusing to overwrite an existing entry.
pub fn insert_record(tree: &mut FileTree, key: String, record: AssetRecord) -> Result<()> {
  match tree.entry(key) {
    Entry::Occupied(entry) => Err(BundleError::DuplicateAsset {
      key: entry.key().clone(),
    }),
    Entry::Vacant(entry) => {
      entry.insert(record);
      Ok(())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::BundleConfig;
  use crate::mime::DefaultMimeResolver;
  use std::fs;
  use tempfile::tempdir;

  fn with_loader<T>(f: impl FnOnce(&AssetNormalizer<'_>) -> T) -> T {
    let config = BundleConfig::default();
    let normalizer = AssetNormalizer::new(&config, &DefaultMimeResolver, "pre()", "post()");
    f(&normalizer)
  }

  #[test]
  fn collects_files_recursively_with_posix_keys() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("css/fonts")).unwrap();
    fs::create_dir_all(root.join("empty")).unwrap();
    fs::write(root.join("index.html"), "<html></html>").unwrap();
    fs::write(root.join("css/site.css"), "p {}").unwrap();
    fs::write(root.join("css/fonts/a.woff"), b"wOFF").unwrap();

    let tree = with_loader(|normalizer| TreeLoader::new(normalizer).load(root).unwrap());

    let keys: Vec<&str> = tree.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["css/fonts/a.woff", "css/site.css", "index.html"]);
    assert!(tree["css/fonts/a.woff"].base64_encoded);
  }

  #[test]
  fn excluded_names_never_become_keys() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("nested")).unwrap();
    fs::write(root.join("index.html"), "<html></html>").unwrap();
    fs::write(root.join("SELF_CONTAINED_index.html"), "old output").unwrap();
    fs::write(root.join("nested/SELF_CONTAINED_index.html"), "old output").unwrap();

    let tree = with_loader(|normalizer| {
      TreeLoader::new(normalizer)
        .exclude("SELF_CONTAINED_index.html")
        .unwrap()
        .load(root)
        .unwrap()
    });

    assert_eq!(tree.keys().collect::<Vec<_>>(), vec!["index.html"]);
  }

  #[test]
  fn exclusion_supports_globs() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("keep.txt"), "keep").unwrap();
    fs::write(root.join("skip.bak"), "skip").unwrap();

    let tree = with_loader(|normalizer| {
      TreeLoader::new(normalizer)
        .exclude("*.bak")
        .unwrap()
        .load(root)
        .unwrap()
    });

    assert!(tree.contains_key("keep.txt"));
    assert!(!tree.contains_key("skip.bak"));
  }

  #[test]
  fn excluded_names_prune_matching_directories() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("bundle.html/inner")).unwrap();
    fs::write(root.join("bundle.html/inner/page.html"), "<p></p>").unwrap();
    fs::write(root.join("index.html"), "<html></html>").unwrap();

    let tree = with_loader(|normalizer| {
      TreeLoader::new(normalizer)
        .exclude("bundle.html")
        .unwrap()
        .load(root)
        .unwrap()
    });

    assert_eq!(tree.keys().collect::<Vec<_>>(), vec!["index.html"]);
  }

  #[cfg(unix)]
  #[test]
  fn dangling_links_are_skipped() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("index.html"), "<html></html>").unwrap();
    std::os::unix::fs::symlink(root.join("gone.css"), root.join("broken.css")).unwrap();

    for follow_links in [true, false] {
      let tree = with_loader(|normalizer| {
        TreeLoader::new(normalizer)
          .follow_links(follow_links)
          .load(root)
          .unwrap()
      });
      assert_eq!(tree.keys().collect::<Vec<_>>(), vec!["index.html"]);
    }
  }

  #[cfg(unix)]
  #[test]
  fn unreadable_files_are_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("index.html"), "<html></html>").unwrap();
    let locked = root.join("locked.txt");
    fs::write(&locked, "secret").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read(&locked).is_ok() {
      // privileged users bypass file permissions
      return;
    }

    let tree = with_loader(|normalizer| TreeLoader::new(normalizer).load(root).unwrap());

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
    assert_eq!(tree.keys().collect::<Vec<_>>(), vec!["index.html"]);
  }

  #[test]
  fn missing_base_dir_is_not_found() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing");
    let file = dir.path().join("file.txt");
    fs::write(&file, "x").unwrap();

    with_loader(|normalizer| {
      let loader = TreeLoader::new(normalizer);
      assert!(matches!(loader.load(&missing), Err(BundleError::NotFound { .. })));
      assert!(matches!(loader.load(&file), Err(BundleError::NotFound { .. })));
    });
  }

  #[test]
  fn cyclic_stylesheets_abort_the_load() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.css"), "@import 'a.css';").unwrap();

    let result = with_loader(|normalizer| TreeLoader::new(normalizer).load(dir.path()));
    assert!(matches!(result, Err(BundleError::CyclicImport { .. })));
  }

  #[test]
  fn duplicate_keys_are_rejected() {
    let mut tree = FileTree::new();
    insert_record(&mut tree, "a.txt".into(), AssetRecord::text("1", "text/plain")).unwrap();
    let err = insert_record(&mut tree, "a.txt".into(), AssetRecord::text("2", "text/plain"))
      .unwrap_err();

    assert!(matches!(err, BundleError::DuplicateAsset { ref key } if key == "a.txt"));
    assert_eq!(tree["a.txt"].data, "1");
  }

  #[test]
  fn keys_use_forward_slashes() {
    let base = Path::new("site");
    let path = Path::new("site").join("img").join("logo.png");
    assert_eq!(tree_key(base, &path).as_deref(), Some("img/logo.png"));
    assert_eq!(tree_key(base, base), None);
    assert_eq!(tree_key(base, Path::new("other/x")), None);
  }
}
