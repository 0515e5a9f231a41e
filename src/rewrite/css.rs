//! Inline the resources a stylesheet references as `data:` URIs.
//!
//! Matching is pattern based rather than a CSS tokenizer, so a literal `url(` inside a
//! string or comment is rewritten as well.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use base64::{Engine as _, engine::general_purpose};
use regex::{Captures, Regex};

use crate::error::{BundleError, Result};
use crate::mime::MimeResolver;
use crate::rewrite::filters::{should_ignore_reference, strip_query_and_fragment};

fn import_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r#"(?i)@import\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<bare>[^\s;"']+))"#)
      .expect("invalid @import regex")
  })
}

fn url_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(
      r#"(?i)(?P<statement>url\(\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<bare>[^)"'\s]*))\s*\))(?:\s*format\(\s*['"](?P<format>[^'"]*)['"]\s*\))?"#,
    )
    .expect("invalid url() regex")
  })
}

/// Rewrite `@import "x";` and `@import x;` into `@import url('x');` so every reference goes
/// through `url()`.
pub fn normalize_imports(css: &str) -> String {
  import_pattern()
    .replace_all(css, |caps: &Captures| {
      if let Some(bare) = caps.name("bare")
        && bare.as_str().to_ascii_lowercase().starts_with("url(")
      {
        return caps[0].to_string();
      }
      let target = caps
        .name("dq")
        .or_else(|| caps.name("sq"))
        .or_else(|| caps.name("bare"))
        .map_or("", |m| m.as_str());
      format!("@import url('{target}')")
    })
    .into_owned()
}

/// Replace every local `url(...)` reference in `css` with an inline `data:` URI.
///
/// References resolve against the directory of `css_path`. Imported stylesheets are rewritten
/// recursively before being embedded. Unreadable targets keep their original reference.
pub fn embed_css_resources(
  css: &str,
  css_path: &Path,
  resolver: &dyn MimeResolver,
) -> Result<String> {
  CssInliner {
    resolver,
    chain: Vec::new(),
  }
  .rewrite(css, css_path)
}

struct CssInliner<'a> {
  resolver: &'a dyn MimeResolver,
  chain: Vec<PathBuf>,
}

impl CssInliner<'_> {
  fn rewrite(&mut self, css: &str, css_path: &Path) -> Result<String> {
    self.chain.push(identity(css_path));
    let result = self.rewrite_urls(&normalize_imports(css), css_path);
    self.chain.pop();
    result
  }

  fn rewrite_urls(&mut self, css: &str, css_path: &Path) -> Result<String> {
    let base_dir = css_path.parent().unwrap_or_else(|| Path::new(""));
    let mut output = String::with_capacity(css.len());
    let mut last_end = 0;

    for caps in url_pattern().captures_iter(css) {
      let Some(statement) = caps.name("statement") else {
        continue;
      };
      let reference = caps
        .name("dq")
        .or_else(|| caps.name("sq"))
        .or_else(|| caps.name("bare"))
        .map_or("", |m| m.as_str());
      if should_ignore_reference(reference) {
        continue;
      }

      let format = caps.name("format").map(|m| m.as_str());
      let target = resolve_local(base_dir, strip_query_and_fragment(reference.trim()));
      let Some(data_uri) = self.to_data_uri(&target, format)? else {
        continue;
      };

      output.push_str(&css[last_end..statement.start()]);
      output.push_str(&format!("url(\"{data_uri}\")"));
      last_end = statement.end();
    }

    output.push_str(&css[last_end..]);
    Ok(output)
  }

  fn to_data_uri(&mut self, target: &Path, format: Option<&str>) -> Result<Option<String>> {
    let mut content = match fs::read(target) {
      Ok(content) => content,
      Err(err) => {
        log::warn!("leaving reference to {} in place: {err}", target.display());
        return Ok(None);
      }
    };

    let extension = target
      .extension()
      .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
      .unwrap_or_default();

    let mime_type = if let Some(format) = format.filter(|value| !value.is_empty()) {
      format!("font/{format}")
    } else if extension == "eot" {
      "font/eot".to_string()
    } else if extension == "css" {
      let key = identity(target);
      if self.chain.contains(&key) {
        return Err(BundleError::CyclicImport {
          path: target.to_path_buf(),
          chain: self.chain.clone(),
        });
      }
      let nested = String::from_utf8_lossy(&content).into_owned();
      content = self.rewrite(&nested, target)?.into_bytes();
      "text/css".to_string()
    } else {
      self.resolver.resolve(target, &content)
    };

    let encoded = general_purpose::STANDARD.encode(&content);
    Ok(Some(format!(
      "data:{mime_type};charset=utf-8;base64, {encoded}"
    )))
  }
}

/// Join `reference` onto `base_dir`, treating root-relative and drive-prefixed references
/// as relative so the target stays below the stylesheet's directory.
fn resolve_local(base_dir: &Path, reference: &str) -> PathBuf {
  let mut target = base_dir.to_path_buf();
  for component in Path::new(reference).components() {
    match component {
      Component::Normal(segment) => target.push(segment),
      Component::ParentDir => target.push(".."),
      Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
    }
  }
  target
}

/// Stable identity of a stylesheet for cycle detection.
fn identity(path: &Path) -> PathBuf {
  fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::mime::DefaultMimeResolver;
  use tempfile::tempdir;

  fn decode_data_uri(css: &str) -> Vec<u8> {
    let start = css.find("base64, ").unwrap() + "base64, ".len();
    let end = start + css[start..].find('"').unwrap();
    general_purpose::STANDARD.decode(&css[start..end]).unwrap()
  }

  #[test]
  fn normalizes_quoted_imports() {
    assert_eq!(
      normalize_imports("@import \"base.css\";\n@IMPORT 'print.css' print;"),
      "@import url('base.css');\n@import url('print.css') print;"
    );
    assert_eq!(
      normalize_imports("@import url(\"keep.css\");"),
      "@import url(\"keep.css\");"
    );
  }

  #[test]
  fn normalizes_unquoted_imports() {
    assert_eq!(normalize_imports("@import base.css;"), "@import url('base.css');");
    assert_eq!(
      normalize_imports("@import theme/dark.css screen;"),
      "@import url('theme/dark.css') screen;"
    );
    assert_eq!(
      normalize_imports("@import URL(keep.css) print;"),
      "@import URL(keep.css) print;"
    );
  }

  #[test]
  fn root_relative_references_stay_below_the_stylesheet() {
    let site = tempdir().unwrap();
    let outside = tempdir().unwrap();
    let secret = outside.path().join("secret.txt");
    fs::write(&secret, "host secret").unwrap();
    fs::create_dir_all(site.path().join("img")).unwrap();
    fs::write(site.path().join("img/a.gif"), b"GIF89a\x01\x00").unwrap();
    let css_path = site.path().join("style.css");

    let css = format!("a{{background:url({})}}", secret.display());
    let rewritten = embed_css_resources(&css, &css_path, &DefaultMimeResolver).unwrap();
    assert_eq!(rewritten, css);

    let rewritten =
      embed_css_resources("b{background:url(/img/a.gif)}", &css_path, &DefaultMimeResolver)
        .unwrap();
    assert!(rewritten.starts_with("b{background:url(\"data:image/gif;charset=utf-8;base64, "));
    assert_eq!(decode_data_uri(&rewritten), b"GIF89a\x01\x00");
  }

  #[test]
  fn embeds_fonts_with_format_hint() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("fonts")).unwrap();
    fs::write(dir.path().join("fonts/icons.woff2"), b"wOF2font").unwrap();
    let css_path = dir.path().join("style.css");
    let css = "@font-face { src: url('fonts/icons.woff2?v=4') format('woff2'); }";

    let rewritten = embed_css_resources(css, &css_path, &DefaultMimeResolver).unwrap();

    assert!(rewritten.starts_with(
      "@font-face { src: url(\"data:font/woff2;charset=utf-8;base64, "
    ));
    assert!(rewritten.ends_with("\") format('woff2'); }"));
    assert_eq!(decode_data_uri(&rewritten), b"wOF2font");
  }

  #[test]
  fn labels_eot_and_sniffed_resources() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("legacy.eot"), b"eot").unwrap();
    fs::write(dir.path().join("bg.bin"), b"GIF89a\x01\x00").unwrap();
    let css_path = dir.path().join("style.css");
    let css = "a { src: url(legacy.eot?#iefix); } b { background: url(\"bg.bin\"); }";

    let rewritten = embed_css_resources(css, &css_path, &DefaultMimeResolver).unwrap();

    assert!(rewritten.contains("url(\"data:font/eot;charset=utf-8;base64, "));
    assert!(rewritten.contains("url(\"data:image/gif;charset=utf-8;base64, "));
  }

  #[test]
  fn leaves_data_remote_and_missing_references() {
    let dir = tempdir().unwrap();
    let css_path = dir.path().join("style.css");
    let css = "a { background: url(data:image/png;base64,AAAA); }\n\
b { background: url('https://example.com/x.png'); }\n\
c { background: url(missing.png); }\n\
d { fill: url(#gradient); }";

    let rewritten = embed_css_resources(css, &css_path, &DefaultMimeResolver).unwrap();
    assert_eq!(rewritten, css);
  }

  #[test]
  fn inlines_import_chains_recursively() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("nested/img")).unwrap();
    fs::write(dir.path().join("nested/img/dot.png"), b"\x89PNG\r\n\x1a\nrest").unwrap();
    fs::write(
      dir.path().join("nested/base.css"),
      "body { background: url(img/dot.png); }",
    )
    .unwrap();
    let theme = dir.path().join("theme.css");
    let css = "@import \"nested/base.css\";\nh1 { color: red; }";

    let rewritten = embed_css_resources(css, &theme, &DefaultMimeResolver).unwrap();

    assert!(rewritten.starts_with("@import url(\"data:text/css;charset=utf-8;base64, "));
    assert!(rewritten.ends_with(";\nh1 { color: red; }"));
    let inner = String::from_utf8(decode_data_uri(&rewritten)).unwrap();
    assert!(inner.starts_with("body { background: url(\"data:image/png;charset=utf-8;base64, "));
    assert!(!inner.contains("img/dot.png"));
  }

  #[test]
  fn rewritten_stylesheets_reference_no_resolvable_local_paths() {
    let dir = tempdir().unwrap();
    for name in ["a.png", "b.woff", "c.ttf"] {
      fs::write(dir.path().join(name), name.as_bytes()).unwrap();
    }
    let css_path = dir.path().join("style.css");
    let css = "x{background:url(a.png)} y{src:url( \"b.woff\" )} z{src:url('c.ttf')}";

    let rewritten = embed_css_resources(css, &css_path, &DefaultMimeResolver).unwrap();

    for caps in url_pattern().captures_iter(&rewritten) {
      let reference = caps
        .name("dq")
        .or_else(|| caps.name("sq"))
        .or_else(|| caps.name("bare"))
        .map_or("", |m| m.as_str());
      assert!(reference.starts_with("data:"), "unexpected reference {reference}");
    }
  }

  #[test]
  fn detects_cyclic_imports() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.css"), "@import 'b.css';").unwrap();
    fs::write(dir.path().join("b.css"), "@import 'a.css';").unwrap();
    let a = dir.path().join("a.css");

    let err = embed_css_resources("@import 'b.css';", &a, &DefaultMimeResolver).unwrap_err();
    match err {
      BundleError::CyclicImport { path, chain } => {
        assert_eq!(path.file_name().unwrap(), "a.css");
        assert_eq!(chain.len(), 2);
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn detects_self_imports() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("self.css");
    fs::write(&path, "@import url(self.css);").unwrap();

    let err = embed_css_resources("@import url(self.css);", &path, &DefaultMimeResolver);
    assert!(matches!(err, Err(BundleError::CyclicImport { .. })));
  }
}
