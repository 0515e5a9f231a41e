//! Script injection into packaged HTML documents.

use std::sync::OnceLock;

use regex::Regex;

/// Source name attached to the script inserted at the top of `<head>`.
pub const PRE_SOURCE_NAME: &str = "inject_pre.js";
/// Source name attached to the script appended to `<body>`.
pub const POST_SOURCE_NAME: &str = "inject_post.js";

fn head_open_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"(?i)<head(?:\s[^>]*)?>").expect("invalid head regex"))
}

fn body_open_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"(?i)<body(?:\s[^>]*)?>").expect("invalid body regex"))
}

fn closing_pattern(tag: &'static str) -> Regex {
  Regex::new(&format!(r"(?i)</{tag}\s*>")).expect("invalid closing tag regex")
}

fn script_close_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"(?i)</(script)").expect("invalid script regex"))
}

/// Insert `before` as the first child of `<head>` and `after` as the last child of `<body>`.
///
/// Either injection is skipped when its script is empty or the element is missing. The rest
/// of the document is left untouched.
pub fn inject_scripts(html: &str, before: &str, after: &str) -> String {
  let mut insertions: Vec<(usize, String)> = Vec::new();

  if !before.is_empty()
    && let Some(head) = head_open_pattern().find(html)
  {
    insertions.push((head.end(), script_element(before, PRE_SOURCE_NAME)));
  }

  if !after.is_empty()
    && let Some(body) = body_open_pattern().find(html)
  {
    let offset = body_end_offset(html, body.end());
    insertions.push((offset, script_element(after, POST_SOURCE_NAME)));
  }

  insertions.sort_by_key(|(offset, _)| *offset);

  let mut output = String::with_capacity(
    html.len() + insertions.iter().map(|(_, script)| script.len()).sum::<usize>(),
  );
  let mut last = 0;
  for (offset, script) in insertions {
    output.push_str(&html[last..offset]);
    output.push_str(&script);
    last = offset;
  }
  output.push_str(&html[last..]);
  output
}

/// Position just inside the end of `<body>`, tolerating an omitted closing tag.
fn body_end_offset(html: &str, body_start: usize) -> usize {
  let rest = &html[body_start..];
  if let Some(close) = closing_pattern("body").find_iter(rest).last() {
    return body_start + close.start();
  }
  if let Some(close) = closing_pattern("html").find_iter(rest).last() {
    return body_start + close.start();
  }
  html.len()
}

fn script_element(source: &str, source_name: &str) -> String {
  let escaped = script_close_pattern().replace_all(source, r"<\/$1");
  format!("<script>{escaped}\n//# sourceURL={source_name}</script>")
}
