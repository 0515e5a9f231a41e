use regex::Regex;

fn reference_ignores() -> &'static [Regex] {
  use std::sync::OnceLock;

  static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
  PATTERNS
    .get_or_init(|| {
      vec![
        Regex::new(r"(?i)^[a-z][a-z0-9+.-]*://").expect("invalid scheme regex"),
        Regex::new(r"^//").expect("invalid protocol-relative regex"),
        Regex::new(r"(?i)^data:").expect("invalid data URI regex"),
        Regex::new(r"(?i)^(mailto|javascript|about|blob):").expect("invalid pseudo-scheme regex"),
        Regex::new(r"^#").expect("invalid fragment regex"),
      ]
    })
    .as_slice()
}

/// Determine whether a stylesheet reference must be left as written.
///
/// Data URIs are already inline, remote URLs are never fetched, and fragment-only references
/// point into the current document.
pub fn should_ignore_reference(value: &str) -> bool {
  let value = value.trim();
  value.is_empty()
    || reference_ignores()
      .iter()
      .any(|pattern| pattern.is_match(value))
}

/// Drop the query string and fragment from a local reference.
pub fn strip_query_and_fragment(value: &str) -> &str {
  let end = value.find(['?', '#']).unwrap_or(value.len());
  &value[..end]
}
