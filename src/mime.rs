//! MIME type resolution for packaged assets.
//!
//! Content is sniffed first, then the file name is consulted, and anything still unknown
//! becomes `application/octet-stream`. Resolution never fails.

use std::path::Path;

/// Fallback for content that could not be identified.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Capability used by the normalizer and stylesheet rewriter to label assets.
pub trait MimeResolver {
  /// Best-effort MIME type for the file at `path` holding `bytes`. Never empty.
  fn resolve(&self, path: &Path, bytes: &[u8]) -> String;
}

/// Resolver combining magic-number sniffing with extension lookup through `mime_guess`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMimeResolver;

impl MimeResolver for DefaultMimeResolver {
  fn resolve(&self, path: &Path, bytes: &[u8]) -> String {
    if let Some(mime_type) = sniff(bytes) {
      return mime_type.to_string();
    }

    if let Some(mime_type) = from_extension(path) {
      return mime_type;
    }

    if !bytes.is_empty() && std::str::from_utf8(bytes).is_ok() {
      return "text/plain".to_string();
    }

    log::debug!(
      "unknown mime type ({}): {:?}...",
      path.display(),
      &bytes[..bytes.len().min(10)]
    );
    OCTET_STREAM.to_string()
  }
}

/// Resolve a MIME type with [`DefaultMimeResolver`].
pub fn guess_mime(path: &Path, bytes: &[u8]) -> String {
  DefaultMimeResolver.resolve(path, bytes)
}

struct Signature {
  offset: usize,
  magic: &'static [u8],
  mime_type: &'static str,
}

const SIGNATURES: &[Signature] = &[
  Signature { offset: 0, magic: b"\x89PNG\r\n\x1a\n", mime_type: "image/png" },
  Signature { offset: 0, magic: b"\xff\xd8\xff", mime_type: "image/jpeg" },
  Signature { offset: 0, magic: b"GIF87a", mime_type: "image/gif" },
  Signature { offset: 0, magic: b"GIF89a", mime_type: "image/gif" },
  Signature { offset: 8, magic: b"WEBP", mime_type: "image/webp" },
  Signature { offset: 0, magic: b"\x00\x00\x01\x00", mime_type: "image/x-icon" },
  Signature { offset: 0, magic: b"wOFF", mime_type: "font/woff" },
  Signature { offset: 0, magic: b"wOF2", mime_type: "font/woff2" },
  Signature { offset: 0, magic: b"\x00\x01\x00\x00\x00", mime_type: "font/ttf" },
  Signature { offset: 0, magic: b"OTTO", mime_type: "font/otf" },
  Signature { offset: 0, magic: b"%PDF-", mime_type: "application/pdf" },
  Signature { offset: 0, magic: b"PK\x03\x04", mime_type: "application/zip" },
  Signature { offset: 0, magic: b"\x1f\x8b", mime_type: "application/gzip" },
  Signature { offset: 0, magic: b"\x00asm", mime_type: "application/wasm" },
];

/// Identify content from its leading bytes.
fn sniff(bytes: &[u8]) -> Option<&'static str> {
  let binary = SIGNATURES.iter().find(|signature| {
    let matches = bytes
      .get(signature.offset..signature.offset + signature.magic.len())
      .is_some_and(|window| window == signature.magic);
    // the WebP tag sits inside a RIFF container
    matches && (signature.offset != 8 || bytes.starts_with(b"RIFF"))
  });

  match binary {
    Some(signature) => Some(signature.mime_type),
    None => sniff_markup(bytes),
  }
}

fn sniff_markup(bytes: &[u8]) -> Option<&'static str> {
  let head = &bytes[..bytes.len().min(512)];
  let head = head.strip_prefix(b"\xef\xbb\xbf").unwrap_or(head);
  let start = head.iter().position(|byte| !byte.is_ascii_whitespace())?;
  let prefix = String::from_utf8_lossy(&head[start..]).to_ascii_lowercase();

  if prefix.starts_with("<!doctype html") || prefix.starts_with("<html") {
    Some("text/html")
  } else if prefix.starts_with("<svg") || (prefix.starts_with("<?xml") && prefix.contains("<svg")) {
    Some("image/svg+xml")
  } else {
    None
  }
}

fn from_extension(path: &Path) -> Option<String> {
  let guess = mime_guess::from_path(path).first()?;
  Some(modern_essence(guess.essence_str()).to_string())
}

/// Map the legacy essences mime_guess still reports onto their registered replacements.
fn modern_essence(mime_type: &str) -> &str {
  match mime_type {
    "application/javascript" | "application/x-javascript" => "text/javascript",
    "application/font-woff" | "application/x-font-woff" => "font/woff",
    "application/font-woff2" | "application/x-font-woff2" => "font/woff2",
    "application/x-font-ttf" | "application/font-sfnt" | "application/x-font-truetype" => {
      "font/ttf"
    }
    "application/x-font-otf" | "application/x-font-opentype" | "application/font-otf" => {
      "font/otf"
    }
    other => other,
  }
}
