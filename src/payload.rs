//! Encoding of the global context embedded in a packaged document.
//!
//! The payload is `base64(zlib(json(context)))`, which the bootstrap script reverses in the
//! browser.

use std::io::{Read, Write};

use base64::{Engine as _, engine::general_purpose};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use thiserror::Error;

use crate::error::{BundleError, Result};
use crate::models::GlobalContext;

/// Reasons an embedded payload cannot be turned back into a [`GlobalContext`].
#[derive(Debug, Error)]
pub enum PayloadError {
  /// The payload is not valid base64.
  #[error("invalid base64: {0}")]
  Base64(#[from] base64::DecodeError),
  /// The decoded bytes are not a zlib stream.
  #[error("failed to inflate: {0}")]
  Inflate(#[from] std::io::Error),
  /// The inflated text is not a serialized global context.
  #[error("invalid global context: {0}")]
  Json(#[from] serde_json::Error),
}

/// Serialize, compress and base64-encode `context`.
pub fn encode_payload(context: &GlobalContext, level: u32) -> Result<String> {
  let json = serde_json::to_string(context)?;
  log::debug!("total asset size: {}", json.len());

  let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level.min(9)));
  let compressed = encoder
    .write_all(json.as_bytes())
    .and_then(|()| encoder.finish())
    .map_err(|err| BundleError::io("<payload>", err))?;
  log::debug!("total asset size (compressed): {}", compressed.len());

  Ok(general_purpose::STANDARD.encode(compressed))
}

/// Reverse [`encode_payload`].
pub fn decode_payload(payload: &str) -> std::result::Result<GlobalContext, PayloadError> {
  let compressed = general_purpose::STANDARD.decode(payload.trim())?;
  let mut json = String::new();
  ZlibDecoder::new(compressed.as_slice()).read_to_string(&mut json)?;
  Ok(serde_json::from_str(&json)?)
}
