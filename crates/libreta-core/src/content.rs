//! Content-addressed blobs.
//!
//! A blob's key is the lowercase hex SHA-256 of its bytes. Blobs are
//! write-once; any number of nodes may point at the same one.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Hex-encoded digest identifying a stored blob.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
  pub fn new(hash: impl Into<String>) -> Self { Self(hash.into()) }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn into_string(self) -> String { self.0 }
}

impl fmt::Display for ContentHash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<String> for ContentHash {
  fn from(s: String) -> Self { Self(s) }
}

impl From<&str> for ContentHash {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl AsRef<str> for ContentHash {
  fn as_ref(&self) -> &str { &self.0 }
}

/// Whether content of this MIME type is decoded and indexed for full-text
/// search. Everything else contributes only the node name.
///
/// Parameters such as `; charset=utf-8` do not affect the result.
pub fn is_text_mimetype(mimetype: &str) -> bool {
  let essence = mimetype.split(';').next().unwrap_or_default().trim();
  essence.starts_with("text/") || essence == "application/json"
}
