//! Nodes: named, attributed records pointing at one content blob.
//!
//! A node is created on the first save of its id and overwritten in place by
//! later saves. `created_at` survives every overwrite; `updated_at` tracks
//! the latest one.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::ContentHash;

// ─── Well-known attributes ───────────────────────────────────────────────────

/// Attribute key classifying what a node is used for.
pub const ATTR_KIND: &str = "sys.kind";

/// [`ATTR_KIND`] value for the roots of a notebook tree.
pub const ATTR_KIND_ROOT: &str = "root";

// ─── Identifier ──────────────────────────────────────────────────────────────

/// Stable, globally unique node identifier.
///
/// Usually produced by [`IdGenerator`](crate::id::IdGenerator), but callers
/// may assign their own.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn into_string(self) -> String { self.0 }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<String> for NodeId {
  fn from(s: String) -> Self { Self(s) }
}

impl From<&str> for NodeId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl AsRef<str> for NodeId {
  fn as_ref(&self) -> &str { &self.0 }
}

// ─── Attributes ──────────────────────────────────────────────────────────────

/// A key/value pair as supplied by the caller.
///
/// A node may carry several values for one key, but each `(key, value)`
/// pair at most once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
  pub key:   String,
  pub value: String,
}

impl Attribute {
  pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
    Self { key: key.into(), value: value.into() }
  }
}

/// A stored attribute. `created_at` is the time the pair first appeared on
/// the node and is kept across saves that retain the pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAttribute {
  pub key:        String,
  pub value:      String,
  pub created_at: DateTime<Utc>,
}

// ─── Node ────────────────────────────────────────────────────────────────────

/// Input to [`NoteStore::node_save`](crate::store::NoteStore::node_save).
///
/// `attributes` is the complete attribute set: pairs missing from it are
/// removed from the stored node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNode {
  pub id:               NodeId,
  pub name:             String,
  pub content_hash:     ContentHash,
  pub content_mimetype: String,
  #[serde(default)]
  pub attributes:       Vec<Attribute>,
}

impl NewNode {
  pub fn new(
    id: NodeId,
    name: impl Into<String>,
    content_hash: ContentHash,
    content_mimetype: impl Into<String>,
  ) -> Self {
    Self {
      id,
      name: name.into(),
      content_hash,
      content_mimetype: content_mimetype.into(),
      attributes: Vec::new(),
    }
  }

  pub fn with_attribute(
    mut self,
    key: impl Into<String>,
    value: impl Into<String>,
  ) -> Self {
    self.attributes.push(Attribute::new(key, value));
    self
  }
}

/// A node as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
  pub id:               NodeId,
  pub name:             String,
  pub content_hash:     ContentHash,
  pub content_mimetype: String,
  /// Byte length of the referenced blob, measured at read time.
  pub content_length:   u64,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
  /// Soft-delete marker. Present in the data model; nothing sets it yet.
  pub deleted_at:       Option<DateTime<Utc>>,
  pub attributes:       Vec<NodeAttribute>,
}

impl Node {
  pub fn is_deleted(&self) -> bool { self.deleted_at.is_some() }

  /// All values stored under `key`.
  pub fn attribute_values<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Iterator<Item = &'a str> + 'a {
    self
      .attributes
      .iter()
      .filter(move |a| a.key == key)
      .map(|a| a.value.as_str())
  }
}
