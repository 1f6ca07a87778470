//! Directed, relation-typed links between nodes.
//!
//! The store is a multigraph keyed by relation: the same pair of nodes may be
//! linked once per relation. Relation names are open strings; the constants
//! below are the ones the application itself uses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::node::NodeId;

/// `dst` is the parent of `src` in the notebook tree.
pub const REL_CHILD: &str = "child";

/// `src` mentions `dst`.
pub const REL_LINK: &str = "link";

/// `dst` follows `src` in a sequence.
pub const REL_CHAIN: &str = "chain";

/// An edge triple as supplied to add/remove operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NewEdge {
  pub src_id:   NodeId,
  pub dst_id:   NodeId,
  pub relation: String,
}

impl NewEdge {
  pub fn new(src_id: NodeId, dst_id: NodeId, relation: impl Into<String>) -> Self {
    Self { src_id, dst_id, relation: relation.into() }
  }
}

/// A stored edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
  pub src_id:     NodeId,
  pub dst_id:     NodeId,
  pub relation:   String,
  pub created_at: DateTime<Utc>,
}

impl Edge {
  /// The identifying triple of this edge.
  pub fn key(&self) -> NewEdge {
    NewEdge::new(self.src_id.clone(), self.dst_id.clone(), self.relation.clone())
  }

  /// Whether `id` is either endpoint.
  pub fn touches(&self, id: &NodeId) -> bool {
    &self.src_id == id || &self.dst_id == id
  }
}
