//! The `NoteStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `libreta-store-sqlite`). Higher layers (`libreta-api`) depend on this
//! abstraction, not on any concrete backend.
//!
//! Writes are serialised by the backend; reads may run concurrently with
//! each other and with one in-flight write, and never observe a partially
//! applied write.

use std::{collections::HashMap, future::Future};

use tokio::io::AsyncRead;

use crate::{
  StoreError,
  content::ContentHash,
  edge::{Edge, NewEdge},
  node::{NewNode, Node, NodeId},
};

/// Abstraction over a Libreta storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`). Dropping a future
/// cancels the operation; a write cancelled before it commits leaves no
/// trace.
pub trait NoteStore: Send + Sync {
  type Error: StoreError;

  // ── Ids ───────────────────────────────────────────────────────────────

  /// Allocate a fresh, sortable node id.
  fn generate_id(&self) -> NodeId;

  // ── Content ───────────────────────────────────────────────────────────

  /// Read `reader` to the end and store its bytes, returning their hash.
  ///
  /// Idempotent: saving identical bytes again returns the same hash and
  /// stores nothing new.
  fn content_save<'a, R>(
    &'a self,
    reader: R,
  ) -> impl Future<Output = Result<ContentHash, Self::Error>> + Send + 'a
  where
    R: AsyncRead + Unpin + Send + 'a;

  /// Load the bytes stored under `hash`. Fails with a
  /// [`NotFound`](crate::ErrorKind::NotFound) error if there are none.
  fn content_load<'a>(
    &'a self,
    hash: &'a ContentHash,
  ) -> impl Future<Output = Result<Vec<u8>, Self::Error>> + Send + 'a;

  // ── Nodes ─────────────────────────────────────────────────────────────

  /// Insert or overwrite a node and replace its attribute set, atomically.
  ///
  /// Attribute pairs already on the node keep their `created_at`; pairs
  /// absent from `node.attributes` are removed.
  fn node_save(
    &self,
    node: NewNode,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Load nodes with their attributes. Unknown ids are absent from the map.
  fn nodes_load<'a>(
    &'a self,
    ids: &'a [NodeId],
  ) -> impl Future<Output = Result<HashMap<NodeId, Node>, Self::Error>> + Send + 'a;

  // ── Edges ─────────────────────────────────────────────────────────────

  /// Add edges; triples that already exist are skipped.
  fn edges_add<'a>(
    &'a self,
    edges: &'a [NewEdge],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove edges; triples that do not exist are skipped.
  fn edges_remove<'a>(
    &'a self,
    edges: &'a [NewEdge],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Every edge with either endpoint in `ids`, unordered.
  fn edges_for_nodes<'a>(
    &'a self,
    ids: &'a [NodeId],
  ) -> impl Future<Output = Result<Vec<Edge>, Self::Error>> + Send + 'a;

  // ── Queries ───────────────────────────────────────────────────────────

  /// Ids of non-deleted nodes carrying exactly the pair `key`=`value`.
  fn query_by_attribute<'a>(
    &'a self,
    key: &'a str,
    value: &'a str,
  ) -> impl Future<Output = Result<Vec<NodeId>, Self::Error>> + Send + 'a;

  /// Up to `limit` ids of nodes whose name or text content matches `term`,
  /// best match first.
  fn query_full_text_search<'a>(
    &'a self,
    term: &'a str,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<NodeId>, Self::Error>> + Send + 'a;
}
