//! JSON-over-HTTP API for Libreta.
//!
//! Exposes an axum [`Router`] backed by any [`libreta_core::store::NoteStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", libreta_api::api_router(store.clone()))
//! ```

pub mod content;
pub mod edges;
pub mod error;
pub mod nodes;
pub mod query;
pub mod rpc;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use libreta_core::store::NoteStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: NoteStore + 'static,
{
  Router::new()
    // Ids
    .route("/rpc/generate_node_id", post(rpc::generate_node_id::<S>))
    // Nodes
    .route("/nodes", get(nodes::load::<S>).post(nodes::save::<S>))
    .route(
      "/nodes/{id}/content",
      get(nodes::content::<S>).head(nodes::content_head::<S>),
    )
    // Content
    .route("/content", post(content::upload::<S>))
    .route("/content/{hash}", get(content::download::<S>))
    // Edges
    .route("/edges", get(edges::for_nodes::<S>).post(edges::add::<S>))
    .route("/edges/remove", post(edges::remove::<S>))
    // Queries
    .route("/query/attribute", get(query::by_attribute::<S>))
    .route("/query/search", get(query::search::<S>))
    .with_state(store)
}

/// Split a comma-separated query parameter, dropping empty items.
fn split_ids<T: From<String>>(raw: &str) -> Vec<T> {
  raw
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| T::from(s.to_owned()))
    .collect()
}
