//! Handler for `POST /rpc/generate_node_id`.

use std::sync::Arc;

use axum::{Json, extract::State};
use libreta_core::{node::NodeId, store::NoteStore};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct GeneratedId {
  pub id: NodeId,
}

/// `POST /rpc/generate_node_id` → `{"id":"20240309-140509"}`
pub async fn generate_node_id<S>(State(store): State<Arc<S>>) -> Json<GeneratedId>
where
  S: NoteStore,
{
  Json(GeneratedId { id: store.generate_id() })
}
