//! Handlers for `/nodes` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/nodes?ids=a,b` | Unknown ids are left out of the map |
//! | `POST` | `/nodes` | Body: a `NewNode`; 204 on success |
//! | `GET`  | `/nodes/{id}/content` | The node's blob, typed by its MIME type |
//! | `HEAD` | `/nodes/{id}/content` | Same headers, no body |

use std::{collections::HashMap, sync::Arc};

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{StatusCode, header},
  response::IntoResponse,
};
use libreta_core::{
  node::{NewNode, Node, NodeId},
  store::NoteStore,
};
use serde::Deserialize;

use crate::{error::ApiError, split_ids};

// ─── Load ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoadParams {
  /// Comma-separated node ids.
  #[serde(default)]
  pub ids: String,
}

/// `GET /nodes?ids=a,b`
pub async fn load<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<LoadParams>,
) -> Result<Json<HashMap<NodeId, Node>>, ApiError>
where
  S: NoteStore,
{
  let ids: Vec<NodeId> = split_ids(&params.ids);
  let nodes = store.nodes_load(&ids).await.map_err(ApiError::store)?;
  Ok(Json(nodes))
}

// ─── Save ─────────────────────────────────────────────────────────────────────

/// `POST /nodes`
pub async fn save<S>(
  State(store): State<Arc<S>>,
  Json(node): Json<NewNode>,
) -> Result<StatusCode, ApiError>
where
  S: NoteStore,
{
  if node.id.as_str().is_empty() {
    return Err(ApiError::BadRequest("node id must not be empty".into()));
  }
  store.node_save(node).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Content ──────────────────────────────────────────────────────────────────

async fn find<S>(store: &S, id: String) -> Result<Node, ApiError>
where
  S: NoteStore,
{
  let id = NodeId::new(id);
  store
    .nodes_load(std::slice::from_ref(&id))
    .await
    .map_err(ApiError::store)?
    .remove(&id)
    .ok_or_else(|| ApiError::NotFound(format!("node {id} not found")))
}

fn content_headers(node: &Node) -> [(header::HeaderName, String); 2] {
  [
    (header::CONTENT_TYPE, node.content_mimetype.clone()),
    (header::CONTENT_LENGTH, node.content_length.to_string()),
  ]
}

/// `GET /nodes/{id}/content`
pub async fn content<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: NoteStore,
{
  let node = find(store.as_ref(), id).await?;
  let bytes = store
    .content_load(&node.content_hash)
    .await
    .map_err(ApiError::store)?;
  Ok((content_headers(&node), bytes))
}

/// `HEAD /nodes/{id}/content`
pub async fn content_head<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: NoteStore,
{
  let node = find(store.as_ref(), id).await?;
  Ok((StatusCode::OK, content_headers(&node)))
}
