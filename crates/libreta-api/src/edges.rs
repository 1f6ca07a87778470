//! Handlers for `/edges` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/edges?node_ids=a,b` | Edges touching any listed node |
//! | `POST` | `/edges` | Body: `[{"src_id","dst_id","relation"}]`; 204 |
//! | `POST` | `/edges/remove` | Same body; 204 |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
};
use libreta_core::{
  edge::{Edge, NewEdge},
  node::NodeId,
  store::NoteStore,
};
use serde::Deserialize;

use crate::{error::ApiError, split_ids};

#[derive(Debug, Deserialize)]
pub struct ForNodesParams {
  /// Comma-separated node ids.
  #[serde(default)]
  pub node_ids: String,
}

/// `GET /edges?node_ids=a,b`
pub async fn for_nodes<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ForNodesParams>,
) -> Result<Json<Vec<Edge>>, ApiError>
where
  S: NoteStore,
{
  let ids: Vec<NodeId> = split_ids(&params.node_ids);
  let edges = store.edges_for_nodes(&ids).await.map_err(ApiError::store)?;
  Ok(Json(edges))
}

/// `POST /edges`
pub async fn add<S>(
  State(store): State<Arc<S>>,
  Json(edges): Json<Vec<NewEdge>>,
) -> Result<StatusCode, ApiError>
where
  S: NoteStore,
{
  store.edges_add(&edges).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /edges/remove`
pub async fn remove<S>(
  State(store): State<Arc<S>>,
  Json(edges): Json<Vec<NewEdge>>,
) -> Result<StatusCode, ApiError>
where
  S: NoteStore,
{
  store.edges_remove(&edges).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
