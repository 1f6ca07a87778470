//! Handlers for `/query/*` endpoints.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use libreta_core::{node::NodeId, store::NoteStore};
use serde::Deserialize;

use crate::error::ApiError;

/// Results returned by `/query/search` when no `limit` is given.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct AttributeParams {
  pub key:   String,
  pub value: String,
}

/// `GET /query/attribute?key=sys.kind&value=root`
pub async fn by_attribute<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<AttributeParams>,
) -> Result<Json<Vec<NodeId>>, ApiError>
where
  S: NoteStore,
{
  let ids = store
    .query_by_attribute(&params.key, &params.value)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(ids))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
  /// FTS5 query expression, passed through as given.
  pub q:     String,
  pub limit: Option<usize>,
}

/// `GET /query/search?q=...[&limit=...]`
pub async fn search<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<SearchParams>,
) -> Result<Json<Vec<NodeId>>, ApiError>
where
  S: NoteStore,
{
  let ids = store
    .query_full_text_search(&params.q, params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(ids))
}
