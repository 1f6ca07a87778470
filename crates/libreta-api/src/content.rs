//! Handlers for `/content` endpoints.
//!
//! Uploads take the raw request body; the `Content-Type` header is echoed
//! back so the caller can pass it on to `POST /nodes`.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::{HeaderMap, header},
  response::IntoResponse,
};
use bytes::Bytes;
use libreta_core::{content::ContentHash, store::NoteStore};
use serde::Serialize;

use crate::error::ApiError;

const DEFAULT_MIMETYPE: &str = "application/octet-stream";

#[derive(Debug, Serialize)]
pub struct UploadResult {
  pub hash:     ContentHash,
  pub length:   u64,
  pub mimetype: String,
}

/// `POST /content`, body: the raw bytes.
pub async fn upload<S>(
  State(store): State<Arc<S>>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<Json<UploadResult>, ApiError>
where
  S: NoteStore,
{
  let mimetype = headers
    .get(header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .unwrap_or(DEFAULT_MIMETYPE)
    .to_owned();

  let hash = store
    .content_save(&body[..])
    .await
    .map_err(ApiError::store)?;

  Ok(Json(UploadResult { hash, length: body.len() as u64, mimetype }))
}

/// `GET /content/{hash}`
pub async fn download<S>(
  State(store): State<Arc<S>>,
  Path(hash): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: NoteStore,
{
  let bytes = store
    .content_load(&ContentHash::new(hash))
    .await
    .map_err(ApiError::store)?;
  Ok(([(header::CONTENT_TYPE, DEFAULT_MIMETYPE)], bytes))
}
