//! Read-only lookups: exact attribute match and full-text search.

use libreta_core::node::NodeId;

use crate::{Result, pool::Pool};

pub async fn by_attribute(pool: &Pool, key: &str, value: &str) -> Result<Vec<NodeId>> {
  let key = key.to_owned();
  let value = value.to_owned();

  pool
    .read("query_by_attribute", move |tx| {
      let mut stmt = tx.prepare(
        "SELECT a.node_id
         FROM node_attribute AS a
         JOIN node AS n ON n.id = a.node_id
         WHERE a.key = ?1 AND a.value = ?2 AND n.deleted_at IS NULL",
      )?;
      let ids = stmt
        .query_map(rusqlite::params![key, value], |row| row.get::<_, String>(0))?
        .map(|id| id.map(NodeId::new))
        .collect::<rusqlite::Result<Vec<_>>>()?;
      Ok(ids)
    })
    .await
}

/// `term` is handed to FTS5 as a query expression. The trigram tokenizer
/// matches substrings of three characters or more; shorter terms match
/// nothing, as does a blank term. Ties in rank fall back to insertion order.
pub async fn full_text(pool: &Pool, term: &str, limit: usize) -> Result<Vec<NodeId>> {
  if limit == 0 || term.trim().is_empty() {
    return Ok(Vec::new());
  }
  let term = term.to_owned();
  let limit = i64::try_from(limit).unwrap_or(i64::MAX);

  pool
    .read("query_full_text_search", move |tx| {
      let mut stmt = tx.prepare(
        "SELECT id FROM node_fts
         WHERE node_fts MATCH ?1
         ORDER BY rank, rowid
         LIMIT ?2",
      )?;
      let ids = stmt
        .query_map(rusqlite::params![term, limit], |row| row.get::<_, String>(0))?
        .map(|id| id.map(NodeId::new))
        .collect::<rusqlite::Result<Vec<_>>>()?;
      Ok(ids)
    })
    .await
}
