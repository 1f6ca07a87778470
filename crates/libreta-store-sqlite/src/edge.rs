//! Edge insert, removal and neighbourhood lookup.
//!
//! Each batch is a single statement over a JSON array parameter, so a batch
//! applies entirely or not at all.

use chrono::Utc;
use libreta_core::{
  edge::{Edge, NewEdge},
  node::NodeId,
};

use crate::{
  Result,
  encode::{RawEdge, encode_batch, encode_ts},
  pool::Pool,
};

pub async fn add(pool: &Pool, edges: &[NewEdge]) -> Result<()> {
  if edges.is_empty() {
    return Ok(());
  }
  let batch = encode_batch(edges)?;
  let now = encode_ts(Utc::now());

  pool
    .write("edges_add", move |tx| {
      tx.execute(
        "INSERT INTO edge (src_id, dst_id, relation, created_at)
         SELECT json_extract(e.value, '$.src_id'),
                json_extract(e.value, '$.dst_id'),
                json_extract(e.value, '$.relation'),
                ?2
         FROM json_each(?1) AS e
         WHERE true
         ON CONFLICT DO NOTHING",
        rusqlite::params![batch, now],
      )?;
      Ok(())
    })
    .await
}

pub async fn remove(pool: &Pool, edges: &[NewEdge]) -> Result<()> {
  if edges.is_empty() {
    return Ok(());
  }
  let batch = encode_batch(edges)?;

  pool
    .write("edges_remove", move |tx| {
      tx.execute(
        "DELETE FROM edge
         WHERE EXISTS (
           SELECT 1 FROM json_each(?1) AS e
           WHERE json_extract(e.value, '$.src_id')   = edge.src_id
             AND json_extract(e.value, '$.dst_id')   = edge.dst_id
             AND json_extract(e.value, '$.relation') = edge.relation
         )",
        rusqlite::params![batch],
      )?;
      Ok(())
    })
    .await
}

/// Edges with either endpoint in `ids`; incoming and outgoing alike.
pub async fn for_nodes(pool: &Pool, ids: &[NodeId]) -> Result<Vec<Edge>> {
  if ids.is_empty() {
    return Ok(Vec::new());
  }
  let ids = encode_batch(ids)?;

  let raws: Vec<RawEdge> = pool
    .read("edges_for_nodes", move |tx| {
      let mut stmt = tx.prepare(
        "WITH ids(id) AS (SELECT value FROM json_each(?1))
         SELECT src_id, dst_id, relation, created_at
         FROM edge
         WHERE src_id IN (SELECT id FROM ids)
            OR dst_id IN (SELECT id FROM ids)",
      )?;
      let rows = stmt
        .query_map(rusqlite::params![ids], |row| {
          Ok(RawEdge {
            src_id:     row.get(0)?,
            dst_id:     row.get(1)?,
            relation:   row.get(2)?,
            created_at: row.get(3)?,
          })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      Ok(rows)
    })
    .await?;

  raws.into_iter().map(RawEdge::into_edge).collect()
}
