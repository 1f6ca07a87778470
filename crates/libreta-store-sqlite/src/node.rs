//! Node upsert and batch load.

use std::collections::HashMap;

use chrono::Utc;
use libreta_core::node::{NewNode, Node, NodeAttribute, NodeId};

use crate::{
  Result,
  encode::{RawAttribute, RawNode, encode_batch, encode_ts},
  pool::Pool,
};

/// Upsert the node row, then make its attribute set equal to
/// `node.attributes`. Both happen in one transaction; the full-text index
/// follows the node row through the schema's triggers.
pub async fn save(pool: &Pool, node: NewNode) -> Result<()> {
  let now = encode_ts(Utc::now());
  let attributes = encode_batch(&node.attributes)?;
  let NewNode { id, name, content_hash, content_mimetype, .. } = node;

  pool
    .write("node_save", move |tx| {
      tx.execute(
        "INSERT INTO node (id, name, content_hash, content_mimetype, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT (id) DO UPDATE SET
           name             = excluded.name,
           content_hash     = excluded.content_hash,
           content_mimetype = excluded.content_mimetype,
           updated_at       = excluded.updated_at",
        rusqlite::params![
          id.as_str(),
          name,
          content_hash.as_str(),
          content_mimetype,
          now,
        ],
      )?;

      // Pairs no longer present go; pairs already present keep their row
      // (and so their created_at); new pairs are inserted.
      tx.execute(
        "DELETE FROM node_attribute
         WHERE node_id = ?1
           AND NOT EXISTS (
             SELECT 1 FROM json_each(?2) AS a
             WHERE json_extract(a.value, '$.key')   = node_attribute.key
               AND json_extract(a.value, '$.value') = node_attribute.value
           )",
        rusqlite::params![id.as_str(), attributes],
      )?;
      tx.execute(
        "INSERT INTO node_attribute (node_id, key, value, created_at)
         SELECT ?1, json_extract(a.value, '$.key'), json_extract(a.value, '$.value'), ?3
         FROM json_each(?2) AS a
         WHERE true
         ON CONFLICT DO NOTHING",
        rusqlite::params![id.as_str(), attributes, now],
      )?;
      Ok(())
    })
    .await
}

/// Load nodes and their attributes with two queries over one snapshot,
/// however many ids are requested.
pub async fn load(pool: &Pool, ids: &[NodeId]) -> Result<HashMap<NodeId, Node>> {
  if ids.is_empty() {
    return Ok(HashMap::new());
  }
  let ids = encode_batch(ids)?;

  let (raw_attributes, raw_nodes) = pool
    .read("nodes_load", move |tx| {
      let mut stmt = tx.prepare(
        "SELECT node_id, key, value, created_at
         FROM node_attribute
         WHERE node_id IN (SELECT value FROM json_each(?1))
         ORDER BY node_id, key, value",
      )?;
      let attributes = stmt
        .query_map(rusqlite::params![ids], |row| {
          Ok(RawAttribute {
            node_id:    row.get(0)?,
            key:        row.get(1)?,
            value:      row.get(2)?,
            created_at: row.get(3)?,
          })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

      let mut stmt = tx.prepare(
        "SELECT n.id, n.name, n.content_hash, n.content_mimetype, length(c.content),
                n.created_at, n.updated_at, n.deleted_at
         FROM node AS n
         JOIN node_content AS c ON c.hash = n.content_hash
         WHERE n.id IN (SELECT value FROM json_each(?1))",
      )?;
      let nodes = stmt
        .query_map(rusqlite::params![ids], |row| {
          Ok(RawNode {
            id:               row.get(0)?,
            name:             row.get(1)?,
            content_hash:     row.get(2)?,
            content_mimetype: row.get(3)?,
            content_length:   row.get(4)?,
            created_at:       row.get(5)?,
            updated_at:       row.get(6)?,
            deleted_at:       row.get(7)?,
          })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

      Ok((attributes, nodes))
    })
    .await?;

  let mut attributes: HashMap<NodeId, Vec<NodeAttribute>> = HashMap::new();
  for raw in raw_attributes {
    let (node_id, attribute) = raw.into_attribute()?;
    attributes.entry(node_id).or_default().push(attribute);
  }

  raw_nodes
    .into_iter()
    .map(|raw| {
      let id = NodeId::new(raw.id.clone());
      let node_attributes = attributes.remove(&id).unwrap_or_default();
      Ok((id, raw.into_node(node_attributes)?))
    })
    .collect()
}
