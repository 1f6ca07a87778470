//! SQL schema for the Libreta SQLite store.
//!
//! A fresh file gets the whole schema in one transaction, stamped with
//! [`SCHEMA_VERSION`] in the `schema_version` table. A file stamped with any
//! other version is refused; there is no upgrade path yet.

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use crate::{Result, encode::encode_ts};

/// The only schema version this build reads and writes.
pub const SCHEMA_VERSION: i64 = 1;

/// Full schema DDL. Applied once, to an empty file.
pub const SCHEMA: &str = "
CREATE TABLE schema_version (
    version     INTEGER NOT NULL PRIMARY KEY,
    created_at  TEXT    NOT NULL
) STRICT;

-- Write-once blobs keyed by the hex SHA-256 of their bytes.
CREATE TABLE node_content (
    hash        TEXT NOT NULL PRIMARY KEY,
    content     BLOB NOT NULL,
    created_at  TEXT NOT NULL
) STRICT;

-- fts_rowid aliases the rowid and keys the full-text index.
CREATE TABLE node (
    fts_rowid         INTEGER PRIMARY KEY,
    id                TEXT NOT NULL UNIQUE,
    name              TEXT NOT NULL,
    content_hash      TEXT NOT NULL REFERENCES node_content(hash),
    content_mimetype  TEXT NOT NULL,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    deleted_at        TEXT
) STRICT;

CREATE TABLE node_attribute (
    node_id     TEXT NOT NULL REFERENCES node(id),
    key         TEXT NOT NULL,
    value       TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    PRIMARY KEY (node_id, key, value)
) STRICT;

CREATE INDEX node_attribute_key_value_idx ON node_attribute(key, value);

CREATE TABLE edge (
    src_id      TEXT NOT NULL REFERENCES node(id),
    dst_id      TEXT NOT NULL REFERENCES node(id),
    relation    TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    PRIMARY KEY (src_id, dst_id, relation)
) STRICT;

CREATE INDEX edge_dst_relation_idx ON edge(dst_id, relation);

-- What the index sees for each node: its name, plus its content when the
-- MIME type is textual.
CREATE VIEW node_fts_source AS
    SELECT
        n.fts_rowid AS fts_rowid,
        n.id        AS id,
        n.name      AS name,
        IIF(is_text_mimetype(n.content_mimetype), CAST(c.content AS TEXT), '') AS content
    FROM node AS n
    JOIN node_content AS c ON c.hash = n.content_hash;

CREATE VIRTUAL TABLE node_fts USING fts5(
    id UNINDEXED,
    name,
    content,
    content = 'node_fts_source',
    content_rowid = 'fts_rowid',
    tokenize = 'trigram'
);

-- The index is external-content: every change to `node` must be mirrored
-- here inside the same statement, using exactly the text that was indexed.
CREATE TRIGGER node_fts_insert AFTER INSERT ON node BEGIN
    INSERT INTO node_fts (rowid, id, name, content)
        SELECT new.fts_rowid, new.id, new.name,
               IIF(is_text_mimetype(new.content_mimetype), CAST(c.content AS TEXT), '')
        FROM node_content AS c
        WHERE c.hash = new.content_hash;
END;

CREATE TRIGGER node_fts_delete AFTER DELETE ON node BEGIN
    INSERT INTO node_fts (node_fts, rowid, id, name, content)
        SELECT 'delete', old.fts_rowid, old.id, old.name,
               IIF(is_text_mimetype(old.content_mimetype), CAST(c.content AS TEXT), '')
        FROM node_content AS c
        WHERE c.hash = old.content_hash;
END;

CREATE TRIGGER node_fts_update AFTER UPDATE ON node BEGIN
    INSERT INTO node_fts (node_fts, rowid, id, name, content)
        SELECT 'delete', old.fts_rowid, old.id, old.name,
               IIF(is_text_mimetype(old.content_mimetype), CAST(c.content AS TEXT), '')
        FROM node_content AS c
        WHERE c.hash = old.content_hash;
    INSERT INTO node_fts (rowid, id, name, content)
        SELECT new.fts_rowid, new.id, new.name,
               IIF(is_text_mimetype(new.content_mimetype), CAST(c.content AS TEXT), '')
        FROM node_content AS c
        WHERE c.hash = new.content_hash;
END;
";

/// Read the stamped version; `0` for a file that was never stamped.
pub fn read_version(conn: &rusqlite::Connection) -> Result<i64> {
  let stamped: Option<i64> = conn
    .query_row(
      "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
      [],
      |_| Ok(()),
    )
    .optional()?
    .map(|()| {
      conn.query_row("SELECT MAX(version) FROM schema_version", [], |r| {
        r.get::<_, Option<i64>>(0)
      })
    })
    .transpose()?
    .flatten();
  Ok(stamped.unwrap_or(0))
}

/// Create every table, index, view and trigger, then stamp the version.
/// Must run on an unstamped file inside the caller's transaction.
pub fn create(conn: &rusqlite::Connection) -> Result<()> {
  conn.execute_batch(SCHEMA)?;
  conn.execute(
    "INSERT INTO schema_version (version, created_at) VALUES (?1, ?2)",
    rusqlite::params![SCHEMA_VERSION, encode_ts(Utc::now())],
  )?;
  Ok(())
}
