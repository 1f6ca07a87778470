//! Content-addressed blob storage.
//!
//! Saving stages the bytes under a throwaway key, then renames the row to
//! the digest of those bytes. The digest is only known once the input has
//! been read to the end, and the rename is what makes the blob addressable,
//! so no reader can ever find a half-written blob under its final hash. A
//! rename that collides with an existing row means the same bytes were
//! already stored: the staged copy is discarded and the existing hash
//! returned.

use chrono::Utc;
use libreta_core::content::ContentHash;
use rusqlite::{ErrorCode, OptionalExtension as _};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt as _};
use uuid::Uuid;

use crate::{Error, Result, encode::encode_ts, pool::Pool};

const READ_CHUNK: usize = 64 * 1024;

/// Read `reader` to the end, hashing as we go.
async fn read_hashed<R>(mut reader: R) -> Result<(Vec<u8>, ContentHash)>
where
  R: AsyncRead + Unpin,
{
  let mut hasher = Sha256::new();
  let mut bytes = Vec::new();
  let mut chunk = vec![0u8; READ_CHUNK];
  loop {
    let n = reader.read(&mut chunk).await?;
    if n == 0 {
      break;
    }
    hasher.update(&chunk[..n]);
    bytes.extend_from_slice(&chunk[..n]);
  }
  Ok((bytes, ContentHash::new(hex::encode(hasher.finalize()))))
}

pub async fn save<R>(pool: &Pool, reader: R) -> Result<ContentHash>
where
  R: AsyncRead + Unpin,
{
  let (bytes, hash) = read_hashed(reader).await?;
  let staging_key = format!("tmp:{}", Uuid::new_v4());
  let now = encode_ts(Utc::now());

  let final_key = hash.as_str().to_owned();
  pool
    .write("content_save", move |tx| {
      tx.execute(
        "INSERT INTO node_content (hash, content, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![staging_key, bytes, now],
      )?;

      let renamed = tx.execute(
        "UPDATE node_content SET hash = ?1 WHERE hash = ?2",
        rusqlite::params![final_key, staging_key],
      );
      match renamed {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(err, _))
          if err.code == ErrorCode::ConstraintViolation =>
        {
          tx.execute(
            "DELETE FROM node_content WHERE hash = ?1",
            rusqlite::params![staging_key],
          )?;
          Ok(())
        }
        Err(e) => Err(e.into()),
      }
    })
    .await?;

  Ok(hash)
}

pub async fn load(pool: &Pool, hash: &ContentHash) -> Result<Vec<u8>> {
  let key = hash.as_str().to_owned();
  let bytes: Option<Vec<u8>> = pool
    .read("content_load", move |tx| {
      Ok(
        tx.query_row(
          "SELECT content FROM node_content WHERE hash = ?1",
          rusqlite::params![key],
          |row| row.get(0),
        )
        .optional()?,
      )
    })
    .await?;

  bytes.ok_or_else(|| Error::ContentNotFound(hash.clone()))
}
