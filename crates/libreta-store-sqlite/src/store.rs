//! [`SqliteStore`]: the SQLite implementation of [`NoteStore`].

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  sync::Arc,
};

use libreta_core::{
  content::ContentHash,
  edge::{Edge, NewEdge},
  id::IdGenerator,
  node::{NewNode, Node, NodeId},
  store::NoteStore,
};
use tokio::io::AsyncRead;
use tracing::{info, warn};

use crate::{
  Error, Result,
  config::StoreConfig,
  content, edge, node,
  pool::Pool,
  query,
  schema::{self, SCHEMA_VERSION},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Libreta note store backed by a single SQLite file.
///
/// Cloning is cheap; clones share the connections and the id generator.
#[derive(Clone)]
pub struct SqliteStore {
  inner: Arc<Inner>,
}

struct Inner {
  pool: Pool,
  ids:  IdGenerator,
  path: PathBuf,
}

impl SqliteStore {
  /// Open (or create) the database in `config.data_dir` and check its
  /// schema. A file stamped with an unknown schema version is refused.
  pub async fn open(config: StoreConfig) -> Result<Self> {
    let pool = Pool::open(&config).await?;
    let store = Self {
      inner: Arc::new(Inner {
        pool,
        ids: IdGenerator::new(),
        path: config.db_path(),
      }),
    };

    if let Err(e) = store.ensure_schema(config.allow_upgrade).await {
      if let Err(close_err) = store.close().await {
        warn!(error = %close_err, "failed to close store after schema check");
      }
      return Err(e);
    }

    info!(
      path = %store.inner.path.display(),
      read_connections = store.inner.pool.read_connections(),
      schema_version = SCHEMA_VERSION,
      "store opened"
    );
    Ok(store)
  }

  /// Path of the database file.
  pub fn path(&self) -> &Path { &self.inner.path }

  /// The stamped schema version, or `0` if the file was never stamped.
  pub async fn schema_version(&self) -> Result<i64> {
    self
      .inner
      .pool
      .read("schema_version", |tx| schema::read_version(tx))
      .await
  }

  /// Succeed if the file carries [`SCHEMA_VERSION`]; create the schema if
  /// it carries none; refuse anything else. No upgrade path exists, so
  /// `allow_upgrade` only changes what gets logged.
  pub async fn ensure_schema(&self, allow_upgrade: bool) -> Result<()> {
    let mut found = self.schema_version().await?;

    if found == 0 {
      // Re-checked under the write lock: another process may have created
      // the schema since the read above.
      found = self
        .inner
        .pool
        .write("ensure_schema", |tx| {
          let found = schema::read_version(tx)?;
          if found == 0 {
            schema::create(tx)?;
          }
          Ok(found)
        })
        .await?;
      if found == 0 {
        info!(version = SCHEMA_VERSION, "created schema");
        return Ok(());
      }
    }

    if found == SCHEMA_VERSION {
      return Ok(());
    }
    if allow_upgrade {
      warn!(found, expected = SCHEMA_VERSION, "schema upgrade is not supported");
    }
    Err(Error::SchemaMismatch { found, expected: SCHEMA_VERSION })
  }

  /// Close every connection. Clones of this store become unusable.
  pub async fn close(&self) -> Result<()> {
    self.inner.pool.close().await?;
    info!(path = %self.inner.path.display(), "store closed");
    Ok(())
  }
}

// ─── NoteStore impl ──────────────────────────────────────────────────────────

impl NoteStore for SqliteStore {
  type Error = Error;

  fn generate_id(&self) -> NodeId { self.inner.ids.generate() }

  // ── Content ───────────────────────────────────────────────────────────

  async fn content_save<'a, R>(&'a self, reader: R) -> Result<ContentHash>
  where
    R: AsyncRead + Unpin + Send + 'a,
  {
    content::save(&self.inner.pool, reader).await
  }

  async fn content_load(&self, hash: &ContentHash) -> Result<Vec<u8>> {
    content::load(&self.inner.pool, hash).await
  }

  // ── Nodes ─────────────────────────────────────────────────────────────

  async fn node_save(&self, node: NewNode) -> Result<()> {
    node::save(&self.inner.pool, node).await
  }

  async fn nodes_load(&self, ids: &[NodeId]) -> Result<HashMap<NodeId, Node>> {
    node::load(&self.inner.pool, ids).await
  }

  // ── Edges ─────────────────────────────────────────────────────────────

  async fn edges_add(&self, edges: &[NewEdge]) -> Result<()> {
    edge::add(&self.inner.pool, edges).await
  }

  async fn edges_remove(&self, edges: &[NewEdge]) -> Result<()> {
    edge::remove(&self.inner.pool, edges).await
  }

  async fn edges_for_nodes(&self, ids: &[NodeId]) -> Result<Vec<Edge>> {
    edge::for_nodes(&self.inner.pool, ids).await
  }

  // ── Queries ───────────────────────────────────────────────────────────

  async fn query_by_attribute(&self, key: &str, value: &str) -> Result<Vec<NodeId>> {
    query::by_attribute(&self.inner.pool, key, value).await
  }

  async fn query_full_text_search(
    &self,
    term: &str,
    limit: usize,
  ) -> Result<Vec<NodeId>> {
    query::full_text(&self.inner.pool, term, limit).await
  }
}
