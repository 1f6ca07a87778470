//! Connection management.
//!
//! One read-write connection, guarded so at most one write runs at a time,
//! plus a fixed set of read-only connections handed out round-robin. Every
//! connection lives on its own `tokio_rusqlite` thread, so no database call
//! blocks the async runtime. WAL journaling lets readers proceed while the
//! writer commits; each read sees either the state before a write or after
//! it, never in between.

use std::{
  io,
  path::Path,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
  time::{Duration, Instant},
};

use libreta_core::content::is_text_mimetype;
use rusqlite::{
  OpenFlags, Transaction, TransactionBehavior, functions::FunctionFlags,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
  Error, Result,
  cancel::CancelOnDrop,
  config::StoreConfig,
};

pub struct Pool {
  writer:       Arc<Mutex<tokio_rusqlite::Connection>>,
  readers:      Vec<tokio_rusqlite::Connection>,
  next_reader:  AtomicUsize,
  busy_timeout: Duration,
  slow_query:   Duration,
}

impl Pool {
  /// Open the writer (creating the file if needed), then the readers.
  pub async fn open(config: &StoreConfig) -> Result<Self> {
    check_data_dir(&config.data_dir)?;
    let path = config.db_path();
    let pragmas = Pragmas {
      busy_timeout: config.busy_timeout(),
      cache_size:   config.cache_size,
    };

    let writer = tokio_rusqlite::Connection::open_with_flags(
      &path,
      OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .await?;
    writer
      .call(move |conn| {
        pragmas.apply_writer(conn)?;
        register_functions(conn)?;
        Ok(())
      })
      .await?;
    debug!(path = %path.display(), "opened write connection");

    let count = config.read_connections();
    let mut readers = Vec::with_capacity(count);
    for _ in 0..count {
      let reader = tokio_rusqlite::Connection::open_with_flags(
        &path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
      )
      .await?;
      reader
        .call(move |conn| {
          pragmas.apply_reader(conn)?;
          register_functions(conn)?;
          Ok(())
        })
        .await?;
      readers.push(reader);
    }
    debug!(path = %path.display(), count, "opened read connections");

    Ok(Self {
      writer: Arc::new(Mutex::new(writer)),
      readers,
      next_reader: AtomicUsize::new(0),
      busy_timeout: config.busy_timeout(),
      slow_query: config.slow_query(),
    })
  }

  pub fn read_connections(&self) -> usize { self.readers.len() }

  /// Run `f` inside an immediate transaction on the writer and commit.
  ///
  /// Fails with [`Error::Busy`] if another write holds the writer for longer
  /// than the busy timeout. If the returned future is dropped before the
  /// commit, the transaction is rolled back.
  ///
  /// The writer lock travels into the closure and is released on the
  /// connection thread, so a dropped write keeps holding it until its
  /// closure has actually finished.
  pub async fn write<F, R>(&self, op: &'static str, f: F) -> Result<R>
  where
    F: FnOnce(&Transaction<'_>) -> Result<R> + Send + 'static,
    R: Send + 'static,
  {
    let (guard, cancellation) = CancelOnDrop::new();
    let held = tokio::time::timeout(
      self.busy_timeout,
      Arc::clone(&self.writer).lock_owned(),
    )
    .await
    .map_err(|_| Error::Busy)?;
    let writer = (*held).clone();

    let started = Instant::now();
    let result = writer
      .call(move |conn| -> tokio_rusqlite::Result<R> {
        let _held = held;
        cancellation.check()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        cancellation.check()?;
        tx.commit()?;
        Ok(value)
      })
      .await;
    guard.disarm();

    self.observe(op, started);
    Ok(result?)
  }

  /// Run `f` inside a read transaction on the next reader, so every query in
  /// `f` sees the same snapshot.
  pub async fn read<F, R>(&self, op: &'static str, f: F) -> Result<R>
  where
    F: FnOnce(&Transaction<'_>) -> Result<R> + Send + 'static,
    R: Send + 'static,
  {
    let index = self.next_reader.fetch_add(1, Ordering::Relaxed) % self.readers.len();

    let started = Instant::now();
    let result = self.readers[index]
      .call(move |conn| -> tokio_rusqlite::Result<R> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
      })
      .await;

    self.observe(op, started);
    Ok(result?)
  }

  pub async fn close(&self) -> Result<()> {
    let writer = self.writer.lock().await.clone();
    writer.close().await?;
    for reader in &self.readers {
      reader.clone().close().await?;
    }
    Ok(())
  }

  fn observe(&self, op: &'static str, started: Instant) {
    let elapsed = started.elapsed();
    if elapsed >= self.slow_query {
      warn!(op, elapsed_ms = elapsed.as_millis() as u64, "slow query");
    }
  }
}

// ─── Connection setup ────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
struct Pragmas {
  busy_timeout: Duration,
  cache_size:   i64,
}

impl Pragmas {
  fn apply_writer(self, conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
      "PRAGMA journal_mode = WAL;
       PRAGMA synchronous = NORMAL;",
    )?;
    self.apply_reader(conn)
  }

  fn apply_reader(self, conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
      "PRAGMA cache_size = {};
       PRAGMA foreign_keys = ON;",
      self.cache_size
    ))?;
    conn.busy_timeout(self.busy_timeout)
  }
}

/// SQL functions the schema's triggers and views call.
fn register_functions(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
  conn.create_scalar_function(
    "is_text_mimetype",
    1,
    FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
    |ctx| {
      let mimetype: String = ctx.get(0)?;
      Ok(is_text_mimetype(&mimetype))
    },
  )
}

fn check_data_dir(dir: &Path) -> Result<()> {
  let invalid = |source| Error::InvalidDataDir { path: dir.to_path_buf(), source };
  let meta = std::fs::metadata(dir).map_err(invalid)?;
  if !meta.is_dir() {
    return Err(invalid(io::Error::new(
      io::ErrorKind::NotADirectory,
      "not a directory",
    )));
  }
  Ok(())
}
