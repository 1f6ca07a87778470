//! Store configuration.
//!
//! Deserialisable so a binary can embed it in its own configuration file.

use std::{path::PathBuf, thread::available_parallelism, time::Duration};

use serde::Deserialize;

/// Name of the database file inside [`StoreConfig::data_dir`].
pub const DB_FILE_NAME: &str = "data.db";

/// Fewest read connections opened, whatever the core count.
pub const MIN_READ_CONNECTIONS: usize = 4;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
  /// Directory holding the database file. Must already exist.
  pub data_dir:        PathBuf,
  /// How long a writer waits on a lock before failing with `Busy`.
  pub busy_timeout_ms: u64,
  /// `PRAGMA cache_size`, in pages.
  pub cache_size:      i64,
  /// Number of read-only connections; defaults to the available
  /// parallelism, at least [`MIN_READ_CONNECTIONS`].
  pub read_pool_size:  Option<usize>,
  /// Operations slower than this are logged at `warn`.
  pub slow_query_ms:   u64,
  /// Passed to the schema check on open. No upgrade path exists yet, so a
  /// mismatched file is refused either way.
  pub allow_upgrade:   bool,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      data_dir:        PathBuf::from("./"),
      busy_timeout_ms: 5_000,
      cache_size:      10_000,
      read_pool_size:  None,
      slow_query_ms:   500,
      allow_upgrade:   false,
    }
  }
}

impl StoreConfig {
  pub fn new(data_dir: impl Into<PathBuf>) -> Self {
    Self { data_dir: data_dir.into(), ..Self::default() }
  }

  pub fn db_path(&self) -> PathBuf { self.data_dir.join(DB_FILE_NAME) }

  pub fn busy_timeout(&self) -> Duration {
    Duration::from_millis(self.busy_timeout_ms)
  }

  pub fn slow_query(&self) -> Duration { Duration::from_millis(self.slow_query_ms) }

  pub fn read_connections(&self) -> usize {
    self.read_pool_size.filter(|n| *n > 0).unwrap_or_else(|| {
      available_parallelism()
        .map(|n| n.get())
        .unwrap_or(MIN_READ_CONNECTIONS)
        .max(MIN_READ_CONNECTIONS)
    })
  }
}
