//! Error taxonomy shared by every storage backend.
//!
//! Backends keep their own concrete error enums; this module only defines
//! the coarse classification callers branch on.

use thiserror::Error;

/// The kinds of failure a [`NoteStore`](crate::store::NoteStore) can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorKind {
  /// A requested content hash or node does not exist. Expected in normal
  /// operation.
  #[error("not found")]
  NotFound,

  /// A write would break a uniqueness or referential-integrity rule.
  #[error("constraint violation")]
  ConstraintViolation,

  /// The database file carries a schema version this build cannot use.
  #[error("schema version mismatch")]
  SchemaMismatch,

  /// The write handle could not be acquired within the busy window. Safe to
  /// retry.
  #[error("contention timeout")]
  ContentionTimeout,

  /// The caller abandoned the operation before it committed.
  #[error("cancelled")]
  Cancelled,

  /// The storage medium failed (disk, permissions, missing directory).
  #[error("i/o failure")]
  Io,

  #[error("internal error")]
  Internal,
}

impl ErrorKind {
  /// Whether the failure was caused by the request itself rather than by
  /// the store.
  pub fn is_client_error(self) -> bool {
    matches!(self, Self::NotFound | Self::ConstraintViolation)
  }

  /// Whether retrying the same operation may succeed.
  pub fn is_transient(self) -> bool { matches!(self, Self::ContentionTimeout) }
}

/// Implemented by every backend error so callers can classify failures
/// without knowing the backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn kind(&self) -> ErrorKind;
}
