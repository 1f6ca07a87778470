//! Error type for `libreta-store-sqlite`.

use std::path::PathBuf;

use libreta_core::{ErrorKind, StoreError, content::ContentHash};
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("content not found: {0}")]
  ContentNotFound(ContentHash),

  /// A uniqueness or foreign-key rule rejected the write.
  #[error("constraint violation: {0}")]
  Constraint(String),

  #[error("schema version {found} found, expected {expected}")]
  SchemaMismatch { found: i64, expected: i64 },

  #[error("write handle busy")]
  Busy,

  #[error("operation cancelled")]
  Cancelled,

  #[error("data directory {path:?} is not usable: {source}")]
  InvalidDataDir {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("read error: {0}")]
  Io(#[from] std::io::Error),

  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self {
    match sqlite_code(&e) {
      Some(ErrorCode::ConstraintViolation) => Error::Constraint(e.to_string()),
      Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => Error::Busy,
      _ => Error::Database(tokio_rusqlite::Error::Rusqlite(e)),
    }
  }
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    match e {
      tokio_rusqlite::Error::Rusqlite(e) => e.into(),
      // Errors raised by our own closures travel through the connection
      // thread boxed; unwrap them back into the variant they started as.
      tokio_rusqlite::Error::Other(boxed) => match boxed.downcast::<Error>() {
        Ok(inner) => *inner,
        Err(other) => Error::Database(tokio_rusqlite::Error::Other(other)),
      },
      other => Error::Database(other),
    }
  }
}

impl From<Error> for tokio_rusqlite::Error {
  fn from(e: Error) -> Self { tokio_rusqlite::Error::Other(Box::new(e)) }
}

fn sqlite_code(e: &rusqlite::Error) -> Option<ErrorCode> {
  match e {
    rusqlite::Error::SqliteFailure(err, _) => Some(err.code),
    _ => None,
  }
}

impl StoreError for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Error::ContentNotFound(_) => ErrorKind::NotFound,
      Error::Constraint(_) => ErrorKind::ConstraintViolation,
      Error::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
      Error::Busy => ErrorKind::ContentionTimeout,
      Error::Cancelled => ErrorKind::Cancelled,
      Error::InvalidDataDir { .. } | Error::Io(_) => ErrorKind::Io,
      Error::Database(tokio_rusqlite::Error::Rusqlite(e)) => match sqlite_code(e) {
        Some(
          ErrorCode::CannotOpen
          | ErrorCode::PermissionDenied
          | ErrorCode::ReadOnly
          | ErrorCode::DiskFull
          | ErrorCode::SystemIoFailure
          | ErrorCode::DatabaseCorrupt
          | ErrorCode::NotADatabase,
        ) => ErrorKind::Io,
        _ => ErrorKind::Internal,
      },
      Error::Database(_) | Error::Json(_) | Error::DateParse(_) => {
        ErrorKind::Internal
      }
    }
  }
}
