//! SQLite backend for the Libreta note store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on dedicated
//! connection threads without blocking the async runtime: one writer through
//! which every mutation is serialised, and a pool of read-only connections.

mod cancel;
mod content;
mod edge;
mod encode;
mod node;
mod pool;
mod query;
mod schema;
mod store;

pub mod config;
pub mod error;

pub use config::StoreConfig;
pub use error::{Error, Result};
pub use schema::SCHEMA_VERSION;
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
