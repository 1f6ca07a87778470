//! Core types and trait definitions for the Libreta note store.
//!
//! This crate has no HTTP or database dependencies.
//! Storage backends implement [`store::NoteStore`]; transport layers depend
//! on that trait, never on a concrete backend.

pub mod content;
pub mod edge;
pub mod error;
pub mod id;
pub mod node;
pub mod store;

pub use error::{ErrorKind, StoreError};
