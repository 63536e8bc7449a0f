//! SQLite backend for the Quill notes store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Because every statement goes through
//! that one connection, each `call` closure runs without interleaving with
//! any other, which is what makes the versioned update atomic.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
