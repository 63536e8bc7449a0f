//! Domain types for Quill: notes, users and the store traits every backend
//! implements.
//!
//! Holds no HTTP or SQL code. The API, the SQLite backend and the client
//! all share these types.

// Store traits use `async fn`; implementors' futures must be `Send`, which
// the trait signatures spell out.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod note;
pub mod store;
pub mod user;

pub use error::{Error, Result};
