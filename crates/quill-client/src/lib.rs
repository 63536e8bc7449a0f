//! Client library for the Quill notes API.
//!
//! - [`ApiClient`]: thin reqwest wrapper, one method per endpoint.
//! - [`Session`]: a signed-in user's credential, from login to logout.
//! - [`EditSession`]: the optimistic-concurrency edit cycle for one note.

#![allow(async_fn_in_trait)]

pub mod client;
pub mod edit;
pub mod error;
pub mod session;

pub use client::{ApiClient, ApiConfig, NotePage};
pub use edit::{EditSession, EditState, NoteApi, SubmitOutcome};
pub use error::ClientError;
pub use session::Session;
