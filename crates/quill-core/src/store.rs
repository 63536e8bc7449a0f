//! The `NoteStore` and `UserStore` traits and supporting query types.
//!
//! The traits are implemented by storage backends (e.g. `quill-store-sqlite`).
//! The HTTP layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  Error,
  note::{NewNote, Note, NoteChanges},
  user::{NewUser, User},
};

/// Page size used when a caller does not ask for one.
pub const DEFAULT_LIMIT: usize = 50;
/// Largest page a caller may request.
pub const MAX_LIMIT: usize = 100;

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`NoteStore::list_notes`].
#[derive(Debug, Clone)]
pub struct NoteQuery {
  /// Case-insensitive substring matched against title, content and tags.
  pub search: Option<String>,
  pub skip:   usize,
  pub limit:  usize,
}

impl Default for NoteQuery {
  fn default() -> Self {
    Self { search: None, skip: 0, limit: DEFAULT_LIMIT }
  }
}

impl NoteQuery {
  pub fn search(text: impl Into<String>) -> Self {
    Self { search: Some(text.into()), ..Self::default() }
  }

  /// The search text, if it is present and not blank.
  pub fn search_text(&self) -> Option<&str> {
    self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
  }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Backend errors that may wrap a domain [`Error`].
///
/// Lets generic callers tell a not-found, a version conflict or a validation
/// failure apart from an infrastructure failure without knowing the backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn domain(&self) -> Option<&Error>;
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Abstraction over a note store backend.
///
/// Every operation is scoped to an owner. A note owned by someone else is
/// reported exactly like a note that does not exist.
pub trait NoteStore: Send + Sync {
  type Error: StoreError;

  /// Validate and persist a new note for `owner` with version 1.
  fn create_note(
    &self,
    owner: Uuid,
    input: NewNote,
  ) -> impl Future<Output = Result<Note, Self::Error>> + Send + '_;

  /// Retrieve a note by id. Returns `None` if it does not exist or is not
  /// owned by `owner`.
  fn get_note(
    &self,
    id: Uuid,
    owner: Uuid,
  ) -> impl Future<Output = Result<Option<Note>, Self::Error>> + Send + '_;

  /// List `owner`'s notes, newest first, optionally filtered and paged.
  fn list_notes<'a>(
    &'a self,
    owner: Uuid,
    query: &'a NoteQuery,
  ) -> impl Future<Output = Result<Vec<Note>, Self::Error>> + Send + 'a;

  /// Total number of notes owned by `owner`.
  fn count_notes(
    &self,
    owner: Uuid,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Apply `changes` if and only if the stored version equals
  /// `expected_version`, bumping the version by one.
  ///
  /// The compare and the write are a single atomic step. Fails with
  /// [`Error::NoteNotFound`] when the note is missing or not owned, with
  /// [`Error::VersionConflict`] when the version has moved on, and with
  /// [`Error::Validation`] when `changes` are invalid. A failed update never
  /// modifies the stored note.
  fn update_note(
    &self,
    id: Uuid,
    owner: Uuid,
    expected_version: i64,
    changes: NoteChanges,
  ) -> impl Future<Output = Result<Note, Self::Error>> + Send + '_;

  /// Hard-delete a note. Fails with [`Error::NoteNotFound`] when the note is
  /// missing or not owned.
  fn delete_note(
    &self,
    id: Uuid,
    owner: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// Abstraction over a user account backend.
pub trait UserStore: Send + Sync {
  type Error: StoreError;

  /// Persist a new account. Fails with [`Error::EmailTaken`] if the email is
  /// already registered.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn find_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;
}
