//! Error types for `quill-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// No such note, or the note belongs to someone else. The two cases are
  /// deliberately indistinguishable.
  #[error("note not found: {0}")]
  NoteNotFound(Uuid),

  #[error(
    "note {note_id} was modified concurrently (expected version {expected}, \
     current version {current})"
  )]
  VersionConflict {
    note_id:  Uuid,
    expected: i64,
    current:  i64,
  },

  #[error("email already registered: {0}")]
  EmailTaken(String),

  #[error("validation failed: {0}")]
  Validation(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
