//! Editing one note under optimistic concurrency.
//!
//! ```text
//!            submit                 saved
//!  Loaded(v) ──────▶ Submitting ─────────▶ Loaded(v+1)
//!     ▲                  │ 409
//!     │ reload           ├──────▶ Conflicted(known_version = v)
//!     │                  │ other
//!     └──────────────────┴──────▶ Errored
//! ```
//!
//! A conflict is never retried. The caller reloads, sees the current note
//! and decides what to resubmit.

use std::future::Future;

use quill_core::note::{Note, NoteChanges};
use uuid::Uuid;

use crate::error::ClientError;

/// The two calls an edit needs.
pub trait NoteApi {
  fn fetch_note(&self, id: Uuid) -> impl Future<Output = Result<Note, ClientError>>;

  fn save_note(
    &self,
    id: Uuid,
    version: i64,
    changes: &NoteChanges,
  ) -> impl Future<Output = Result<Note, ClientError>>;
}

impl<T: NoteApi> NoteApi for &T {
  async fn fetch_note(&self, id: Uuid) -> Result<Note, ClientError> {
    (**self).fetch_note(id).await
  }

  async fn save_note(
    &self,
    id: Uuid,
    version: i64,
    changes: &NoteChanges,
  ) -> Result<Note, ClientError> {
    (**self).save_note(id, version, changes).await
  }
}

/// Where an edit currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum EditState {
  /// The note as last read or saved. Ready to submit.
  Loaded { note: Note },
  /// A save carrying `version` is in flight.
  Submitting { version: i64 },
  /// The server holds a newer version than `known_version`. `rejected` are
  /// the changes that were refused, kept so they can be re-applied.
  Conflicted {
    known_version: i64,
    rejected:      NoteChanges,
  },
  /// The last call failed for a reason other than a conflict.
  Errored { message: String },
}

impl EditState {
  fn name(&self) -> &'static str {
    match self {
      EditState::Loaded { .. } => "loaded",
      EditState::Submitting { .. } => "submitting",
      EditState::Conflicted { .. } => "conflicted",
      EditState::Errored { .. } => "errored",
    }
  }
}

/// Result of [`EditSession::submit`].
#[derive(Debug)]
pub enum SubmitOutcome {
  Saved(Note),
  /// Somebody else saved first. Reload before trying again.
  Stale { known_version: i64 },
  Failed(ClientError),
}

/// State machine for one note being edited.
#[derive(Debug)]
pub struct EditSession<A> {
  api:     A,
  note_id: Uuid,
  state:   EditState,
}

impl<A: NoteApi> EditSession<A> {
  /// Fetch the note and start in `Loaded`.
  pub async fn open(api: A, note_id: Uuid) -> Result<Self, ClientError> {
    let note = api.fetch_note(note_id).await?;
    Ok(Self::from_note(api, note))
  }

  /// Start from a note already in hand, e.g. one just created.
  pub fn from_note(api: A, note: Note) -> Self {
    Self { api, note_id: note.id, state: EditState::Loaded { note } }
  }

  pub fn note_id(&self) -> Uuid { self.note_id }

  pub fn state(&self) -> &EditState { &self.state }

  /// The loaded note, if the edit is in `Loaded`.
  pub fn note(&self) -> Option<&Note> {
    match &self.state {
      EditState::Loaded { note } => Some(note),
      _ => None,
    }
  }

  /// Submit `changes` against the loaded version.
  ///
  /// Only allowed from `Loaded`; anything else returns
  /// [`ClientError::InvalidTransition`] and leaves the state alone.
  pub async fn submit(&mut self, changes: NoteChanges) -> Result<SubmitOutcome, ClientError> {
    let version = match &self.state {
      EditState::Loaded { note } => note.version,
      other => {
        return Err(ClientError::InvalidTransition {
          action: "submit",
          state:  other.name(),
        });
      }
    };

    self.state = EditState::Submitting { version };
    let outcome = match self.api.save_note(self.note_id, version, &changes).await {
      Ok(note) => {
        self.state = EditState::Loaded { note: note.clone() };
        SubmitOutcome::Saved(note)
      }
      Err(e) if e.is_conflict() => {
        tracing::info!(note_id = %self.note_id, version, "edit is stale");
        self.state = EditState::Conflicted { known_version: version, rejected: changes };
        SubmitOutcome::Stale { known_version: version }
      }
      Err(e) => {
        self.state = EditState::Errored { message: e.to_string() };
        SubmitOutcome::Failed(e)
      }
    };
    Ok(outcome)
  }

  /// Fetch the current note from the server and return to `Loaded`.
  ///
  /// This is the way out of `Conflicted` and `Errored`, and also recovers
  /// an edit whose submission was abandoned mid-flight. A failed reload
  /// leaves the edit `Errored`.
  pub async fn reload(&mut self) -> Result<Note, ClientError> {
    match self.api.fetch_note(self.note_id).await {
      Ok(note) => {
        self.state = EditState::Loaded { note: note.clone() };
        Ok(note)
      }
      Err(e) => {
        self.state = EditState::Errored { message: e.to_string() };
        Err(e)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use chrono::Utc;

  use super::*;

  /// In-memory stand-in for the server's versioned update.
  #[derive(Debug)]
  struct FakeApi {
    note:    Mutex<Note>,
    fail_io: Mutex<bool>,
  }

  impl FakeApi {
    fn new() -> Self {
      let now = Utc::now();
      Self {
        note:    Mutex::new(Note {
          id: Uuid::new_v4(),
          title: "A".into(),
          content: "B".into(),
          tags: vec![],
          is_favorite: false,
          user_id: Uuid::new_v4(),
          created_at: now,
          updated_at: now,
          version: 1,
        }),
        fail_io: Mutex::new(false),
      }
    }

    fn id(&self) -> Uuid { self.note.lock().unwrap().id }

    /// Someone else saves a title change.
    fn concurrent_edit(&self, title: &str) {
      let mut n = self.note.lock().unwrap();
      n.title = title.into();
      n.version += 1;
    }

    fn set_failing(&self, failing: bool) { *self.fail_io.lock().unwrap() = failing; }

    fn unavailable() -> ClientError {
      ClientError::Status {
        status:  reqwest::StatusCode::SERVICE_UNAVAILABLE,
        message: "down".into(),
      }
    }
  }

  impl NoteApi for FakeApi {
    async fn fetch_note(&self, id: Uuid) -> Result<Note, ClientError> {
      if *self.fail_io.lock().unwrap() {
        return Err(Self::unavailable());
      }
      let n = self.note.lock().unwrap();
      if n.id != id {
        return Err(ClientError::NotFound("Note not found".into()));
      }
      Ok(n.clone())
    }

    async fn save_note(
      &self,
      id: Uuid,
      version: i64,
      changes: &NoteChanges,
    ) -> Result<Note, ClientError> {
      if *self.fail_io.lock().unwrap() {
        return Err(Self::unavailable());
      }
      let mut n = self.note.lock().unwrap();
      if n.id != id {
        return Err(ClientError::NotFound("Note not found".into()));
      }
      if n.version != version {
        return Err(ClientError::VersionConflict("modified".into()));
      }
      changes.apply_to(&mut n);
      n.version += 1;
      Ok(n.clone())
    }
  }

  fn title(t: &str) -> NoteChanges {
    NoteChanges { title: Some(t.into()), ..NoteChanges::default() }
  }

  #[tokio::test]
  async fn submit_moves_to_next_version() {
    let api = FakeApi::new();
    let mut edit = EditSession::open(&api, api.id()).await.unwrap();
    assert_eq!(edit.note().unwrap().version, 1);

    let outcome = edit.submit(title("C")).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Saved(ref n) if n.version == 2 && n.title == "C"));
    assert_eq!(edit.note().unwrap().version, 2);

    // Still Loaded, so another submit goes through against v2.
    let outcome = edit.submit(title("D")).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Saved(ref n) if n.version == 3));
  }

  #[tokio::test]
  async fn concurrent_save_yields_conflicted() {
    let api = FakeApi::new();
    let mut edit = EditSession::open(&api, api.id()).await.unwrap();
    api.concurrent_edit("theirs");

    let outcome = edit.submit(title("mine")).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Stale { known_version: 1 }));
    assert_eq!(
      edit.state(),
      &EditState::Conflicted { known_version: 1, rejected: title("mine") }
    );
    assert!(edit.note().is_none());
    assert_eq!(api.note.lock().unwrap().title, "theirs");
  }

  #[tokio::test]
  async fn conflicted_only_allows_reload() {
    let api = FakeApi::new();
    let mut edit = EditSession::open(&api, api.id()).await.unwrap();
    api.concurrent_edit("theirs");
    edit.submit(title("mine")).await.unwrap();

    let err = edit.submit(title("again")).await.unwrap_err();
    assert!(matches!(
      err,
      ClientError::InvalidTransition { action: "submit", state: "conflicted" }
    ));
    // Refused submit did not touch the server.
    assert_eq!(api.note.lock().unwrap().version, 2);

    let note = edit.reload().await.unwrap();
    assert_eq!(note.version, 2);
    assert_eq!(note.title, "theirs");

    let outcome = edit.submit(title("mine")).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Saved(ref n) if n.version == 3));
  }

  #[tokio::test]
  async fn transport_failure_is_errored_not_stale() {
    let api = FakeApi::new();
    let mut edit = EditSession::open(&api, api.id()).await.unwrap();

    api.set_failing(true);
    let outcome = edit.submit(title("C")).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Failed(ClientError::Status { .. })));
    assert!(matches!(edit.state(), EditState::Errored { .. }));

    let err = edit.submit(title("C")).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidTransition { state: "errored", .. }));

    // Reload fails too while the server is down and the edit stays Errored.
    assert!(edit.reload().await.is_err());
    assert!(matches!(edit.state(), EditState::Errored { .. }));

    api.set_failing(false);
    assert_eq!(edit.reload().await.unwrap().version, 1);
    assert!(matches!(edit.submit(title("C")).await.unwrap(), SubmitOutcome::Saved(_)));
  }

  #[tokio::test]
  async fn missing_note_fails_to_open() {
    let api = FakeApi::new();
    let err = EditSession::open(&api, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)));
  }
}
