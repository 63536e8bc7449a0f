//! Note types. A note is the only entity in Quill that carries a version.
//!
//! A note's `version` starts at 1 and is bumped by exactly one on every
//! successful update. Writers present the version they last observed; the
//! store rejects the write if the note has moved on since.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Longest title accepted on create or update, in characters.
pub const MAX_TITLE_CHARS: usize = 200;

/// Version assigned to every freshly created note.
pub const INITIAL_VERSION: i64 = 1;

// ─── Note ────────────────────────────────────────────────────────────────────

/// A persisted note, exactly as the store returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
  pub id:          Uuid,
  pub title:       String,
  pub content:     String,
  #[serde(default)]
  pub tags:        Vec<String>,
  #[serde(default)]
  pub is_favorite: bool,
  /// The owning user. Never changes after creation.
  pub user_id:     Uuid,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
  pub version:     i64,
}

impl Note {
  /// Whether `needle` occurs in the title, the content or any tag, ignoring
  /// case. An empty needle matches everything.
  pub fn matches(&self, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    if needle.is_empty() {
      return true;
    }
    self.title.to_lowercase().contains(&needle)
      || self.content.to_lowercase().contains(&needle)
      || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
  }
}

// ─── NewNote ─────────────────────────────────────────────────────────────────

/// Input to [`crate::store::NoteStore::create_note`].
/// Identity, timestamps and version are always set by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewNote {
  pub title:       String,
  pub content:     String,
  #[serde(default)]
  pub tags:        Vec<String>,
  #[serde(default)]
  pub is_favorite: bool,
}

impl NewNote {
  pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      content: content.into(),
      ..Self::default()
    }
  }

  pub fn validate(&self) -> Result<()> {
    validate_title(&self.title)?;
    validate_content(&self.content)
  }
}

// ─── NoteChanges ─────────────────────────────────────────────────────────────

/// The subset of fields an update replaces. `None` leaves a field as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteChanges {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content:     Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tags:        Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub is_favorite: Option<bool>,
}

impl NoteChanges {
  pub fn is_empty(&self) -> bool {
    self.title.is_none()
      && self.content.is_none()
      && self.tags.is_none()
      && self.is_favorite.is_none()
  }

  pub fn validate(&self) -> Result<()> {
    if let Some(title) = &self.title {
      validate_title(title)?;
    }
    if let Some(content) = &self.content {
      validate_content(content)?;
    }
    Ok(())
  }

  /// Apply the changes to an in-memory copy of a note. Does not touch the
  /// version or timestamps.
  pub fn apply_to(&self, note: &mut Note) {
    if let Some(title) = &self.title {
      note.title.clone_from(title);
    }
    if let Some(content) = &self.content {
      note.content.clone_from(content);
    }
    if let Some(tags) = &self.tags {
      note.tags.clone_from(tags);
    }
    if let Some(fav) = self.is_favorite {
      note.is_favorite = fav;
    }
  }
}

fn validate_title(title: &str) -> Result<()> {
  if title.trim().is_empty() {
    return Err(Error::Validation("title must not be empty".into()));
  }
  if title.chars().count() > MAX_TITLE_CHARS {
    return Err(Error::Validation(format!(
      "title must be at most {MAX_TITLE_CHARS} characters"
    )));
  }
  Ok(())
}

fn validate_content(content: &str) -> Result<()> {
  if content.trim().is_empty() {
    return Err(Error::Validation("content must not be empty".into()));
  }
  Ok(())
}
