//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed microsecond width,
//! so lexical order in SQL matches chronological order. Tags are stored as
//! compact JSON. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use quill_core::{note::Note, user::User};
use uuid::Uuid;

use crate::{Error, Result};

/// Column list shared by every query that decodes a [`RawNote`].
pub const NOTE_COLUMNS: &str = "note_id, owner_id, title, content, tags, \
                                is_favorite, created_at, updated_at, version";

/// Column list shared by every query that decodes a [`RawUser`].
pub const USER_COLUMNS: &str =
  "user_id, email, full_name, password_hash, created_at, is_active";

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// The current time at the precision the store keeps, so values handed back
/// to callers compare equal to what a later read returns.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Tags ────────────────────────────────────────────────────────────────────

pub fn encode_tags(tags: &[String]) -> Result<String> {
  Ok(serde_json::to_string(tags)?)
}

pub fn decode_tags(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `notes` row, in [`NOTE_COLUMNS`] order.
pub struct RawNote {
  pub note_id:     String,
  pub owner_id:    String,
  pub title:       String,
  pub content:     String,
  pub tags:        String,
  pub is_favorite: bool,
  pub created_at:  String,
  pub updated_at:  String,
  pub version:     i64,
}

impl RawNote {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      note_id:     row.get(0)?,
      owner_id:    row.get(1)?,
      title:       row.get(2)?,
      content:     row.get(3)?,
      tags:        row.get(4)?,
      is_favorite: row.get(5)?,
      created_at:  row.get(6)?,
      updated_at:  row.get(7)?,
      version:     row.get(8)?,
    })
  }

  pub fn into_note(self) -> Result<Note> {
    Ok(Note {
      id:          decode_uuid(&self.note_id)?,
      title:       self.title,
      content:     self.content,
      tags:        decode_tags(&self.tags)?,
      is_favorite: self.is_favorite,
      user_id:     decode_uuid(&self.owner_id)?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
      version:     self.version,
    })
  }
}

/// Raw values read directly from a `users` row, in [`USER_COLUMNS`] order.
pub struct RawUser {
  pub user_id:       String,
  pub email:         String,
  pub full_name:     Option<String>,
  pub password_hash: String,
  pub created_at:    String,
  pub is_active:     bool,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      email:         row.get(1)?,
      full_name:     row.get(2)?,
      password_hash: row.get(3)?,
      created_at:    row.get(4)?,
      is_active:     row.get(5)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:       decode_uuid(&self.user_id)?,
      email:         self.email,
      full_name:     self.full_name,
      password_hash: self.password_hash,
      created_at:    decode_dt(&self.created_at)?,
      is_active:     self.is_active,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let a = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let b = Utc.timestamp_opt(1_700_000_000, 5_000).unwrap();
    assert!(encode_dt(a) < encode_dt(b));
    assert_eq!(encode_dt(a).len(), encode_dt(b).len());
  }

  #[test]
  fn truncated_now_survives_encoding() {
    let t = now();
    assert_eq!(decode_dt(&encode_dt(t)).unwrap(), t);
  }
}
