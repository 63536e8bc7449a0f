//! [`SqliteStore`]: the SQLite implementation of [`NoteStore`] and
//! [`UserStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use quill_core::{
  note::{INITIAL_VERSION, NewNote, Note, NoteChanges},
  store::{NoteQuery, NoteStore, UserStore},
  user::{NewUser, User},
};

use crate::{
  Error, Result,
  encode::{
    NOTE_COLUMNS, RawNote, RawUser, USER_COLUMNS, encode_dt, encode_tags,
    encode_uuid, now,
  },
  schema::SCHEMA,
};

/// What the versioned UPDATE found, decided inside a single transaction.
enum UpdateRow {
  Updated(RawNote),
  Conflict { current: i64 },
  Missing,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Quill store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Flip an account's active flag. Operator-only; not exposed over HTTP.
  pub async fn set_user_active(&self, id: Uuid, active: bool) -> Result<bool> {
    let id_str = encode_uuid(id);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET is_active = ?2 WHERE user_id = ?1",
          rusqlite::params![id_str, active],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }
}

// ─── NoteStore impl ──────────────────────────────────────────────────────────

impl NoteStore for SqliteStore {
  type Error = Error;

  async fn create_note(&self, owner: Uuid, input: NewNote) -> Result<Note> {
    input.validate()?;

    let created_at = now();
    let note = Note {
      id:          Uuid::new_v4(),
      title:       input.title,
      content:     input.content,
      tags:        input.tags,
      is_favorite: input.is_favorite,
      user_id:     owner,
      created_at,
      updated_at:  created_at,
      version:     INITIAL_VERSION,
    };

    let id_str    = encode_uuid(note.id);
    let owner_str = encode_uuid(owner);
    let title     = note.title.clone();
    let content   = note.content.clone();
    let tags_str  = encode_tags(&note.tags)?;
    let favorite  = note.is_favorite;
    let at_str    = encode_dt(created_at);
    let version   = note.version;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO notes (
             note_id, owner_id, title, content, tags,
             is_favorite, created_at, updated_at, version
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?8)",
          rusqlite::params![
            id_str, owner_str, title, content, tags_str, favorite, at_str,
            version,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(note)
  }

  async fn get_note(&self, id: Uuid, owner: Uuid) -> Result<Option<Note>> {
    let id_str    = encode_uuid(id);
    let owner_str = encode_uuid(owner);

    let raw: Option<RawNote> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {NOTE_COLUMNS} FROM notes WHERE note_id = ?1 AND owner_id = ?2"
            ),
            rusqlite::params![id_str, owner_str],
            RawNote::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawNote::into_note).transpose()
  }

  async fn list_notes(&self, owner: Uuid, query: &NoteQuery) -> Result<Vec<Note>> {
    let owner_str = encode_uuid(owner);
    let search    = query.search_text().map(str::to_owned);

    // Case-insensitive matching is done in Rust so that non-ASCII text is
    // folded the same way as everywhere else; paging then has to follow it.
    let (limit_val, offset_val) = if search.is_some() {
      (-1_i64, 0_i64)
    } else {
      // An offset SQLite cannot represent lies past any row we could hold.
      let Ok(offset) = i64::try_from(query.skip) else {
        return Ok(Vec::new());
      };
      (i64::try_from(query.limit).unwrap_or(i64::MAX), offset)
    };

    let raws: Vec<RawNote> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {NOTE_COLUMNS} FROM notes
           WHERE owner_id = ?1
           ORDER BY created_at DESC, note_id ASC
           LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![owner_str, limit_val, offset_val],
            RawNote::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let notes = raws
      .into_iter()
      .map(RawNote::into_note)
      .collect::<Result<Vec<_>>>()?;

    match search {
      Some(needle) => Ok(
        notes
          .into_iter()
          .filter(|n| n.matches(&needle))
          .skip(query.skip)
          .take(query.limit)
          .collect(),
      ),
      None => Ok(notes),
    }
  }

  async fn count_notes(&self, owner: Uuid) -> Result<usize> {
    let owner_str = encode_uuid(owner);
    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM notes WHERE owner_id = ?1",
          rusqlite::params![owner_str],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(count as usize)
  }

  async fn update_note(
    &self,
    id:               Uuid,
    owner:            Uuid,
    expected_version: i64,
    changes:          NoteChanges,
  ) -> Result<Note> {
    changes.validate()?;

    let id_str    = encode_uuid(id);
    let owner_str = encode_uuid(owner);
    let tags_str  = changes.tags.as_deref().map(encode_tags).transpose()?;
    let at_str    = encode_dt(now());
    let NoteChanges { title, content, is_favorite, .. } = changes;

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let updated = tx
          .query_row(
            &format!(
              "UPDATE notes SET
                 title       = COALESCE(?4, title),
                 content     = COALESCE(?5, content),
                 tags        = COALESCE(?6, tags),
                 is_favorite = COALESCE(?7, is_favorite),
                 updated_at  = ?8,
                 version     = version + 1
               WHERE note_id = ?1 AND owner_id = ?2 AND version = ?3
               RETURNING {NOTE_COLUMNS}"
            ),
            rusqlite::params![
              id_str,
              owner_str,
              expected_version,
              title,
              content,
              tags_str,
              is_favorite,
              at_str,
            ],
            RawNote::from_row,
          )
          .optional()?;

        let outcome = match updated {
          Some(raw) => UpdateRow::Updated(raw),
          None => {
            let current: Option<i64> = tx
              .query_row(
                "SELECT version FROM notes WHERE note_id = ?1 AND owner_id = ?2",
                rusqlite::params![id_str, owner_str],
                |r| r.get(0),
              )
              .optional()?;
            match current {
              Some(current) => UpdateRow::Conflict { current },
              None => UpdateRow::Missing,
            }
          }
        };

        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    match outcome {
      UpdateRow::Updated(raw) => raw.into_note(),
      UpdateRow::Conflict { current } => {
        tracing::debug!(
          note_id = %id,
          expected = expected_version,
          current,
          "rejected stale note update"
        );
        Err(
          quill_core::Error::VersionConflict {
            note_id: id,
            expected: expected_version,
            current,
          }
          .into(),
        )
      }
      UpdateRow::Missing => Err(quill_core::Error::NoteNotFound(id).into()),
    }
  }

  async fn delete_note(&self, id: Uuid, owner: Uuid) -> Result<()> {
    let id_str    = encode_uuid(id);
    let owner_str = encode_uuid(owner);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM notes WHERE note_id = ?1 AND owner_id = ?2",
          rusqlite::params![id_str, owner_str],
        )?)
      })
      .await?;

    if deleted == 0 {
      return Err(quill_core::Error::NoteNotFound(id).into());
    }
    Ok(())
  }
}

// ─── UserStore impl ──────────────────────────────────────────────────────────

impl UserStore for SqliteStore {
  type Error = Error;

  async fn create_user(&self, input: NewUser) -> Result<User> {
    quill_core::user::validate_email(&input.email)?;

    let user = User {
      user_id:       Uuid::new_v4(),
      email:         input.email,
      full_name:     input.full_name,
      password_hash: input.password_hash,
      created_at:    now(),
      is_active:     true,
    };

    let id_str    = encode_uuid(user.user_id);
    let email     = user.email.clone();
    let full_name = user.full_name.clone();
    let hash      = user.password_hash.clone();
    let at_str    = encode_dt(user.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let taken: bool = conn
          .query_row(
            "SELECT 1 FROM users WHERE email = ?1",
            rusqlite::params![email],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(false);
        }
        conn.execute(
          "INSERT INTO users (user_id, email, full_name, password_hash, created_at, is_active)
           VALUES (?1, ?2, ?3, ?4, ?5, 1)",
          rusqlite::params![id_str, email, full_name, hash, at_str],
        )?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(quill_core::Error::EmailTaken(user.email).into());
    }
    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
            rusqlite::params![id_str],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    let email = email.to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            rusqlite::params![email],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }
}
