//! Handlers for `/notes` endpoints.
//!
//! Every handler takes an [`AuthUser`] and passes its id to the store as the
//! owner, so a caller can only ever see or touch their own notes.

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, PathRejection, QueryRejection},
  },
  http::StatusCode,
  response::IntoResponse,
};
use quill_core::{
  note::{NewNote, Note, NoteChanges},
  store::{MAX_LIMIT, NoteQuery, NoteStore, UserStore},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, auth::AuthUser, error::ApiError};

/// Generic `{"message": ...}` acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
  pub message: String,
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// Largest offset SQLite can take.
const MAX_SKIP: usize = i64::MAX as usize;

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub search: Option<String>,
  pub skip:   Option<usize>,
  pub limit:  Option<usize>,
}

/// One page of notes.
#[derive(Debug, Serialize, Deserialize)]
pub struct NoteListResponse {
  pub notes:    Vec<Note>,
  pub total:    usize,
  pub page:     usize,
  pub per_page: usize,
}

/// `GET /notes/[?search=<text>&skip=<n>&limit=<n>]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<NoteListResponse>, ApiError>
where
  S: NoteStore + UserStore + Clone + Send + Sync + 'static,
{
  let Query(params) = params?;
  let defaults = NoteQuery::default();
  let query = NoteQuery {
    search: params.search,
    skip:   params.skip.unwrap_or(defaults.skip),
    limit:  params.limit.unwrap_or(defaults.limit),
  };
  if query.limit == 0 || query.limit > MAX_LIMIT {
    return Err(ApiError::Validation(format!(
      "limit must be between 1 and {MAX_LIMIT}"
    )));
  }
  if query.skip > MAX_SKIP {
    return Err(ApiError::Validation(format!("skip must be at most {MAX_SKIP}")));
  }

  let notes = NoteStore::list_notes(state.store.as_ref(), user.id(), &query)
    .await
    .map_err(ApiError::from_store)?;

  // A filtered listing reports how many notes matched on this page; an
  // unfiltered one reports everything the caller owns.
  let total = if query.search_text().is_some() {
    notes.len()
  } else {
    state
      .store
      .count_notes(user.id())
      .await
      .map_err(ApiError::from_store)?
  };

  Ok(Json(NoteListResponse {
    notes,
    total,
    page: (query.skip / query.limit).saturating_add(1),
    per_page: query.limit,
  }))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /notes/` with body `{"title", "content", "tags"?, "is_favorite"?}`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  body: Result<Json<NewNote>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: NoteStore + UserStore + Clone + Send + Sync + 'static,
{
  let Json(input) = body?;
  let note = state
    .store
    .create_note(user.id(), input)
    .await
    .map_err(ApiError::from_store)?;
  tracing::info!(note_id = %note.id, owner = %user.id(), "created note");
  Ok((StatusCode::CREATED, Json(note)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /notes/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Note>, ApiError>
where
  S: NoteStore + UserStore + Clone + Send + Sync + 'static,
{
  let Path(id) = id?;
  let note = state
    .store
    .get_note(id, user.id())
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound("Note not found".into()))?;
  Ok(Json(note))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// Body of `PUT /notes/{id}`. `version` is the version the client last saw
/// and is mandatory; every other field is optional.
#[derive(Debug, Deserialize)]
pub struct UpdateNoteBody {
  pub title:       Option<String>,
  pub content:     Option<String>,
  pub tags:        Option<Vec<String>>,
  pub is_favorite: Option<bool>,
  pub version:     i64,
}

impl UpdateNoteBody {
  fn into_parts(self) -> (i64, NoteChanges) {
    let changes = NoteChanges {
      title:       self.title,
      content:     self.content,
      tags:        self.tags,
      is_favorite: self.is_favorite,
    };
    (self.version, changes)
  }
}

/// `PUT /notes/{id}`. Answers 409 when `version` is stale.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  id: Result<Path<Uuid>, PathRejection>,
  body: Result<Json<UpdateNoteBody>, JsonRejection>,
) -> Result<Json<Note>, ApiError>
where
  S: NoteStore + UserStore + Clone + Send + Sync + 'static,
{
  let Path(id) = id?;
  let Json(body) = body?;
  let (expected_version, changes) = body.into_parts();
  if expected_version < 1 {
    return Err(ApiError::Validation("version must be a positive integer".into()));
  }
  if changes.is_empty() {
    tracing::debug!(note_id = %id, "update carries no field changes; version still advances");
  }

  let note = state
    .store
    .update_note(id, user.id(), expected_version, changes)
    .await
    .map_err(ApiError::from_store)?;
  tracing::debug!(note_id = %id, version = note.version, "updated note");
  Ok(Json(note))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /notes/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError>
where
  S: NoteStore + UserStore + Clone + Send + Sync + 'static,
{
  let Path(id) = id?;
  state
    .store
    .delete_note(id, user.id())
    .await
    .map_err(ApiError::from_store)?;
  tracing::info!(note_id = %id, owner = %user.id(), "deleted note");
  Ok(Json(MessageResponse { message: "Note deleted successfully".into() }))
}
