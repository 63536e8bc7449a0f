//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use quill_core::store::StoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("inactive user account")]
  InactiveUser,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("validation error: {0}")]
  Validation(String),

  #[error("internal error: {0}")]
  Internal(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn credentials() -> Self {
    ApiError::Unauthorized("Could not validate credentials".into())
  }

  /// Translate a backend error, surfacing the domain outcomes the store
  /// reports and treating everything else as a server fault.
  pub fn from_store<E: StoreError>(e: E) -> Self {
    use quill_core::Error as Domain;

    match e.domain() {
      Some(Domain::NoteNotFound(_)) => ApiError::NotFound("Note not found".into()),
      Some(Domain::VersionConflict { note_id, expected, current }) => {
        tracing::warn!(%note_id, expected, current, "version conflict");
        ApiError::Conflict(
          "Note was modified by another operation. Please refresh and try again."
            .into(),
        )
      }
      Some(Domain::EmailTaken(_)) => {
        ApiError::BadRequest("Email already registered".into())
      }
      Some(Domain::Validation(msg)) => ApiError::Validation(msg.clone()),
      Some(Domain::Serialization(_)) | None => {
        tracing::error!(error = %e, "store failure");
        ApiError::Store(Box::new(e))
      }
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(r: JsonRejection) -> Self { ApiError::Validation(r.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(r: QueryRejection) -> Self { ApiError::Validation(r.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(_: PathRejection) -> Self { ApiError::BadRequest("Invalid note ID format".into()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, detail) = match &self {
      ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
      ApiError::InactiveUser => {
        (StatusCode::BAD_REQUEST, "Inactive user account".to_string())
      }
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Validation(m) => (StatusCode::UNPROCESSABLE_ENTITY, m.clone()),
      ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
      // Logged in `from_store`; the cause stays out of the body.
      ApiError::Store(_) => {
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
      }
    };

    let mut res = (status, Json(json!({ "detail": detail }))).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }
    res
  }
}
