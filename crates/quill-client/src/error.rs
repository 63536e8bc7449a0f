//! Client-side error type.

use reqwest::StatusCode;
use thiserror::Error;

/// A failed call against the notes API.
///
/// Variants are chosen from the HTTP status alone. The server's `detail`
/// text is carried along for display and never inspected.
#[derive(Debug, Error)]
pub enum ClientError {
  /// 401: missing, expired or rejected credentials.
  #[error("not authenticated: {0}")]
  Unauthorized(String),

  /// 404: the note does not exist or belongs to someone else.
  #[error("not found: {0}")]
  NotFound(String),

  /// 409: the note changed since it was loaded.
  #[error("stale version: {0}")]
  VersionConflict(String),

  /// 422
  #[error("invalid input: {0}")]
  Validation(String),

  /// 400
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("server answered {status}: {message}")]
  Status { status: StatusCode, message: String },

  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),

  /// The session was logged out, expired or rejected by the server.
  #[error("session is no longer valid; log in again")]
  SessionExpired,

  #[error("cannot {action} while the edit is {state}")]
  InvalidTransition {
    action: &'static str,
    state:  &'static str,
  },
}

impl ClientError {
  /// Classify an unsuccessful response.
  pub fn from_status(status: StatusCode, message: String) -> Self {
    match status {
      StatusCode::UNAUTHORIZED => ClientError::Unauthorized(message),
      StatusCode::NOT_FOUND => ClientError::NotFound(message),
      StatusCode::CONFLICT => ClientError::VersionConflict(message),
      StatusCode::UNPROCESSABLE_ENTITY => ClientError::Validation(message),
      StatusCode::BAD_REQUEST => ClientError::BadRequest(message),
      status => ClientError::Status { status, message },
    }
  }

  /// True for errors that require logging in again.
  pub fn is_auth(&self) -> bool {
    matches!(self, ClientError::Unauthorized(_) | ClientError::SessionExpired)
  }

  pub fn is_conflict(&self) -> bool { matches!(self, ClientError::VersionConflict(_)) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classification_uses_status_only() {
    // A 409 whose text says nothing about versions is still a conflict.
    let e = ClientError::from_status(StatusCode::CONFLICT, "nope".into());
    assert!(e.is_conflict());

    // And a 500 mentioning "modified" is not.
    let e = ClientError::from_status(
      StatusCode::INTERNAL_SERVER_ERROR,
      "Note was modified by another operation".into(),
    );
    assert!(!e.is_conflict());
    assert!(matches!(e, ClientError::Status { status, .. } if status == 500));

    assert!(ClientError::from_status(StatusCode::UNAUTHORIZED, String::new()).is_auth());
    assert!(matches!(
      ClientError::from_status(StatusCode::UNPROCESSABLE_ENTITY, String::new()),
      ClientError::Validation(_)
    ));
  }
}
