//! Password hashing and the bearer-token extractor.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use quill_core::{
  store::{NoteStore, UserStore},
  user::User,
};
use rand_core::OsRng;
use uuid::Uuid;

use crate::{AppState, error::ApiError, token::TokenIssuer};

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::Internal(format!("argon2 error: {e}")))
}

/// Check `password` against a stored PHC string. A hash that cannot be
/// parsed never verifies.
pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
    .is_ok()
}

/// Argon2 is deliberately slow; keep it off the async workers.
pub async fn hash_password_blocking(password: String) -> Result<String, ApiError> {
  tokio::task::spawn_blocking(move || hash_password(&password))
    .await
    .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))?
}

pub async fn verify_password_blocking(password: String, phc: String) -> bool {
  tokio::task::spawn_blocking(move || verify_password(&password, &phc))
    .await
    .unwrap_or(false)
}

// ─── Bearer tokens ───────────────────────────────────────────────────────────

/// Resolve the `Authorization: Bearer …` header to the user id it was issued
/// to.
pub fn verify_bearer(headers: &HeaderMap, tokens: &TokenIssuer) -> Result<Uuid, ApiError> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or_else(|| ApiError::Unauthorized("Not authenticated".into()))?;

  let token = header_val
    .strip_prefix("Bearer ")
    .or_else(|| header_val.strip_prefix("bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or_else(ApiError::credentials)?;

  tokens.verify(token).map_err(|e| {
    tracing::debug!(error = %e, "rejected bearer token");
    ApiError::credentials()
  })
}

/// The authenticated, active caller. Present in a handler's arguments means
/// the request carried a valid bearer token for an existing account.
pub struct AuthUser(pub User);

impl AuthUser {
  pub fn id(&self) -> Uuid { self.0.user_id }
}

impl<S> FromRequestParts<AppState<S>> for AuthUser
where
  S: NoteStore + UserStore + Clone + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let user_id = verify_bearer(&parts.headers, &state.tokens)?;

    let user = UserStore::get_user(state.store.as_ref(), user_id)
      .await
      .map_err(ApiError::from_store)?
      .ok_or_else(ApiError::credentials)?;

    if !user.is_active {
      return Err(ApiError::InactiveUser);
    }
    Ok(AuthUser(user))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::HeaderValue;
  use chrono::Duration;

  fn issuer() -> TokenIssuer {
    TokenIssuer::new("unit-test-secret-unit-test-secret-unit", Duration::minutes(5)).unwrap()
  }

  fn headers(value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    h
  }

  #[test]
  fn password_roundtrip() {
    let phc = hash_password("hunter22").unwrap();
    assert!(phc.starts_with("$argon2"));
    assert!(verify_password("hunter22", &phc));
    assert!(!verify_password("hunter23", &phc));
    assert!(!verify_password("hunter22", "not a phc string"));
  }

  #[test]
  fn bearer_header_is_required() {
    let err = verify_bearer(&HeaderMap::new(), &issuer()).unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));
  }

  #[test]
  fn basic_scheme_is_rejected() {
    let err = verify_bearer(&headers("Basic dXNlcjpwYXNz"), &issuer()).unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));
  }

  #[test]
  fn valid_bearer_yields_subject() {
    let tokens = issuer();
    let id = Uuid::new_v4();
    let t = tokens.issue(id).unwrap();
    let got = verify_bearer(&headers(&format!("Bearer {}", t.token)), &tokens).unwrap();
    assert_eq!(got, id);
  }
}
