//! Handlers for `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/signup` | 400 if the email is registered |
//! | `POST` | `/auth/login`  | 401 on bad credentials |
//! | `GET`  | `/auth/me`     | Requires a bearer token |

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
};
use quill_core::{
  store::{NoteStore, UserStore},
  user::{NewUser, UserProfile, validate_password},
};
use serde::{Deserialize, Serialize};

use crate::{
  AppState,
  auth::{AuthUser, hash_password_blocking, verify_password_blocking},
  error::ApiError,
};

/// Returned by signup and login.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
  pub access_token: String,
  pub token_type:   String,
  /// Seconds until `access_token` expires.
  pub expires_in:   i64,
  pub user:         UserProfile,
}

fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

fn issue<S>(state: &AppState<S>, profile: UserProfile) -> Result<AuthResponse, ApiError> {
  let issued = state.tokens.issue(profile.id).map_err(|e| {
    tracing::error!(error = %e, "failed to sign token");
    ApiError::Internal("Could not issue access token".into())
  })?;
  Ok(AuthResponse {
    access_token: issued.token,
    token_type:   "bearer".into(),
    expires_in:   issued.expires_in,
    user:         profile,
  })
}

// ─── Signup ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SignupBody {
  pub email:     String,
  pub password:  String,
  pub full_name: Option<String>,
}

/// `POST /auth/signup`
pub async fn signup<S>(
  State(state): State<AppState<S>>,
  body: Result<Json<SignupBody>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError>
where
  S: NoteStore + UserStore + Clone + Send + Sync + 'static,
{
  let Json(body) = body?;
  validate_password(&body.password).map_err(|e| ApiError::Validation(e.to_string()))?;

  let password_hash = hash_password_blocking(body.password).await?;
  let user = state
    .store
    .create_user(NewUser {
      email: normalize_email(&body.email),
      full_name: body.full_name.filter(|n| !n.trim().is_empty()),
      password_hash,
    })
    .await
    .map_err(ApiError::from_store)?;

  tracing::info!(user_id = %user.user_id, "registered user");
  Ok(Json(issue(&state, user.profile())?))
}

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

/// `POST /auth/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  body: Result<Json<LoginBody>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError>
where
  S: NoteStore + UserStore + Clone + Send + Sync + 'static,
{
  let Json(body) = body?;
  let email = normalize_email(&body.email);
  let bad_credentials = || ApiError::Unauthorized("Incorrect email or password".into());

  let Some(user) = state
    .store
    .find_user_by_email(&email)
    .await
    .map_err(ApiError::from_store)?
  else {
    tracing::warn!("login for unknown email");
    return Err(bad_credentials());
  };

  if !verify_password_blocking(body.password, user.password_hash.clone()).await {
    tracing::warn!(user_id = %user.user_id, "login with wrong password");
    return Err(bad_credentials());
  }
  if !user.is_active {
    return Err(ApiError::InactiveUser);
  }

  Ok(Json(issue(&state, user.profile())?))
}

// ─── Me ───────────────────────────────────────────────────────────────────────

/// `GET /auth/me`
pub async fn me(user: AuthUser) -> Json<UserProfile> { Json(user.0.profile()) }

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn emails_are_compared_case_insensitively() {
    assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
  }
}
