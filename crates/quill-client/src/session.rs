//! An authenticated session: one user's bearer token between login and
//! logout.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use quill_core::{
  note::{NewNote, Note, NoteChanges},
  store::NoteQuery,
  user::UserProfile,
};
use uuid::Uuid;

use crate::{
  client::{ApiClient, AuthResponse, NotePage, expiry_from},
  edit::NoteApi,
  error::ClientError,
};

/// Holds the credential for one signed-in user.
///
/// Created by [`Session::login`] or [`Session::signup`] and consumed by
/// [`Session::logout`]. Once the server answers 401, or the token's expiry
/// passes, every further call fails immediately with
/// [`ClientError::SessionExpired`].
pub struct Session {
  client:     ApiClient,
  token:      String,
  user:       UserProfile,
  expires_at: DateTime<Utc>,
  valid:      AtomicBool,
}

impl std::fmt::Debug for Session {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Session")
      .field("user", &self.user.email)
      .field("expires_at", &self.expires_at)
      .field("valid", &self.is_valid())
      .finish_non_exhaustive()
  }
}

impl Session {
  pub async fn login(client: ApiClient, email: &str, password: &str) -> Result<Self, ClientError> {
    let auth = client.login(email, password).await?;
    Ok(Self::from_auth(client, auth))
  }

  pub async fn signup(
    client: ApiClient,
    email: &str,
    password: &str,
    full_name: Option<&str>,
  ) -> Result<Self, ClientError> {
    let auth = client.signup(email, password, full_name).await?;
    Ok(Self::from_auth(client, auth))
  }

  fn from_auth(client: ApiClient, auth: AuthResponse) -> Self {
    tracing::debug!(user = %auth.user.id, "session started");
    Self {
      client,
      expires_at: expiry_from(auth.expires_in),
      token: auth.access_token,
      user: auth.user,
      valid: AtomicBool::new(true),
    }
  }

  /// End the session. The token is dropped with it.
  pub fn logout(self) {
    tracing::debug!(user = %self.user.id, "session ended");
  }

  pub fn user(&self) -> &UserProfile { &self.user }

  pub fn expires_at(&self) -> DateTime<Utc> { self.expires_at }

  pub fn is_valid(&self) -> bool {
    self.valid.load(Ordering::Acquire) && Utc::now() < self.expires_at
  }

  fn token(&self) -> Result<&str, ClientError> {
    if self.is_valid() {
      Ok(&self.token)
    } else {
      Err(ClientError::SessionExpired)
    }
  }

  /// Invalidate the session when the server rejects the token.
  fn track<T>(&self, result: Result<T, ClientError>) -> Result<T, ClientError> {
    if let Err(ClientError::Unauthorized(msg)) = &result {
      tracing::warn!(user = %self.user.id, %msg, "token rejected; session invalidated");
      self.valid.store(false, Ordering::Release);
    }
    result
  }

  // ── Calls ─────────────────────────────────────────────────────────────────

  /// Re-read the signed-in user's profile from the server.
  pub async fn me(&self) -> Result<UserProfile, ClientError> {
    let r = self.client.me(self.token()?).await;
    self.track(r)
  }

  pub async fn list_notes(&self, query: &NoteQuery) -> Result<NotePage, ClientError> {
    let r = self.client.list_notes(self.token()?, query).await;
    self.track(r)
  }

  pub async fn get_note(&self, id: Uuid) -> Result<Note, ClientError> {
    let r = self.client.get_note(self.token()?, id).await;
    self.track(r)
  }

  pub async fn create_note(&self, input: &NewNote) -> Result<Note, ClientError> {
    let r = self.client.create_note(self.token()?, input).await;
    self.track(r)
  }

  /// Send `changes` along with the version last seen. A stale version comes
  /// back as [`ClientError::VersionConflict`].
  pub async fn update_note(
    &self,
    id: Uuid,
    version: i64,
    changes: &NoteChanges,
  ) -> Result<Note, ClientError> {
    let r = self.client.update_note(self.token()?, id, version, changes).await;
    self.track(r)
  }

  pub async fn delete_note(&self, id: Uuid) -> Result<(), ClientError> {
    let r = self.client.delete_note(self.token()?, id).await;
    self.track(r)
  }
}

impl NoteApi for Session {
  async fn fetch_note(&self, id: Uuid) -> Result<Note, ClientError> { self.get_note(id).await }

  async fn save_note(
    &self,
    id: Uuid,
    version: i64,
    changes: &NoteChanges,
  ) -> Result<Note, ClientError> {
    self.update_note(id, version, changes).await
  }
}
