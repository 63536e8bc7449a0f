//! Async HTTP client wrapping the Quill JSON API.
//!
//! [`ApiClient`] is stateless with respect to credentials: every
//! authenticated call takes the bearer token explicitly. Holding a token
//! between calls is the job of [`crate::Session`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use quill_core::{
  note::{NewNote, Note, NoteChanges},
  store::NoteQuery,
  user::UserProfile,
};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::error::ClientError;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the Quill API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub timeout:  Duration,
}

impl ApiConfig {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self { base_url: base_url.into(), timeout: DEFAULT_TIMEOUT }
  }
}

/// Body returned by signup and login.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
  pub access_token: String,
  pub token_type:   String,
  pub expires_in:   i64,
  pub user:         UserProfile,
}

/// One page of `GET /notes/`.
#[derive(Debug, Clone, Deserialize)]
pub struct NotePage {
  pub notes:    Vec<Note>,
  pub total:    usize,
  pub page:     usize,
  pub per_page: usize,
}

#[derive(Serialize)]
struct Credentials<'a> {
  email:    &'a str,
  password: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  full_name: Option<&'a str>,
}

#[derive(Serialize)]
struct UpdateBody<'a> {
  #[serde(flatten)]
  changes: &'a NoteChanges,
  version: i64,
}

#[derive(Deserialize)]
struct ErrorBody {
  detail: serde_json::Value,
}

/// Async HTTP client for the Quill JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self, ClientError> {
    let client = Client::builder().timeout(config.timeout).build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  // ── Accounts ──────────────────────────────────────────────────────────────

  /// `POST /auth/signup`
  pub async fn signup(
    &self,
    email: &str,
    password: &str,
    full_name: Option<&str>,
  ) -> Result<AuthResponse, ClientError> {
    let body = Credentials { email, password, full_name };
    send_json(self.client.post(self.url("/auth/signup")).json(&body)).await
  }

  /// `POST /auth/login`
  pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
    let body = Credentials { email, password, full_name: None };
    send_json(self.client.post(self.url("/auth/login")).json(&body)).await
  }

  /// `GET /auth/me`
  pub async fn me(&self, token: &str) -> Result<UserProfile, ClientError> {
    send_json(self.client.get(self.url("/auth/me")).bearer_auth(token)).await
  }

  // ── Notes ─────────────────────────────────────────────────────────────────

  /// `GET /notes/?search=<s>&skip=<n>&limit=<n>`
  pub async fn list_notes(&self, token: &str, query: &NoteQuery) -> Result<NotePage, ClientError> {
    let mut params = vec![
      ("skip", query.skip.to_string()),
      ("limit", query.limit.to_string()),
    ];
    if let Some(search) = query.search_text() {
      params.push(("search", search.to_string()));
    }
    send_json(
      self
        .client
        .get(self.url("/notes/"))
        .bearer_auth(token)
        .query(&params),
    )
    .await
  }

  /// `GET /notes/{id}`
  pub async fn get_note(&self, token: &str, id: Uuid) -> Result<Note, ClientError> {
    send_json(self.client.get(self.url(&format!("/notes/{id}"))).bearer_auth(token)).await
  }

  /// `POST /notes/`
  pub async fn create_note(&self, token: &str, input: &NewNote) -> Result<Note, ClientError> {
    send_json(self.client.post(self.url("/notes/")).bearer_auth(token).json(input)).await
  }

  /// `PUT /notes/{id}` carrying the version the caller last saw.
  pub async fn update_note(
    &self,
    token: &str,
    id: Uuid,
    version: i64,
    changes: &NoteChanges,
  ) -> Result<Note, ClientError> {
    let body = UpdateBody { changes, version };
    send_json(
      self
        .client
        .put(self.url(&format!("/notes/{id}")))
        .bearer_auth(token)
        .json(&body),
    )
    .await
  }

  /// `DELETE /notes/{id}`
  pub async fn delete_note(&self, token: &str, id: Uuid) -> Result<(), ClientError> {
    let resp = self
      .client
      .delete(self.url(&format!("/notes/{id}")))
      .bearer_auth(token)
      .send()
      .await?;
    check(resp).await.map(drop)
  }
}

/// Seconds-from-now lifetime to an absolute expiry.
pub(crate) fn expiry_from(expires_in: i64) -> DateTime<Utc> {
  Utc::now() + chrono::Duration::seconds(expires_in)
}

async fn send_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, ClientError> {
  let resp = check(req.send().await?).await?;
  Ok(resp.json().await?)
}

/// Pass successful responses through; turn anything else into a
/// [`ClientError`] chosen by status code.
async fn check(resp: Response) -> Result<Response, ClientError> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let text = resp.text().await.unwrap_or_default();
  let message = match serde_json::from_str::<ErrorBody>(&text) {
    Ok(ErrorBody { detail: serde_json::Value::String(s) }) => s,
    Ok(ErrorBody { detail }) => detail.to_string(),
    Err(_) => text,
  };
  tracing::debug!(%status, %message, "request failed");
  Err(ClientError::from_status(status, message))
}
