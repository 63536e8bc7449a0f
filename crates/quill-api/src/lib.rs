//! JSON REST API for Quill.
//!
//! Exposes an axum [`Router`] backed by any store implementing both
//! [`NoteStore`] and [`UserStore`]. Every `/notes` route requires a bearer
//! token issued by `/auth/signup` or `/auth/login`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/` | Health check |
//! | `POST`   | `/auth/signup` | Body: `{email, password, full_name?}` |
//! | `POST`   | `/auth/login` | Body: `{email, password}` |
//! | `GET`    | `/auth/me` | Current user profile |
//! | `GET`    | `/notes/` | `?search`, `?skip`, `?limit` |
//! | `POST`   | `/notes/` | Body: `{title, content, tags?, is_favorite?}`; 201 |
//! | `GET`    | `/notes/{id}` | 404 unless owned by the caller |
//! | `PUT`    | `/notes/{id}` | Body must carry `version`; 409 when stale |
//! | `DELETE` | `/notes/{id}` | 404 unless owned by the caller |

pub mod account;
pub mod auth;
pub mod error;
pub mod notes;
pub mod token;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Json, Router,
  http::{HeaderValue, Method, header},
  routing::{get, post},
};
use quill_core::store::{NoteStore, UserStore};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use token::TokenIssuer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `QUILL_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:              String,
  #[serde(default = "default_port")]
  pub port:              u16,
  #[serde(default = "default_store_path")]
  pub store_path:        PathBuf,
  /// HMAC key for bearer tokens. Generate one with `--generate-secret`.
  pub token_secret:      String,
  #[serde(default = "default_token_ttl_minutes")]
  pub token_ttl_minutes: i64,
  /// Browser origins allowed to call the API.
  #[serde(default = "default_cors_origins")]
  pub cors_origins:      Vec<String>,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8000 }
fn default_store_path() -> PathBuf { PathBuf::from("quill.sqlite3") }
fn default_token_ttl_minutes() -> i64 { 30 }
fn default_cors_origins() -> Vec<String> { vec!["http://localhost:5173".to_string()] }

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub tokens: Arc<TokenIssuer>,
  pub config: Arc<ServerConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the notes API.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: NoteStore + UserStore + Clone + Send + Sync + 'static,
{
  let cors = cors_layer(&state.config.cors_origins);

  Router::new()
    .route("/", get(health))
    // Accounts
    .route("/auth/signup", post(account::signup::<S>))
    .route("/auth/login", post(account::login::<S>))
    .route("/auth/me", get(account::me))
    // Notes
    .route("/notes", get(notes::list::<S>).post(notes::create::<S>))
    .route("/notes/", get(notes::list::<S>).post(notes::create::<S>))
    .route(
      "/notes/{id}",
      get(notes::get_one::<S>)
        .put(notes::update::<S>)
        .delete(notes::delete_one::<S>),
    )
    .layer(cors)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// `GET /`
async fn health() -> Json<Value> { Json(json!({ "message": "Quill notes API is running" })) }

fn cors_layer(origins: &[String]) -> CorsLayer {
  let origins: Vec<HeaderValue> = origins
    .iter()
    .filter_map(|o| match HeaderValue::from_str(o) {
      Ok(v) => Some(v),
      Err(_) => {
        tracing::warn!(origin = %o, "ignoring invalid CORS origin");
        None
      }
    })
    .collect();

  CorsLayer::new()
    .allow_origin(origins)
    .allow_methods([
      Method::GET,
      Method::POST,
      Method::PUT,
      Method::DELETE,
      Method::OPTIONS,
    ])
    .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

// ─── Integration tests ────────────────────────────────────────────────────────
