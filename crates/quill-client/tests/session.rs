//! End-to-end tests against a real server on an ephemeral port.

use std::{
  path::PathBuf,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
};

use axum::{
  Json, Router,
  http::StatusCode,
  routing::{get, post},
};
use chrono::Duration;
use quill_api::{AppState, ServerConfig, token::TokenIssuer};
use quill_client::{
  ApiClient, ApiConfig, ClientError, EditSession, EditState, Session, SubmitOutcome,
};
use quill_core::{
  note::{NewNote, NoteChanges},
  store::NoteQuery,
};
use quill_store_sqlite::SqliteStore;
use serde_json::json;
use tokio::net::TcpListener;
use uuid::Uuid;

struct Server {
  url:   String,
  store: SqliteStore,
}

async fn spawn_server() -> Server {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let config = ServerConfig {
    host:              "127.0.0.1".to_string(),
    port:              0,
    store_path:        PathBuf::from(":memory:"),
    token_secret:      "end-to-end-test-secret-end-to-end".to_string(),
    token_ttl_minutes: 30,
    cors_origins:      vec![],
  };
  let state = AppState {
    store:  Arc::new(store.clone()),
    tokens: Arc::new(
      TokenIssuer::new(&config.token_secret, Duration::minutes(config.token_ttl_minutes))
        .unwrap(),
    ),
    config: Arc::new(config),
  };

  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, quill_api::router(state)).await.unwrap();
  });
  Server { url: format!("http://{addr}"), store }
}

fn client(server: &Server) -> ApiClient { ApiClient::new(ApiConfig::new(&server.url)).unwrap() }

async fn signup(server: &Server, email: &str) -> Session {
  Session::signup(client(server), email, "s3cret-pass", None).await.unwrap()
}

fn title(t: &str) -> NoteChanges {
  NoteChanges { title: Some(t.into()), ..NoteChanges::default() }
}

#[tokio::test]
async fn two_editors_one_wins() {
  let server = spawn_server().await;
  let alice = signup(&server, "alice@example.com").await;
  // A second session for the same account, e.g. another browser tab.
  let tab = Session::login(client(&server), "alice@example.com", "s3cret-pass")
    .await
    .unwrap();

  let note = alice.create_note(&NewNote::new("A", "B")).await.unwrap();
  assert_eq!(note.version, 1);

  let mut first = EditSession::open(&alice, note.id).await.unwrap();
  let mut second = EditSession::open(&tab, note.id).await.unwrap();

  let saved = first.submit(title("first")).await.unwrap();
  assert!(matches!(saved, SubmitOutcome::Saved(ref n) if n.version == 2));

  let stale = second.submit(title("second")).await.unwrap();
  assert!(matches!(stale, SubmitOutcome::Stale { known_version: 1 }));
  assert!(matches!(second.state(), EditState::Conflicted { .. }));

  let fresh = second.reload().await.unwrap();
  assert_eq!(fresh.version, 2);
  assert_eq!(fresh.title, "first");

  let saved = second.submit(title("second")).await.unwrap();
  assert!(matches!(saved, SubmitOutcome::Saved(ref n) if n.version == 3 && n.title == "second"));
}

#[tokio::test]
async fn raw_stale_update_is_version_conflict() {
  let server = spawn_server().await;
  let alice = signup(&server, "alice@example.com").await;
  let note = alice.create_note(&NewNote::new("A", "B")).await.unwrap();

  alice.update_note(note.id, 1, &title("C")).await.unwrap();
  let err = alice.update_note(note.id, 1, &title("D")).await.unwrap_err();
  assert!(err.is_conflict(), "{err:?}");
  assert_eq!(alice.get_note(note.id).await.unwrap().title, "C");
}

#[tokio::test]
async fn other_users_notes_are_not_found() {
  let server = spawn_server().await;
  let alice = signup(&server, "alice@example.com").await;
  let bob = signup(&server, "bob@example.com").await;
  let note = alice.create_note(&NewNote::new("private", "x")).await.unwrap();

  assert!(matches!(bob.get_note(note.id).await, Err(ClientError::NotFound(_))));
  assert!(matches!(
    bob.update_note(note.id, 1, &title("mine")).await,
    Err(ClientError::NotFound(_))
  ));
  assert!(matches!(bob.delete_note(note.id).await, Err(ClientError::NotFound(_))));
  assert!(matches!(
    EditSession::open(&bob, note.id).await,
    Err(ClientError::NotFound(_))
  ));

  // Bob's failures did not cost him his session.
  assert!(bob.is_valid());
  assert_eq!(bob.list_notes(&NoteQuery::default()).await.unwrap().total, 0);
}

#[tokio::test]
async fn search_and_delete() {
  let server = spawn_server().await;
  let alice = signup(&server, "alice@example.com").await;
  alice.create_note(&NewNote::new("Groceries", "milk")).await.unwrap();
  let keep = alice.create_note(&NewNote::new("Work", "standup")).await.unwrap();

  let page = alice.list_notes(&NoteQuery::search("WORK")).await.unwrap();
  assert_eq!(page.notes.len(), 1);
  assert_eq!(page.notes[0].id, keep.id);

  alice.delete_note(keep.id).await.unwrap();
  assert!(matches!(alice.get_note(keep.id).await, Err(ClientError::NotFound(_))));
  assert_eq!(alice.list_notes(&NoteQuery::default()).await.unwrap().total, 1);
}

#[tokio::test]
async fn inactive_account_is_refused() {
  let server = spawn_server().await;
  let alice = signup(&server, "alice@example.com").await;
  let me = alice.me().await.unwrap();
  assert_eq!(me.email, "alice@example.com");

  server.store.set_user_active(me.id, false).await.unwrap();
  assert!(matches!(
    alice.list_notes(&NoteQuery::default()).await,
    Err(ClientError::BadRequest(_))
  ));

  server.store.set_user_active(me.id, true).await.unwrap();
  assert!(alice.list_notes(&NoteQuery::default()).await.is_ok());
}

/// A server that accepts any login and then rejects every token.
async fn spawn_revoking_server(hits: Arc<AtomicUsize>) -> String {
  let login = || async {
    Json(json!({
      "access_token": "revoked-soon",
      "token_type": "bearer",
      "expires_in": 1800,
      "user": {
        "id": Uuid::nil(),
        "email": "alice@example.com",
        "full_name": null,
        "created_at": "2026-01-01T00:00:00Z",
        "is_active": true,
      },
    }))
  };
  let reject = move || {
    let hits = hits.clone();
    async move {
      hits.fetch_add(1, Ordering::SeqCst);
      (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "detail": "Could not validate credentials" })),
      )
    }
  };
  let app = Router::new()
    .route("/auth/login", post(login))
    .route("/notes/{id}", get(reject));

  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });
  format!("http://{addr}")
}

#[tokio::test]
async fn rejected_token_invalidates_session() {
  let hits = Arc::new(AtomicUsize::new(0));
  let url = spawn_revoking_server(hits.clone()).await;
  let client = ApiClient::new(ApiConfig::new(url)).unwrap();
  let session = Session::login(client, "alice@example.com", "whatever").await.unwrap();
  assert!(session.is_valid());

  let err = session.get_note(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, ClientError::Unauthorized(_)));
  assert!(!session.is_valid());

  // Fails fast without another round trip.
  let err = session.get_note(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, ClientError::SessionExpired));
  assert!(err.is_auth());
  assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn bad_login_is_unauthorized() {
  let server = spawn_server().await;
  signup(&server, "alice@example.com").await;
  let err = Session::login(client(&server), "alice@example.com", "wrong-pass")
    .await
    .unwrap_err();
  assert!(matches!(err, ClientError::Unauthorized(_)));

  let err = Session::signup(client(&server), "alice@example.com", "s3cret-pass", None)
    .await
    .unwrap_err();
  assert!(matches!(err, ClientError::BadRequest(_)));
}

#[tokio::test]
async fn logout_consumes_session() {
  let server = spawn_server().await;
  let alice = signup(&server, "alice@example.com").await;
  assert!(alice.is_valid());
  assert_eq!(alice.user().email, "alice@example.com");
  alice.logout();
}
