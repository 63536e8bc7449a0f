//! quill-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `QUILL_*` environment variables, opens the SQLite store and serves the
//! notes API over HTTP.
//!
//! # Token secret
//!
//! `token_secret` signs every bearer token and must be at least 32 bytes.
//! Generate one with:
//!
//! ```
//! cargo run -p quill-api --bin quill-server -- --generate-secret
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use chrono::Duration;
use clap::Parser;
use quill_api::{
  AppState, ServerConfig,
  token::{MIN_KEY_BYTES, TokenIssuer},
};
use quill_store_sqlite::SqliteStore;
use rand_core::{OsRng, RngCore};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Quill notes API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print a random value suitable for `token_secret` and exit.
  #[arg(long)]
  generate_secret: bool,

  /// Mark the account with this id inactive and exit.
  #[arg(long, value_name = "USER_ID")]
  deactivate_user: Option<Uuid>,

  /// Mark the account with this id active again and exit.
  #[arg(long, value_name = "USER_ID", conflicts_with = "deactivate_user")]
  activate_user: Option<Uuid>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.generate_secret {
    let mut bytes = [0u8; MIN_KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    println!("{}", hex::encode(bytes));
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("QUILL"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Operator mode: flip an account's active flag and exit.
  let toggle = cli
    .deactivate_user
    .map(|id| (id, false))
    .or(cli.activate_user.map(|id| (id, true)));
  if let Some((user_id, active)) = toggle {
    let found = store
      .set_user_active(user_id, active)
      .await
      .context("failed to update user")?;
    anyhow::ensure!(found, "no user with id {user_id}");
    println!("user {user_id} is now {}", if active { "active" } else { "inactive" });
    return Ok(());
  }

  anyhow::ensure!(
    server_cfg.token_secret.len() >= MIN_KEY_BYTES,
    "token_secret must be at least {MIN_KEY_BYTES} bytes (try --generate-secret)"
  );
  anyhow::ensure!(server_cfg.token_ttl_minutes > 0, "token_ttl_minutes must be positive");

  let tokens = TokenIssuer::new(
    &server_cfg.token_secret,
    Duration::minutes(server_cfg.token_ttl_minutes),
  )
  .context("invalid token secret")?;

  let state = AppState {
    store:  Arc::new(store),
    tokens: Arc::new(tokens),
    config: Arc::new(server_cfg.clone()),
  };

  let app = quill_api::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
    return;
  }
  tracing::info!("shutting down");
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
