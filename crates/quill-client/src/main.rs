//! `quill`: command-line front end for the Quill notes API.
//!
//! # Usage
//!
//! ```
//! quill --url http://localhost:8000 --email alice@example.com --password secret list
//! quill --config ~/.config/quill/config.toml edit <id> --title "New title"
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use quill_client::{ApiClient, ApiConfig, EditSession, Session, SubmitOutcome};
use quill_core::{
  note::{NewNote, Note, NoteChanges},
  store::{DEFAULT_LIMIT, NoteQuery},
};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "quill", about = "Command-line client for the Quill notes API")]
struct Args {
  /// Path to a TOML config file (url, email, password).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the Quill server (default: http://localhost:8000).
  #[arg(long, env = "QUILL_URL")]
  url: Option<String>,

  #[arg(long, env = "QUILL_EMAIL")]
  email: Option<String>,

  #[arg(long, env = "QUILL_PASSWORD", hide_env_values = true)]
  password: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Register the configured email and password.
  Signup {
    #[arg(long)]
    full_name: Option<String>,
  },
  /// Show the signed-in account.
  Whoami,
  /// List notes, newest first.
  List {
    #[arg(short, long)]
    search: Option<String>,
    #[arg(long, default_value_t = 0)]
    skip:   usize,
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    limit:  usize,
  },
  /// Print one note.
  Show { id: Uuid },
  /// Create a note.
  New {
    #[arg(short, long)]
    title:    String,
    #[arg(short, long)]
    content:  String,
    /// May be repeated.
    #[arg(long = "tag")]
    tags:     Vec<String>,
    #[arg(long)]
    favorite: bool,
  },
  /// Change a note. Fails without retrying if someone else saved first.
  Edit {
    id:       Uuid,
    #[arg(short, long)]
    title:    Option<String>,
    #[arg(short, long)]
    content:  Option<String>,
    /// Replaces all tags. May be repeated.
    #[arg(long = "tag")]
    tags:     Option<Vec<String>>,
    #[arg(long)]
    favorite: Option<bool>,
  },
  /// Delete a note.
  Delete { id: Uuid },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  email:    String,
  #[serde(default)]
  password: String,
}

fn pick(flag: Option<String>, file: &str) -> Option<String> {
  flag.or_else(|| (!file.is_empty()).then(|| file.to_string()))
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags and env override the config file, which overrides defaults.
  let url = pick(args.url, &file_cfg.url).unwrap_or_else(|| "http://localhost:8000".to_string());
  let email = pick(args.email, &file_cfg.email).context("no email given (--email or QUILL_EMAIL)")?;
  let password =
    pick(args.password, &file_cfg.password).context("no password given (--password or QUILL_PASSWORD)")?;

  let client = ApiClient::new(ApiConfig::new(url)).context("building HTTP client")?;

  let session = match &args.command {
    Command::Signup { full_name } => {
      Session::signup(client, &email, &password, full_name.as_deref())
        .await
        .context("signup failed")?
    }
    _ => Session::login(client, &email, &password).await.context("login failed")?,
  };

  let result = run(&session, args.command).await;
  session.logout();
  result
}

async fn run(session: &Session, command: Command) -> Result<()> {
  match command {
    Command::Signup { .. } | Command::Whoami => {
      let me = session.me().await?;
      println!("{} ({})", me.email, me.id);
      if let Some(name) = me.full_name {
        println!("name:    {name}");
      }
      println!("since:   {}", me.created_at.format("%Y-%m-%d"));
      println!("active:  {}", me.is_active);
      println!(
        "session: valid until {}",
        session.expires_at().format("%Y-%m-%d %H:%M:%S UTC")
      );
    }

    Command::List { search, skip, limit } => {
      let query = NoteQuery { search, skip, limit };
      let page = session.list_notes(&query).await?;
      for note in &page.notes {
        let star = if note.is_favorite { "*" } else { " " };
        println!("{star} {}  v{:<3} {}", note.id, note.version, note.title);
      }
      println!(
        "page {} · {} shown · {} total",
        page.page,
        page.notes.len(),
        page.total
      );
    }

    Command::Show { id } => print_note(&session.get_note(id).await?),

    Command::New { title, content, tags, favorite } => {
      let input = NewNote { title, content, tags, is_favorite: favorite };
      let note = session.create_note(&input).await?;
      print_note(&note);
    }

    Command::Edit { id, title, content, tags, favorite } => {
      let changes = NoteChanges { title, content, tags, is_favorite: favorite };
      let mut edit = EditSession::open(session, id).await?;
      match edit.submit(changes).await? {
        SubmitOutcome::Saved(note) => print_note(&note),
        SubmitOutcome::Stale { known_version } => {
          let current = edit.reload().await?;
          print_note(&current);
          bail!(
            "note was changed elsewhere (you had v{known_version}, it is now v{}); \
             review it and edit again",
            current.version
          );
        }
        SubmitOutcome::Failed(e) => return Err(e.into()),
      }
    }

    Command::Delete { id } => {
      session.delete_note(id).await?;
      println!("deleted {id}");
    }
  }
  Ok(())
}

fn print_note(note: &Note) {
  println!("{}  (v{})", note.title, note.version);
  println!("id:       {}", note.id);
  if !note.tags.is_empty() {
    println!("tags:     {}", note.tags.join(", "));
  }
  if note.is_favorite {
    println!("favorite: yes");
  }
  println!("updated:  {}", note.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
  println!();
  println!("{}", note.content);
}
