//! SQL schema for the Quill SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    full_name     TEXT,
    password_hash TEXT NOT NULL,   -- argon2 PHC string
    created_at    TEXT NOT NULL,   -- RFC 3339 UTC, fixed microsecond width
    is_active     INTEGER NOT NULL DEFAULT 1
);

-- Rows are only ever changed by the versioned UPDATE in store.rs, which
-- bumps `version` in the same statement that applies the new fields.
CREATE TABLE IF NOT EXISTS notes (
    note_id     TEXT PRIMARY KEY,
    owner_id    TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    title       TEXT NOT NULL,
    content     TEXT NOT NULL,
    tags        TEXT NOT NULL DEFAULT '[]',   -- JSON array of strings
    is_favorite INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    version     INTEGER NOT NULL DEFAULT 1,
    CHECK (version >= 1)
);

CREATE INDEX IF NOT EXISTS notes_owner_idx         ON notes(owner_id);
CREATE INDEX IF NOT EXISTS notes_owner_created_idx ON notes(owner_id, created_at DESC);

PRAGMA user_version = 1;
";
