//! SQL schema for the polls SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS questions (
    question_id INTEGER PRIMARY KEY AUTOINCREMENT,
    text        TEXT NOT NULL,
    pub_date    TEXT NOT NULL,   -- fixed-width RFC 3339 UTC, see encode_dt
    end_date    TEXT NOT NULL,
    CHECK (pub_date <= end_date)
);

CREATE TABLE IF NOT EXISTS choices (
    choice_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    question_id INTEGER NOT NULL REFERENCES questions(question_id) ON DELETE CASCADE,
    text        TEXT NOT NULL,
    UNIQUE (choice_id, question_id)
);

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

-- One row per (user, question); re-votes overwrite choice_id in place.
-- The composite foreign key keeps choice and question consistent.
CREATE TABLE IF NOT EXISTS votes (
    user_id     TEXT    NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    question_id INTEGER NOT NULL REFERENCES questions(question_id) ON DELETE CASCADE,
    choice_id   INTEGER NOT NULL,
    voted_at    TEXT    NOT NULL,
    PRIMARY KEY (user_id, question_id),
    FOREIGN KEY (choice_id, question_id)
        REFERENCES choices(choice_id, question_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS sessions (
    token_digest TEXT PRIMARY KEY,   -- hex SHA-256 of the cookie token
    user_id      TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    expires_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS questions_pub_idx  ON questions(pub_date);
CREATE INDEX IF NOT EXISTS choices_question_idx ON choices(question_id);
CREATE INDEX IF NOT EXISTS votes_choice_idx   ON votes(choice_id);
CREATE INDEX IF NOT EXISTS sessions_user_idx  ON sessions(user_id);

PRAGMA user_version = 1;
";
