//! Database schema and migrations for filevault.
//!
//! Migrations are applied sequentially when the database is first opened
//! or upgraded. Timestamps are stored as UTC text (`YYYY-MM-DD HH:MM:SS`)
//! so the same statements run on SQLite and PostgreSQL.

/// Database migrations for SQLite.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
#[cfg(not(feature = "postgres"))]
pub const MIGRATIONS: &[&str] = &[
    // v1: users
    r#"
CREATE TABLE users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT NOT NULL,           -- Argon2 hash
    created_at    TEXT NOT NULL
);
"#,
    // v2: files
    r#"
CREATE TABLE files (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id      INTEGER NOT NULL REFERENCES users(id),  -- no cascade
    file_name     TEXT NOT NULL,
    upload_time   TEXT NOT NULL,
    size_bytes    INTEGER NOT NULL,
    storage_path  TEXT NOT NULL,
    file_type     TEXT NOT NULL DEFAULT '',
    external_url  TEXT NOT NULL DEFAULT '',
    description   TEXT NOT NULL DEFAULT '',
    is_shared     BOOLEAN NOT NULL DEFAULT 0,
    expires_at    TEXT                      -- NULL = never expires
);

CREATE INDEX idx_files_owner_id ON files(owner_id);
CREATE INDEX idx_files_expires_at ON files(expires_at);
"#,
];

/// Database migrations for PostgreSQL.
#[cfg(feature = "postgres")]
pub const MIGRATIONS: &[&str] = &[
    // v1: users
    r#"
CREATE TABLE users (
    id            BIGSERIAL PRIMARY KEY,
    email         TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE UNIQUE INDEX idx_users_email ON users(LOWER(email));
"#,
    // v2: files
    r#"
CREATE TABLE files (
    id            BIGSERIAL PRIMARY KEY,
    owner_id      BIGINT NOT NULL REFERENCES users(id),
    file_name     TEXT NOT NULL,
    upload_time   TEXT NOT NULL,
    size_bytes    BIGINT NOT NULL,
    storage_path  TEXT NOT NULL,
    file_type     TEXT NOT NULL DEFAULT '',
    external_url  TEXT NOT NULL DEFAULT '',
    description   TEXT NOT NULL DEFAULT '',
    is_shared     BOOLEAN NOT NULL DEFAULT FALSE,
    expires_at    TEXT
);

CREATE INDEX idx_files_owner_id ON files(owner_id);
CREATE INDEX idx_files_expires_at ON files(expires_at);
"#,
];
