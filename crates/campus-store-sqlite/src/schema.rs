//! SQL schemas for the two SQLite backends.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Document store DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const DOCUMENTS: &str = "
PRAGMA journal_mode = WAL;

-- One row per document. `collection` is the full collection path
-- (e.g. 'students/10/profiles'); `root` is its first segment and bounds
-- batch atomicity.
CREATE TABLE IF NOT EXISTS documents (
    collection  TEXT NOT NULL,
    doc_id      TEXT NOT NULL,
    root        TEXT NOT NULL,
    data        TEXT NOT NULL,   -- JSON object
    created_at  TEXT NOT NULL,   -- RFC 3339 UTC
    updated_at  TEXT NOT NULL,
    PRIMARY KEY (collection, doc_id)
);

CREATE INDEX IF NOT EXISTS documents_root_idx ON documents(root);

PRAGMA user_version = 1;
";

/// Identity directory DDL.
pub const DIRECTORY: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS accounts (
    account_id     TEXT PRIMARY KEY,
    email          TEXT NOT NULL UNIQUE,
    password_hash  TEXT NOT NULL,   -- argon2 PHC string
    created_at     TEXT NOT NULL
);

PRAGMA user_version = 1;
";
