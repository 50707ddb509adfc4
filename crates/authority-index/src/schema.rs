//! SQL schema for the document store.
//!
//! Executed every time the writer opens its connection; idempotent thanks to
//! `IF NOT EXISTS`. Future migrations will be gated on `PRAGMA user_version`.

/// Full schema DDL.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per indexed entity. doc_key is the key term (`Type.mappedIds:S:v`).
CREATE TABLE IF NOT EXISTS documents (
    doc_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    doc_key  TEXT NOT NULL UNIQUE
);

-- One row per emitted field, in document order.
CREATE TABLE IF NOT EXISTS fields (
    doc_id     INTEGER NOT NULL REFERENCES documents(doc_id) ON DELETE CASCADE,
    position   INTEGER NOT NULL,
    name       TEXT NOT NULL,
    value      TEXT NOT NULL,
    stored     INTEGER NOT NULL,   -- returned on load
    analyzed   INTEGER NOT NULL,   -- eligible for text matching
    folded     TEXT,               -- ' tok1 tok2 ' for analyzed fields
    PRIMARY KEY (doc_id, position)
);

CREATE INDEX IF NOT EXISTS fields_term_idx ON fields(name, value);
CREATE INDEX IF NOT EXISTS fields_doc_idx  ON fields(doc_id);

PRAGMA user_version = 1;
";
