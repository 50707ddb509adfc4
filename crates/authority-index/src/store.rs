//! The SQLite document store: read snapshots and the raw write primitives
//! used by the writer.
//!
//! Reads never share a connection with the writer. Every read opens a fresh
//! connection, runs inside one transaction (a consistent snapshot under WAL),
//! and closes the connection again on every exit path.

use std::{
  future::Future,
  path::{Path, PathBuf},
};

use rusqlite::{OpenFlags, OptionalExtension as _, types::Value};
use tracing::warn;

use crate::{
  Result,
  document::{Document, Field, FieldFlags, Query, Term, tokenize},
  mapper::KeyLookup,
};

/// Busy timeout for both reader and writer connections.
pub(crate) const BUSY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

// ─── Trait ───────────────────────────────────────────────────────────────────

/// The document store contract: keyed put, key lookup, predicate query and
/// existence check.
pub trait DocumentStore: Send + Sync {
  /// Replace every document matching `key` with `doc`.
  fn put(
    &self,
    key: Term,
    doc: Document,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  fn get(
    &self,
    key: Term,
  ) -> impl Future<Output = Result<Option<Document>>> + Send + '_;

  fn query(
    &self,
    query: Query,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Document>>> + Send + '_;

  fn exists(&self, key: Term) -> impl Future<Output = Result<bool>> + Send + '_;
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// A read view over one open transaction.
pub struct Snapshot<'c> {
  conn: &'c rusqlite::Connection,
}

impl<'c> Snapshot<'c> {
  pub(crate) fn new(conn: &'c rusqlite::Connection) -> Self { Self { conn } }

  fn load(&self, doc_id: i64) -> rusqlite::Result<Document> {
    let mut stmt = self.conn.prepare_cached(
      "SELECT name, value, analyzed FROM fields
       WHERE doc_id = ?1 AND stored = 1
       ORDER BY position",
    )?;
    let fields = stmt
      .query_map([doc_id], |r| {
        Ok(Field {
          name:  r.get(0)?,
          value: r.get(1)?,
          flags: FieldFlags { stored: true, analyzed: r.get(2)? },
        })
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(Document { fields })
  }

  fn find_doc_id(&self, key: &Term) -> rusqlite::Result<Option<i64>> {
    self
      .conn
      .query_row(
        "SELECT doc_id FROM fields WHERE name = ?1 AND value = ?2
         ORDER BY doc_id LIMIT 1",
        rusqlite::params![key.field, key.value],
        |r| r.get(0),
      )
      .optional()
  }

  pub fn get(&self, key: &Term) -> Result<Option<Document>> {
    match self.find_doc_id(key)? {
      Some(id) => Ok(Some(self.load(id)?)),
      None => Ok(None),
    }
  }

  pub fn exists(&self, key: &Term) -> Result<bool> {
    Ok(self.find_doc_id(key)?.is_some())
  }

  /// Documents with a positive score, best first, ties in insertion order.
  pub fn query(&self, query: &Query, limit: usize) -> Result<Vec<Document>> {
    let mut params = Vec::new();
    let score = score_expr(query, &mut params);
    params.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
    let sql = format!(
      "SELECT doc_id FROM (
         SELECT d.doc_id AS doc_id, {score} AS score FROM documents d
       ) WHERE score > 0
       ORDER BY score DESC, doc_id ASC
       LIMIT ?"
    );
    let ids = {
      let mut stmt = self.conn.prepare(&sql)?;
      stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |r| r.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?
    };
    let mut docs = Vec::with_capacity(ids.len());
    for id in ids {
      docs.push(self.load(id)?);
    }
    Ok(docs)
  }
}

impl KeyLookup for Snapshot<'_> {
  fn lookup(&self, key: &Term) -> Result<Option<Document>> { self.get(key) }
}

/// Compile `query` into an SQL expression evaluating to the number of
/// matching clauses for the document `d`.
fn score_expr(query: &Query, params: &mut Vec<Value>) -> String {
  match query {
    Query::Term(term) => {
      params.push(Value::Text(term.field.clone()));
      params.push(Value::Text(term.value.clone()));
      "EXISTS (SELECT 1 FROM fields f
               WHERE f.doc_id = d.doc_id AND f.name = ? AND f.value = ?)"
        .to_owned()
    }
    Query::Text { field, text } => {
      let clauses: Vec<String> = tokenize(text)
        .into_iter()
        .map(|token| {
          params.push(Value::Text(field.clone()));
          params.push(Value::Text(format!("% {token}%")));
          "EXISTS (SELECT 1 FROM fields f
                   WHERE f.doc_id = d.doc_id AND f.name = ?
                     AND f.analyzed = 1 AND f.folded LIKE ?)"
            .to_owned()
        })
        .collect();
      sum(clauses)
    }
    Query::Any(children) => {
      sum(children.iter().map(|c| score_expr(c, params)).collect())
    }
    Query::All(children) => {
      if children.is_empty() {
        return "0".to_owned();
      }
      // Placeholders are positional: the condition and the sum each bind
      // their own copy of the children's parameters, in text order.
      let every = children
        .iter()
        .map(|c| format!("({}) > 0", score_expr(c, params)))
        .collect::<Vec<_>>()
        .join(" AND ");
      let total = sum(children.iter().map(|c| score_expr(c, params)).collect());
      format!("(CASE WHEN {every} THEN {total} ELSE 0 END)")
    }
  }
}

fn sum(parts: Vec<String>) -> String {
  if parts.is_empty() {
    return "0".to_owned();
  }
  let joined = parts
    .iter()
    .map(|p| format!("({p})"))
    .collect::<Vec<_>>()
    .join(" + ");
  format!("({joined})")
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// Replace all documents matching `key` (or stored under the same key) with
/// `doc`, atomically.
pub(crate) fn put_document(
  conn: &mut rusqlite::Connection,
  key: &Term,
  doc: &Document,
) -> rusqlite::Result<()> {
  let doc_key = key.to_string();
  let tx = conn.transaction()?;
  tx.execute(
    "DELETE FROM documents
     WHERE doc_key = ?1
        OR doc_id IN (SELECT doc_id FROM fields WHERE name = ?2 AND value = ?3)",
    rusqlite::params![doc_key, key.field, key.value],
  )?;
  tx.execute("INSERT INTO documents (doc_key) VALUES (?1)", [&doc_key])?;
  let doc_id = tx.last_insert_rowid();
  {
    let mut stmt = tx.prepare_cached(
      "INSERT INTO fields (doc_id, position, name, value, stored, analyzed, folded)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for (position, field) in doc.fields.iter().enumerate() {
      let folded = field
        .flags
        .analyzed
        .then(|| format!(" {} ", tokenize(&field.value).join(" ")));
      stmt.execute(rusqlite::params![
        doc_id,
        position as i64,
        field.name,
        field.value,
        field.flags.stored,
        field.flags.analyzed,
        folded,
      ])?;
    }
  }
  tx.commit()
}

/// Purge free pages and refresh planner statistics.
pub(crate) fn compact(conn: &mut rusqlite::Connection) -> rusqlite::Result<()> {
  conn.execute_batch("VACUUM; PRAGMA optimize;")
}

/// Fold the write-ahead log back into the main file and truncate it.
pub(crate) fn checkpoint(conn: &mut rusqlite::Connection) -> rusqlite::Result<()> {
  conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
}

// ─── Reader ──────────────────────────────────────────────────────────────────

/// Opens a short-lived snapshot per read.
#[derive(Debug, Clone)]
pub struct IndexReader {
  path: PathBuf,
}

impl IndexReader {
  pub fn new(path: impl AsRef<Path>) -> Self {
    Self { path: path.as_ref().to_path_buf() }
  }

  /// Run `f` against a fresh snapshot. The connection is closed afterwards,
  /// whether `f` succeeded or not.
  pub async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Snapshot<'_>) -> Result<T> + Send + 'static,
  {
    let conn = tokio_rusqlite::Connection::open_with_flags(
      &self.path,
      OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .await?;

    let outcome = conn
      .call(move |conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "query_only", true)?;
        let tx = conn.transaction()?;
        Ok(f(&Snapshot::new(&tx)))
      })
      .await;

    if let Err(e) = conn.close().await {
      warn!("failed to close index snapshot: {e}");
    }
    outcome?
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn params_of(query: &Query) -> Vec<Value> {
    let mut params = Vec::new();
    score_expr(query, &mut params);
    params
  }

  #[test]
  fn text_query_binds_one_prefix_pattern_per_token() {
    let params = params_of(&Query::text("Person.displayName", "Goethe, J."));
    assert_eq!(params, vec![
      Value::Text("Person.displayName".into()),
      Value::Text("% goethe%".into()),
      Value::Text("Person.displayName".into()),
      Value::Text("% j%".into()),
    ]);
  }

  #[test]
  fn empty_queries_score_zero() {
    let mut params = Vec::new();
    assert_eq!(score_expr(&Query::Any(vec![]), &mut params), "0");
    assert_eq!(score_expr(&Query::All(vec![]), &mut params), "0");
    assert_eq!(score_expr(&Query::text("x", " , "), &mut params), "0");
    assert!(params.is_empty());
  }
}
