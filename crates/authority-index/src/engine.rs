//! [`IndexEngine`]: entity-level access to the index, and the event
//! subscriber that persists canonical entities.

use std::sync::Arc;

use async_trait::async_trait;
use authority_core::{
  entity::{Entity, EntityKind},
  event::{Event, Payload, Subscriber, Topic},
  id::ScopedId,
  provider::BoxError,
};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{
  Result,
  descriptor::{Describe, field_name},
  document::{Document, Query, Term},
  mapper::{self, id_term},
  store::{DocumentStore, IndexReader},
  writer::{IndexWriter, WriteOp, WriterConfig, WriterStatus},
};

pub struct IndexEngine {
  reader: IndexReader,
  writer: IndexWriter,
}

impl std::fmt::Debug for IndexEngine {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("IndexEngine")
      .field("reader", &self.reader)
      .field("writer", &self.writer)
      .finish()
  }
}

impl IndexEngine {
  /// Open (or create) the index described by `config`.
  pub async fn open(config: WriterConfig) -> Result<Self> {
    let reader = IndexReader::new(&config.path);
    info!(path = %config.path.display(), "opening index");
    let writer = IndexWriter::start(config).await?;
    Ok(Self { reader, writer })
  }

  // ── Writes ──────────────────────────────────────────────────────────────

  /// Store `entity`, after every entity it references that is not stored
  /// yet.
  pub async fn persist(&self, entity: &Entity) -> Result<()> {
    for referenced in mapper::referenced_entities(entity) {
      let key = mapper::key_term(&referenced)?;
      if self.exists(key.clone()).await? {
        continue;
      }
      self.put(key, mapper::to_document(&referenced)).await?;
    }
    let key = mapper::key_term(entity)?;
    debug!(%key, "persisting entity");
    self.put(key, mapper::to_document(entity)).await
  }

  /// Store many entities through one queue, waiting for all of them at the
  /// end. Returns how many were written.
  pub async fn persist_all(&self, entities: &[Entity]) -> Result<usize> {
    let mut tickets = Vec::new();
    let mut queued = std::collections::HashSet::new();
    for entity in entities {
      for referenced in mapper::referenced_entities(entity) {
        let key = mapper::key_term(&referenced)?;
        if queued.contains(&key) || self.exists(key.clone()).await? {
          continue;
        }
        queued.insert(key.clone());
        let doc = mapper::to_document(&referenced);
        tickets.push(self.writer.submit(WriteOp::Put { key, doc }).await?);
      }
      let key = mapper::key_term(entity)?;
      queued.insert(key.clone());
      let doc = mapper::to_document(entity);
      tickets.push(self.writer.submit(WriteOp::Put { key, doc }).await?);
    }
    let written = tickets.len();
    for ticket in tickets {
      ticket.await.map_err(|_| crate::Error::WriterGone)??;
    }
    info!(entities = entities.len(), documents = written, "batch persisted");
    Ok(written)
  }

  pub async fn optimize(&self) -> Result<()> { self.writer.optimize().await }

  pub async fn shutdown(&self) -> Result<()> { self.writer.shutdown().await }

  pub fn writer_status(&self) -> WriterStatus { self.writer.status() }

  pub fn watch_writer_status(&self) -> watch::Receiver<WriterStatus> {
    self.writer.watch_status()
  }

  // ── Reads ───────────────────────────────────────────────────────────────

  /// Whether a document with `entity`'s key is stored.
  pub async fn contains(&self, entity: &Entity) -> Result<bool> {
    self.exists(mapper::key_term(entity)?).await
  }

  /// Entities matching `query`, best first.
  pub async fn find(&self, query: Query, limit: usize) -> Result<Vec<Entity>> {
    self
      .reader
      .read(move |snapshot| {
        snapshot
          .query(&query, limit)?
          .iter()
          .map(|doc| mapper::to_entity(doc, snapshot))
          .collect()
      })
      .await
  }

  /// The stored entity of `kind` carrying `id`, if any.
  pub async fn find_by_id(
    &self,
    kind: EntityKind,
    id: &ScopedId,
  ) -> Result<Option<Entity>> {
    let key = id_term(kind, id.to_string());
    self
      .reader
      .read(move |snapshot| {
        snapshot
          .get(&key)?
          .map(|doc| mapper::to_entity(&doc, snapshot))
          .transpose()
      })
      .await
  }

  /// Free-text search over every analyzed field of `kind`.
  pub async fn suggest(
    &self,
    kind: EntityKind,
    term: &str,
    limit: usize,
  ) -> Result<Vec<Entity>> {
    self.find(suggest_query(kind, term), limit).await
  }
}

fn analyzed_fields<E: Describe>() -> Vec<String> {
  E::fields()
    .iter()
    .filter(|d| d.flags.analyzed)
    .map(|d| field_name(E::KIND, d.name))
    .collect()
}

pub(crate) fn suggest_query(kind: EntityKind, term: &str) -> Query {
  use authority_core::{corporate::Corporate, person::Person, place::Place};

  let fields = match kind {
    EntityKind::Person => analyzed_fields::<Person>(),
    EntityKind::Corporate => analyzed_fields::<Corporate>(),
    EntityKind::Place => analyzed_fields::<Place>(),
  };
  Query::Any(fields.into_iter().map(|f| Query::text(f, term)).collect())
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for IndexEngine {
  async fn put(&self, key: Term, doc: Document) -> Result<()> {
    self.writer.put(key, doc).await
  }

  async fn get(&self, key: Term) -> Result<Option<Document>> {
    self.reader.read(move |snapshot| snapshot.get(&key)).await
  }

  async fn query(&self, query: Query, limit: usize) -> Result<Vec<Document>> {
    self
      .reader
      .read(move |snapshot| snapshot.query(&query, limit))
      .await
  }

  async fn exists(&self, key: Term) -> Result<bool> {
    self.reader.read(move |snapshot| snapshot.exists(&key)).await
  }
}

// ─── Subscriber ──────────────────────────────────────────────────────────────

/// Persists every canonical entity published on the bus. Import batches are
/// written through one queue and followed by an optimize.
pub struct IndexSubscriber {
  engine: Arc<IndexEngine>,
}

impl IndexSubscriber {
  pub fn new(engine: Arc<IndexEngine>) -> Self { Self { engine } }
}

#[async_trait]
impl Subscriber for IndexSubscriber {
  fn name(&self) -> &str { "index" }

  fn topics(&self) -> &[Topic] { &[Topic::Indexed, Topic::ImportBatch] }

  async fn handle(&self, event: &Event) -> std::result::Result<(), BoxError> {
    match &event.payload {
      Payload::Indexed(entity) => self.engine.persist(entity).await?,
      Payload::ImportBatch(entities) => {
        self.engine.persist_all(entities).await?;
        self.engine.optimize().await?;
      }
    }
    Ok(())
  }
}
