//! Fan-out, ordering and merging of provider answers.

use std::{cmp::Reverse, sync::Arc, time::Duration};

use authority_core::{
  corporate::Corporate,
  entity::{AuthorityEntity, Entity, EntityKind},
  event::{Event, EventBus},
  id::ScopedId,
  person::Person,
  place::Place,
  provider::{BoxFuture, Provider, ProviderError, ProviderResult},
  scheme::SchemeRegistry,
};
use serde::Serialize;
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{Error, Result, registry::ProviderRegistry};

/// Concurrent lookups while importing an id list.
const IMPORT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Default)]
pub struct AggregatorConfig {
  /// Upper bound for a single provider call. An elapsed call counts as a
  /// transient failure of that provider.
  pub provider_timeout: Option<Duration>,
}

/// Outcome of [`Aggregator::import_persons`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
  pub id:        Uuid,
  pub requested: usize,
  /// Distinct entities in the published batch, after merging.
  pub imported:  usize,
  pub not_found: usize,
  /// Tokens that were not well-formed ids of a known scheme.
  pub invalid:   Vec<String>,
}

/// One provider's successful answer.
struct Answer<T> {
  index:    usize,
  priority: i32,
  value:    T,
}

// ─── Aggregator ──────────────────────────────────────────────────────────────

/// Cheap to clone; all state is shared.
#[derive(Debug, Clone)]
pub struct Aggregator {
  providers: Arc<ProviderRegistry>,
  schemes:   Arc<SchemeRegistry>,
  events:    Arc<EventBus>,
  config:    AggregatorConfig,
}

impl Aggregator {
  pub fn new(
    providers: Arc<ProviderRegistry>,
    schemes: Arc<SchemeRegistry>,
    events: Arc<EventBus>,
    config: AggregatorConfig,
  ) -> Self {
    Self { providers, schemes, events, config }
  }

  /// Parse `scheme:value` against the configured schemes.
  pub fn parse_id(&self, s: &str) -> Result<ScopedId> {
    Ok(self.schemes.parse_id(s)?)
  }

  // ── Suggest ─────────────────────────────────────────────────────────────

  /// Ask every provider for candidates matching `term` and merge the
  /// answers. Higher-priority providers come first; a merged record keeps
  /// the position of its earliest occurrence.
  pub async fn suggest<E: AuthorityEntity>(&self, term: &str) -> Result<Vec<E>> {
    let term: Arc<str> = Arc::from(term.trim());
    let answers = self
      .fan_out("suggest", self.providers.indexed(), move |provider| {
        let term = term.clone();
        Box::pin(async move { E::suggest_from(provider.as_ref(), &term).await })
      })
      .await?;
    let candidates: Vec<E> = answers.into_iter().flat_map(|a| a.value).collect();
    let found = candidates.len();
    let merged = merge_pass(candidates);
    debug!(kind = %E::KIND, found, merged = merged.len(), "suggest merged");
    Ok(merged)
  }

  pub async fn suggest_kind(&self, kind: EntityKind, term: &str) -> Result<Vec<Entity>> {
    Ok(match kind {
      EntityKind::Person => into_entities(self.suggest::<Person>(term).await?),
      EntityKind::Corporate => into_entities(self.suggest::<Corporate>(term).await?),
      EntityKind::Place => into_entities(self.suggest::<Place>(term).await?),
    })
  }

  // ── Lookup ──────────────────────────────────────────────────────────────

  /// Resolve `id` through every provider covering its scheme, merge the
  /// answers by priority and publish the result on the `indexed` topic.
  /// Returns `None`, and publishes nothing, when no provider knows the id.
  pub async fn lookup<E: AuthorityEntity>(&self, id: &ScopedId) -> Result<Option<E>> {
    let merged = self.resolve::<E>(id).await?;
    if let Some(entity) = &merged {
      let event = Event::indexed(entity.clone().into_entity());
      let delivery = self.events.publish(&event).await;
      debug!(event = %event.id, %id, ?delivery, "lookup result published");
    }
    Ok(merged)
  }

  pub async fn lookup_kind(
    &self,
    kind: EntityKind,
    id: &ScopedId,
  ) -> Result<Option<Entity>> {
    Ok(match kind {
      EntityKind::Person => self.lookup::<Person>(id).await?.map(Entity::from),
      EntityKind::Corporate => self.lookup::<Corporate>(id).await?.map(Entity::from),
      EntityKind::Place => self.lookup::<Place>(id).await?.map(Entity::from),
    })
  }

  /// Lookup without publishing.
  async fn resolve<E: AuthorityEntity>(&self, id: &ScopedId) -> Result<Option<E>> {
    let providers = self.providers.covering(id.scheme());
    if providers.is_empty() {
      debug!(%id, "no provider covers this scheme");
      return Ok(None);
    }
    let owned = id.clone();
    let answers = self
      .fan_out("lookup", providers, move |provider| {
        let id = owned.clone();
        Box::pin(async move { E::lookup_from(provider.as_ref(), &id).await })
      })
      .await?;

    let mut found = answers.into_iter().filter_map(|a| a.value);
    let Some(mut merged) = found.next() else {
      return Ok(None);
    };
    for other in found {
      merged.merge(other);
    }
    Ok(Some(merged))
  }

  // ── Import ──────────────────────────────────────────────────────────────

  /// Resolve every whitespace-separated person id in `input` and publish the
  /// results as one import batch. Resolution publishes no per-item events.
  pub async fn import_persons(&self, input: &str) -> Result<ImportReport> {
    let mut report = ImportReport {
      id:        Uuid::new_v4(),
      requested: 0,
      imported:  0,
      not_found: 0,
      invalid:   Vec::new(),
    };

    let mut ids = Vec::new();
    for token in input.split_whitespace() {
      report.requested += 1;
      match self.schemes.parse_id(token) {
        Ok(id) => ids.push(id),
        Err(e) => {
          warn!(import = %report.id, token, "skipping import token: {e}");
          report.invalid.push(token.to_owned());
        }
      }
    }

    let permits = Arc::new(Semaphore::new(IMPORT_CONCURRENCY));
    let mut set = JoinSet::new();
    for id in ids {
      let this = self.clone();
      let permits = permits.clone();
      set.spawn(async move {
        let _permit = permits.acquire_owned().await;
        this.resolve::<Person>(&id).await
      });
    }

    let mut persons = Vec::new();
    while let Some(joined) = set.join_next().await {
      match joined?? {
        Some(person) => persons.push(person),
        None => report.not_found += 1,
      }
    }
    let entities = into_entities(merge_pass(persons));
    report.imported = entities.len();
    if !entities.is_empty() {
      let event = Event::import_batch(entities);
      let queued = self.events.publish_async(event)?;
      debug!(import = %report.id, subscribers = queued, "import batch queued");
    }
    info!(
      import = %report.id,
      requested = report.requested,
      imported = report.imported,
      not_found = report.not_found,
      invalid = report.invalid.len(),
      "import resolved"
    );
    Ok(report)
  }

  // ── Fan-out ─────────────────────────────────────────────────────────────

  /// Run `call` against every provider concurrently and return the
  /// successful answers, highest priority first, ties in registration order.
  ///
  /// `NotSupported` and transient failures (including timeouts) contribute
  /// nothing; a fatal failure or a panic aborts the remaining calls.
  async fn fan_out<T, F>(
    &self,
    operation: &'static str,
    providers: Vec<(usize, Arc<dyn Provider>)>,
    call: F,
  ) -> Result<Vec<Answer<T>>>
  where
    T: Send + 'static,
    F: Fn(Arc<dyn Provider>) -> BoxFuture<'static, ProviderResult<T>>,
  {
    let mut set = JoinSet::new();
    for (index, provider) in providers {
      let pending = call(provider.clone());
      let limit = self.config.provider_timeout;
      set.spawn(async move {
        let outcome = match limit {
          Some(limit) => tokio::time::timeout(limit, pending)
            .await
            .unwrap_or_else(|elapsed| Err(ProviderError::transient(elapsed))),
          None => pending.await,
        };
        (index, provider, outcome)
      });
    }

    let mut answers = Vec::new();
    while let Some(joined) = set.join_next().await {
      let (index, provider, outcome) = joined?;
      match outcome {
        Ok(value) => answers.push(Answer { index, priority: provider.priority(), value }),
        Err(ProviderError::NotSupported) => {
          debug!(provider = provider.name(), operation, "not supported");
        }
        Err(ProviderError::Transient(e)) => {
          warn!(provider = provider.name(), operation, "provider unavailable: {e}");
        }
        Err(ProviderError::Fatal(source)) => {
          return Err(Error::Provider { provider: provider.name().to_owned(), source });
        }
      }
    }
    answers.sort_by_key(|a| (Reverse(a.priority), a.index));
    Ok(answers)
  }
}

/// Fold records that probably denote the same entity into the earliest one.
pub fn merge_pass<E: AuthorityEntity>(items: impl IntoIterator<Item = E>) -> Vec<E> {
  let mut accepted: Vec<E> = Vec::new();
  for item in items {
    match accepted.iter_mut().find(|a| a.is_probably_same_as(&item)) {
      Some(existing) => existing.merge(item),
      None => accepted.push(item),
    }
  }
  accepted
}

fn into_entities<E: AuthorityEntity>(items: Vec<E>) -> Vec<Entity> {
  items.into_iter().map(E::into_entity).collect()
}
