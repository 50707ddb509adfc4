//! The index as a provider: answers suggest and lookup calls from what has
//! been persisted so far.

use std::sync::Arc;

use async_trait::async_trait;
use authority_core::{
  corporate::Corporate,
  entity::AuthorityEntity,
  id::ScopedId,
  person::Person,
  place::Place,
  provider::{Provider, ProviderError, ProviderResult, SchemeCoverage},
};

use crate::{Error, engine::IndexEngine};

pub const INDEX_PROVIDER_PRIORITY: i32 = 50;

/// Maximum number of suggestions returned per call.
pub const SUGGEST_LIMIT: usize = 10;

pub struct IndexProvider {
  engine:   Arc<IndexEngine>,
  coverage: SchemeCoverage,
}

impl IndexProvider {
  pub fn new(engine: Arc<IndexEngine>) -> Self {
    Self { engine, coverage: SchemeCoverage::All }
  }

  async fn suggest<E: AuthorityEntity>(&self, term: &str) -> ProviderResult<Vec<E>> {
    let found = self
      .engine
      .suggest(E::KIND, term, SUGGEST_LIMIT)
      .await
      .map_err(provider_error)?;
    Ok(found.into_iter().filter_map(E::from_entity).collect())
  }

  async fn lookup<E: AuthorityEntity>(&self, id: &ScopedId) -> ProviderResult<Option<E>> {
    let found = self
      .engine
      .find_by_id(E::KIND, id)
      .await
      .map_err(provider_error)?;
    Ok(found.and_then(E::from_entity))
  }
}

/// Mapping failures are defects; anything else means the index is
/// unavailable right now.
pub(crate) fn provider_error(e: Error) -> ProviderError {
  match e {
    Error::Mapping(_) => ProviderError::fatal(e),
    _ => ProviderError::transient(e),
  }
}

#[async_trait]
impl Provider for IndexProvider {
  fn name(&self) -> &str { "index" }

  fn priority(&self) -> i32 { INDEX_PROVIDER_PRIORITY }

  fn coverage(&self) -> &SchemeCoverage { &self.coverage }

  async fn suggest_person(&self, term: &str) -> ProviderResult<Vec<Person>> {
    self.suggest(term).await
  }

  async fn suggest_corporate(&self, term: &str) -> ProviderResult<Vec<Corporate>> {
    self.suggest(term).await
  }

  async fn suggest_place(&self, term: &str) -> ProviderResult<Vec<Place>> {
    self.suggest(term).await
  }

  async fn lookup_person(&self, id: &ScopedId) -> ProviderResult<Option<Person>> {
    self.lookup(id).await
  }

  async fn lookup_corporate(
    &self,
    id: &ScopedId,
  ) -> ProviderResult<Option<Corporate>> {
    self.lookup(id).await
  }

  async fn lookup_place(&self, id: &ScopedId) -> ProviderResult<Option<Place>> {
    self.lookup(id).await
  }
}
