//! The provider contract.
//!
//! A provider is any source that can suggest or look up authority records:
//! a remote authority file, or the local index itself. Capabilities a
//! provider does not offer answer with [`ProviderError::NotSupported`], which
//! the aggregator treats as an ordinary empty answer.

use std::{collections::HashSet, future::Future, pin::Pin};

use async_trait::async_trait;

use crate::{
  corporate::Corporate,
  id::{SchemeId, ScopedId},
  person::Person,
  place::Place,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
  /// The provider does not offer this capability.
  #[error("operation not supported by this provider")]
  NotSupported,

  /// Network or I/O trouble; the provider simply had nothing this time.
  #[error("transient provider failure: {0}")]
  Transient(#[source] BoxError),

  /// A defect (bad mapping, broken invariant). Aborts the whole call.
  #[error("provider failure: {0}")]
  Fatal(#[source] BoxError),
}

impl ProviderError {
  pub fn transient(e: impl Into<BoxError>) -> Self { Self::Transient(e.into()) }

  pub fn fatal(e: impl Into<BoxError>) -> Self { Self::Fatal(e.into()) }
}

// ─── Coverage ────────────────────────────────────────────────────────────────

/// Which identifier schemes a provider can resolve ids for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemeCoverage {
  All,
  Only(HashSet<SchemeId>),
}

impl SchemeCoverage {
  pub fn only<I, S>(schemes: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self::Only(schemes.into_iter().map(|s| SchemeId::new(s)).collect())
  }

  pub fn covers(&self, scheme: &SchemeId) -> bool {
    match self {
      Self::All => true,
      Self::Only(set) => set.contains(scheme),
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// A pluggable suggest/lookup source.
///
/// Every capability defaults to [`ProviderError::NotSupported`]; implementors
/// override the ones they offer.
#[async_trait]
pub trait Provider: Send + Sync {
  /// Short name used in logs and error reports.
  fn name(&self) -> &str;

  /// Higher priorities are ordered first and win merge ties.
  fn priority(&self) -> i32;

  fn coverage(&self) -> &SchemeCoverage;

  async fn suggest_person(&self, _term: &str) -> ProviderResult<Vec<Person>> {
    Err(ProviderError::NotSupported)
  }

  async fn suggest_corporate(&self, _term: &str) -> ProviderResult<Vec<Corporate>> {
    Err(ProviderError::NotSupported)
  }

  async fn suggest_place(&self, _term: &str) -> ProviderResult<Vec<Place>> {
    Err(ProviderError::NotSupported)
  }

  async fn lookup_person(&self, _id: &ScopedId) -> ProviderResult<Option<Person>> {
    Err(ProviderError::NotSupported)
  }

  async fn lookup_corporate(
    &self,
    _id: &ScopedId,
  ) -> ProviderResult<Option<Corporate>> {
    Err(ProviderError::NotSupported)
  }

  async fn lookup_place(&self, _id: &ScopedId) -> ProviderResult<Option<Place>> {
    Err(ProviderError::NotSupported)
  }
}
