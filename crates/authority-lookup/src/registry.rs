//! The fixed set of providers consulted by the aggregator.

use std::sync::Arc;

use authority_core::{id::SchemeId, provider::Provider};
use tracing::info;

/// Providers in registration order. Built once at startup, never changed.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
  providers: Vec<Arc<dyn Provider>>,
}

impl std::fmt::Debug for ProviderRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_list()
      .entries(self.providers.iter().map(|p| (p.name(), p.priority())))
      .finish()
  }
}

impl ProviderRegistry {
  pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
    for p in &providers {
      info!(
        provider = p.name(),
        priority = p.priority(),
        coverage = ?p.coverage(),
        "provider registered"
      );
    }
    Self { providers }
  }

  /// Providers that can resolve ids of `scheme`, with their registration
  /// index.
  pub fn covering(&self, scheme: &SchemeId) -> Vec<(usize, Arc<dyn Provider>)> {
    self
      .providers
      .iter()
      .enumerate()
      .filter(|(_, p)| p.coverage().covers(scheme))
      .map(|(i, p)| (i, p.clone()))
      .collect()
  }

  /// Every provider with its registration index.
  pub fn indexed(&self) -> Vec<(usize, Arc<dyn Provider>)> {
    self.providers.iter().cloned().enumerate().collect()
  }
}

#[cfg(test)]
mod tests {
  use async_trait::async_trait;
  use authority_core::provider::SchemeCoverage;

  use super::*;

  struct Named(&'static str, SchemeCoverage);

  #[async_trait]
  impl Provider for Named {
    fn name(&self) -> &str { self.0 }

    fn priority(&self) -> i32 { 0 }

    fn coverage(&self) -> &SchemeCoverage { &self.1 }
  }

  #[test]
  fn covering_filters_by_scheme_and_keeps_indices() {
    let registry = ProviderRegistry::new(vec![
      Arc::new(Named("gnd", SchemeCoverage::only(["DNB"]))),
      Arc::new(Named("orcid", SchemeCoverage::only(["ORCID"]))),
      Arc::new(Named("index", SchemeCoverage::All)),
    ]);
    let names: Vec<_> = registry
      .covering(&SchemeId::new("DNB"))
      .into_iter()
      .map(|(i, p)| (i, p.name().to_owned()))
      .collect();
    assert_eq!(names, vec![(0, "gnd".to_owned()), (2, "index".to_owned())]);
    assert_eq!(registry.indexed().len(), 3);
  }
}
