//! Error type for `authority-lookup`.

use authority_core::provider::BoxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed id or unknown scheme in caller input.
  #[error(transparent)]
  Core(#[from] authority_core::Error),

  /// A provider reported a defect; the whole call is aborted.
  #[error("provider {provider} failed: {source}")]
  Provider {
    provider: String,
    #[source]
    source:   BoxError,
  },

  #[error("provider task panicked: {0}")]
  ProviderPanicked(#[from] tokio::task::JoinError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
