use authority_core::provider::ProviderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{url} answered {status}")]
  Status { url: String, status: u16 },

  #[error("undecodable response: {0}")]
  Decode(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every remote failure is transient for the aggregator.
impl From<Error> for ProviderError {
  fn from(e: Error) -> Self { ProviderError::transient(e) }
}
