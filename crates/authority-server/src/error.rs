//! Errors raised while assembling the service.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("config error: {0}")]
  Config(#[from] config::ConfigError),

  #[error("scheme table: {0}")]
  Schemes(#[from] authority_core::Error),

  #[error("index error: {0}")]
  Index(#[from] authority_index::Error),

  #[error("provider setup: {0}")]
  Provider(#[from] authority_providers::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
