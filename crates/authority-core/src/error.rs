//! Error types for `authority-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("malformed scoped id {0:?}: expected \"<scheme>:<value>\"")]
  Parse(String),

  #[error("unknown scheme: {0:?}")]
  UnknownScheme(String),

  #[error("scheme id or alias {0:?} is registered twice")]
  DuplicateScheme(String),

  #[error("unrecognised partial date: {0:?}")]
  InvalidDate(String),

  #[error("event bus is shut down")]
  EventBusClosed,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
