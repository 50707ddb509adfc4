//! Error type for `authority-index`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A descriptor or codec failed while converting between entity and
  /// document. Indicates a defect, never bad user input.
  #[error("mapping error: {0}")]
  Mapping(String),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("index writer is shut down")]
  WriterShutDown,

  #[error("index writer stopped unexpectedly")]
  WriterGone,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
