//! The local authority index.
//!
//! Entities are mapped to flat documents through static descriptors and kept
//! in a SQLite file. Writes go through a single lazily opened writer
//! connection; reads open their own short-lived snapshots.

pub mod codec;
pub mod descriptor;
pub mod document;
pub mod engine;
pub mod error;
pub mod mapper;
pub mod provider;
pub mod writer;

mod schema;
mod store;

pub use engine::{IndexEngine, IndexSubscriber};
pub use error::{Error, Result};
pub use provider::IndexProvider;
pub use store::{DocumentStore, IndexReader, Snapshot};
pub use writer::{IndexWriter, WriterConfig, WriterStatus};
