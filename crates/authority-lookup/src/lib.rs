//! Provider registry and aggregator.
//!
//! The aggregator fans suggest and lookup calls out to every registered
//! provider, orders the answers by provider priority and folds records that
//! denote the same real-world entity into one canonical record.

pub mod aggregator;
pub mod error;
pub mod registry;

pub use aggregator::{Aggregator, AggregatorConfig, ImportReport};
pub use error::{Error, Result};
pub use registry::ProviderRegistry;

#[cfg(test)]
mod tests;
