//! Network providers for the aggregator.

pub mod error;
pub mod lobid;
pub mod record;

pub use error::{Error, Result};
pub use lobid::{LobidConfig, LobidProvider};
