//! Core types and trait definitions for authority record aggregation.
//!
//! Identifiers and schemes, the mergeable entity model, the provider
//! contract and the in-process event bus. This crate has no HTTP or database
//! dependencies; every other crate builds on it.

pub mod corporate;
pub mod date;
pub mod entity;
pub mod error;
pub mod event;
pub mod id;
pub mod person;
pub mod place;
pub mod provider;
pub mod scheme;

pub use error::{Error, Result};
