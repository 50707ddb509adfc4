//! Handlers for `/lookup` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/lookup/{type}/{id}` | `type` is `person`, `corporate` or `place`; `null` if unknown |
//! | `GET`  | `/lookup/{type}s/{term}` | Merged suggestions, highest priority first |
//!
//! Both shapes share one route; the plural type segment selects suggest.

use axum::{
  Json,
  extract::{Path, State},
  response::{IntoResponse, Response},
};
use authority_core::entity::EntityKind;

use crate::{AppState, error::ApiError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
  Lookup(EntityKind),
  Suggest(EntityKind),
}

impl Target {
  pub fn parse(segment: &str) -> Result<Self, ApiError> {
    if let Ok(kind) = segment.parse() {
      return Ok(Target::Lookup(kind));
    }
    segment
      .strip_suffix('s')
      .and_then(|singular| singular.parse().ok())
      .map(Target::Suggest)
      .ok_or_else(|| ApiError::UnknownType(segment.to_owned()))
  }
}

/// `GET /lookup/{type}/{id}` and `GET /lookup/{type}s/{term}`
pub async fn handler(
  State(state): State<AppState>,
  Path((segment, value)): Path<(String, String)>,
) -> Result<Response, ApiError> {
  match Target::parse(&segment)? {
    Target::Lookup(kind) => {
      let id = state.aggregator.parse_id(&value)?;
      let found = state.aggregator.lookup_kind(kind, &id).await?;
      Ok(Json(found).into_response())
    }
    Target::Suggest(kind) => {
      let found = state.aggregator.suggest_kind(kind, &value).await?;
      Ok(Json(found).into_response())
    }
  }
}
