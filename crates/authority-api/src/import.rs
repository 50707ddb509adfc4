//! `POST /import/personsById`
//!
//! The body is a plain list of `scheme:id` tokens separated by whitespace or
//! newlines. Entities are resolved before the response is sent; persisting
//! them happens in the background.

use authority_lookup::ImportReport;
use axum::{Json, extract::State};

use crate::{AppState, error::ApiError};

pub async fn persons_by_id(
  State(state): State<AppState>,
  body: String,
) -> Result<Json<ImportReport>, ApiError> {
  let report = state.aggregator.import_persons(&body).await?;
  Ok(Json(report))
}
