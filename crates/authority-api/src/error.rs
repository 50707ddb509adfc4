//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unknown entity type: {0}")]
  UnknownType(String),

  #[error(transparent)]
  Lookup(#[from] authority_lookup::Error),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      ApiError::UnknownType(_) => StatusCode::BAD_REQUEST,
      // Malformed ids and unknown schemes are the caller's fault.
      ApiError::Lookup(authority_lookup::Error::Core(_)) => StatusCode::BAD_REQUEST,
      ApiError::Lookup(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!("request failed: {self}");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
