//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use catalog_core::Error;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub Error);

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match &self.0 {
      Error::NotFound { .. } => StatusCode::NOT_FOUND,
      Error::Conflict(_) => StatusCode::BAD_REQUEST,
      Error::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
      Error::AuditWriteFailed { .. } | Error::AuditQuery(_) => StatusCode::BAD_GATEWAY,
      Error::TableNotFound(_) | Error::Database(_) | Error::Serialization(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(status = status.as_u16(), error = %self.0, "request failed");
    }
    (status, Json(json!({ "error": self.0.to_string() }))).into_response()
  }
}
