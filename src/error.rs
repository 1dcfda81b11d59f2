//! Error taxonomy shared by the engine, storage, oracle and HTTP layers.
//!
//! `AppError` is what handlers return; axum turns it into `{ "message": ... }`
//! with a matching status code. Nothing here is retried.

use axum::{
  extract::rejection::{JsonRejection, PathRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Failures of a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("{entity} {id} not found")]
  Missing { entity: &'static str, id: i64 },
  #[error("conversation {id} changed concurrently (expected progress {expected}, found {found})")]
  Conflict { id: i64, expected: i32, found: i32 },
  #[error("storage backend error: {0}")]
  Backend(String),
}

/// Failures of the scoring oracle (LLM or local stand-in).
#[derive(Debug, Error)]
pub enum OracleError {
  #[error("oracle request failed: {0}")]
  Http(#[from] reqwest::Error),
  #[error("oracle HTTP {status}: {message}")]
  Status { status: u16, message: String },
  #[error("oracle returned unusable output: {0}")]
  Decode(String),
}

#[derive(Debug, Error)]
pub enum AppError {
  #[error("{0}")]
  NotFound(String),
  #[error("{0}")]
  Validation(String),
  #[error("upstream service error: {0}")]
  Upstream(#[from] OracleError),
  #[error("storage error: {0}")]
  Storage(StoreError),
}

impl AppError {
  pub fn not_found(entity: &str, id: i64) -> Self {
    AppError::NotFound(format!("{} not found: {}", entity, id))
  }

  pub fn validation(msg: impl Into<String>) -> Self { AppError::Validation(msg.into()) }

  pub fn status(&self) -> StatusCode {
    match self {
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
      AppError::Storage(StoreError::Missing { .. }) => StatusCode::NOT_FOUND,
      AppError::Storage(StoreError::Conflict { .. }) => StatusCode::CONFLICT,
      AppError::Storage(StoreError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<StoreError> for AppError {
  fn from(e: StoreError) -> Self {
    match e {
      StoreError::Missing { entity, id } => AppError::not_found(entity, id),
      other => AppError::Storage(other),
    }
  }
}

/// Malformed bodies are client mistakes; keep them on the `{message}` contract.
impl From<JsonRejection> for AppError {
  fn from(rejection: JsonRejection) -> Self { AppError::Validation(rejection.body_text()) }
}

impl From<PathRejection> for AppError {
  fn from(rejection: PathRejection) -> Self { AppError::Validation(rejection.body_text()) }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(target: "kasa_backend", code = status.as_u16(), error = %self, "Request failed");
    } else {
      warn!(target: "kasa_backend", code = status.as_u16(), error = %self, "Request rejected");
    }
    (status, Json(json!({ "message": self.to_string() }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn statuses_follow_taxonomy() {
    assert_eq!(AppError::not_found("conversation", 9).status(), StatusCode::NOT_FOUND);
    assert_eq!(AppError::validation("bad").status(), StatusCode::BAD_REQUEST);
    let upstream: AppError = OracleError::Decode("not json".into()).into();
    assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
    let missing: AppError = StoreError::Missing { entity: "user", id: 3 }.into();
    assert!(matches!(missing, AppError::NotFound(_)));
    assert_eq!(AppError::from(StoreError::Backend("disk".into())).status(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
