use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use thiserror::Error;

use crate::schema::SchemaViolation;

/// Any failure to obtain a conforming structured result from the generation service.
/// The controller converts every variant to a fixed user-facing message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
  #[error("generation backend disabled (no OPENAI_API_KEY)")]
  Disabled,

  #[error("HTTP error: {0}")]
  Http(String),

  #[error("API error (status {status}): {message}")]
  Api { status: u16, message: String },

  #[error("generation service returned empty output")]
  Empty,

  #[error("JSON parse error: {0}")]
  Parse(String),

  #[error(transparent)]
  Schema(#[from] SchemaViolation),

  #[error("content contract violated: {0}")]
  Contract(String),
}

impl From<reqwest::Error> for GenerationError {
  fn from(e: reqwest::Error) -> Self { GenerationError::Http(e.to_string()) }
}

impl From<serde_json::Error> for GenerationError {
  fn from(e: serde_json::Error) -> Self { GenerationError::Parse(e.to_string()) }
}

/// Errors of the HTTP surface. Session-level failures never reach here; they
/// are part of the session snapshot.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("Unknown session: {0}")]
  UnknownSession(String),

  #[error("Too many live sessions (limit {0}); try again later")]
  SessionLimit(usize),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, code) = match &self {
      ApiError::UnknownSession(_) => (StatusCode::NOT_FOUND, "UNKNOWN_SESSION"),
      ApiError::SessionLimit(_) => (StatusCode::SERVICE_UNAVAILABLE, "SESSION_LIMIT"),
    };
    let body = Json(json!({ "error": { "code": code, "message": self.to_string() } }));
    (status, body).into_response()
  }
}
