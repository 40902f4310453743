//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,

  /// The loaded configuration is unusable.
  #[error("invalid configuration: {0}")]
  Config(String),

  #[error("http client error: {0}")]
  Http(#[from] reqwest::Error),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let (status, code) = match &self {
      Error::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
      Error::Config(_) | Error::Http(_) => {
        (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
      }
    };
    let body = json!({
      "success": false,
      "error": { "code": code, "message": self.to_string() },
      "timestamp": Utc::now(),
    });

    let mut res = (status, Json(body)).into_response();
    if matches!(self, Error::Unauthorized) {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"skillgap\""),
      );
    }
    res
  }
}
