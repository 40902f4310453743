//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure is rendered as
//! `{"success": false, "error": {"code", "message"}, "timestamp"}`.

use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;
use skillgap_core::Error as CoreError;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] CoreError),

  #[error("bad request: {0}")]
  BadRequest(String),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Core(e) => match e {
        CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        CoreError::Validation(_)
        | CoreError::HierarchyDepth(_)
        | CoreError::NotL1Skill(_)
        | CoreError::CyclicHierarchy { .. }
        | CoreError::HierarchyTooLarge { .. } => StatusCode::BAD_REQUEST,
        CoreError::ConcurrentModification { .. } => StatusCode::CONFLICT,
        CoreError::ExternalApi { .. } => StatusCode::BAD_GATEWAY,
        CoreError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }

  /// Stable machine-readable code for the envelope.
  pub fn code(&self) -> &'static str {
    match self {
      ApiError::BadRequest(_) => "BAD_REQUEST",
      ApiError::Core(e) => match e {
        CoreError::NotFound { .. } => "NOT_FOUND",
        CoreError::Validation(_) => "VALIDATION_ERROR",
        CoreError::HierarchyDepth(_) => "HIERARCHY_DEPTH_EXCEEDED",
        CoreError::NotL1Skill(_) => "NOT_L1_SKILL",
        CoreError::CyclicHierarchy { .. } => "CYCLIC_HIERARCHY",
        CoreError::HierarchyTooLarge { .. } => "HIERARCHY_TOO_LARGE",
        CoreError::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
        CoreError::ExternalApi { .. } => "EXTERNAL_API_ERROR",
        CoreError::Store(_) => "INTERNAL_ERROR",
      },
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
      error!(error = %self, "request failed");
      "internal server error".to_owned()
    } else {
      self.to_string()
    };

    let body = json!({
      "success": false,
      "error": { "code": self.code(), "message": message },
      "timestamp": Utc::now(),
    });
    (status, Json(body)).into_response()
  }
}
