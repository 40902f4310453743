//! The success envelope wrapped around every handler result.

use axum::{Json, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
  pub success:   bool,
  pub data:      T,
  pub timestamp: DateTime<Utc>,
}

/// `200 OK` with `data` enveloped.
pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
  Json(Envelope { success: true, data, timestamp: Utc::now() })
}

/// `201 Created` with `data` enveloped.
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
  (StatusCode::CREATED, ok(data))
}
