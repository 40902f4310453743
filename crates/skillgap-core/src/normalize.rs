//! The `Normalizer` trait: free-text names in, canonical taxonomy terms out.
//!
//! A normalizer sits only at the taxonomy-resolution boundary. Callers treat
//! its failures differently per operation: name normalization falls back to
//! the input string, discovery failure surfaces as `NotFound`, and extraction
//! failure is fatal (`Error::ExternalApi`).

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a normalization backend.
#[derive(Debug, Clone, Error)]
#[error("{service}: {message}")]
pub struct ExternalError {
  pub service: String,
  pub message: String,
}

impl ExternalError {
  pub fn new(service: impl Into<String>, message: impl Into<String>) -> Self {
    Self { service: service.into(), message: message.into() }
  }
}

impl From<ExternalError> for crate::Error {
  fn from(e: ExternalError) -> Self {
    crate::Error::ExternalApi { service: e.service, message: e.message }
  }
}

/// A competency proposed by discovery. The id is optional; the taxonomy
/// service assigns one when the backend does not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredCompetency {
  pub competency_id:   Option<String>,
  pub competency_name: String,
  pub description:     Option<String>,
}

pub trait Normalizer: Send + Sync {
  /// Map a free-text competency name onto its canonical spelling.
  fn normalize_competency_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<String, ExternalError>> + Send + 'a;

  /// Look outside the local taxonomy for a competency called `name`.
  /// `Ok(None)` means the backend answered but found nothing.
  fn discover_competency<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<DiscoveredCompetency>, ExternalError>> + Send + 'a;

  /// Pull competency names out of unstructured profile data (a CV, a
  /// directory export, ...).
  fn extract_competencies<'a>(
    &'a self,
    raw_data: &'a str,
  ) -> impl Future<Output = Result<Vec<String>, ExternalError>> + Send + 'a;
}

/// Used when no normalization service is configured: names pass through
/// trimmed, discovery finds nothing, and extraction is unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Normalizer for Passthrough {
  async fn normalize_competency_name(
    &self,
    name: &str,
  ) -> Result<String, ExternalError> {
    Ok(name.trim().to_owned())
  }

  async fn discover_competency(
    &self,
    _name: &str,
  ) -> Result<Option<DiscoveredCompetency>, ExternalError> {
    Ok(None)
  }

  async fn extract_competencies(
    &self,
    _raw_data: &str,
  ) -> Result<Vec<String>, ExternalError> {
    Err(ExternalError::new(
      "normalizer",
      "no normalization service is configured",
    ))
  }
}
