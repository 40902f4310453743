//! HTTP server for skillgap.
//!
//! Wraps the JSON API from [`skillgap_api`] with service authentication,
//! request tracing and an unauthenticated health check.

pub mod auth;
pub mod error;
pub mod normalizer;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Json, Router, middleware, response::IntoResponse, routing::get};
use serde::Deserialize;
use serde_json::json;
use skillgap_api::{AppState, SkillgapStore, api_router};
use skillgap_core::{hierarchy::TraversalLimits, normalize::Normalizer};
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, ServiceCredential, require_auth};
use normalizer::NormalizerConfig;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `SKILLGAP_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  pub store_path:          PathBuf,
  /// Node budget for a single hierarchy traversal.
  #[serde(default = "default_max_traversal_nodes")]
  pub max_traversal_nodes: usize,
  #[serde(default)]
  pub services:            Vec<ServiceCredential>,
  /// Without a normalization service names pass through unchanged and
  /// discovery and extraction are unavailable.
  #[serde(default)]
  pub normalizer:          Option<NormalizerConfig>,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_max_traversal_nodes() -> usize { TraversalLimits::default().max_nodes }

impl ServerConfig {
  /// Reject configurations that would leave the API unusable.
  pub fn validate(&self) -> Result<(), Error> {
    if self.services.is_empty() {
      return Err(Error::Config(
        "at least one entry in `services` is required".to_string(),
      ));
    }
    if self.max_traversal_nodes == 0 {
      return Err(Error::Config(
        "max_traversal_nodes must be positive".to_string(),
      ));
    }
    Ok(())
  }

  pub fn limits(&self) -> TraversalLimits {
    TraversalLimits { max_nodes: self.max_traversal_nodes }
  }

  pub fn auth(&self) -> AuthConfig {
    AuthConfig { services: self.services.clone() }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router: `/health` plus the authenticated API
/// under `/api`.
pub fn router<S, N>(api: AppState<S, N>, auth: Arc<AuthConfig>) -> Router
where
  S: SkillgapStore,
  N: Normalizer + 'static,
{
  let api = api_router(api).layer(middleware::from_fn_with_state(auth, require_auth));

  Router::new()
    .route("/health", get(health))
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse {
  Json(json!({
    "success": true,
    "data": { "status": "ok" },
    "timestamp": chrono::Utc::now(),
  }))
}
