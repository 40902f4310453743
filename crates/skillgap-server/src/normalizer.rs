//! HTTP client for an external competency normalization service.
//!
//! The service exposes three JSON endpoints:
//!
//! | Endpoint | Request | Response |
//! |----------|---------|----------|
//! | `POST {url}/normalize` | `{"name"}` | `{"name"}` |
//! | `POST {url}/discover`  | `{"name"}` | `{"competency": {..}\|null}` |
//! | `POST {url}/extract`   | `{"raw_data"}` | `{"competencies": [..]}` |

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use skillgap_core::normalize::{
  DiscoveredCompetency, ExternalError, Normalizer, Passthrough,
};
use tracing::debug;

use crate::error::Error;

const SERVICE: &str = "normalizer";

/// Connection settings for the normalization service.
#[derive(Debug, Clone, Deserialize)]
pub struct NormalizerConfig {
  pub url:          String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 { 10 }

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct HttpNormalizer {
  client:   Client,
  base_url: String,
}

impl HttpNormalizer {
  pub fn new(config: &NormalizerConfig) -> Result<Self, Error> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self {
      client,
      base_url: config.url.trim_end_matches('/').to_owned(),
    })
  }

  async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ExternalError>
  where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
  {
    let url = format!("{}{path}", self.base_url);
    debug!(%url, "calling normalization service");
    let resp = self
      .client
      .post(&url)
      .json(body)
      .send()
      .await
      .map_err(|e| ExternalError::new(SERVICE, format!("POST {path} failed: {e}")))?;

    if !resp.status().is_success() {
      return Err(ExternalError::new(
        SERVICE,
        format!("POST {path} → {}", resp.status()),
      ));
    }
    resp
      .json()
      .await
      .map_err(|e| ExternalError::new(SERVICE, format!("decoding {path} response: {e}")))
  }
}

#[derive(Deserialize)]
struct NormalizeResponse {
  name: String,
}

#[derive(Deserialize)]
struct DiscoverResponse {
  competency: Option<DiscoveredCompetency>,
}

#[derive(Deserialize)]
struct ExtractResponse {
  competencies: Vec<String>,
}

impl Normalizer for HttpNormalizer {
  async fn normalize_competency_name(&self, name: &str) -> Result<String, ExternalError> {
    let resp: NormalizeResponse = self.post("/normalize", &json!({ "name": name })).await?;
    Ok(resp.name)
  }

  async fn discover_competency(
    &self,
    name: &str,
  ) -> Result<Option<DiscoveredCompetency>, ExternalError> {
    let resp: DiscoverResponse = self.post("/discover", &json!({ "name": name })).await?;
    Ok(resp.competency)
  }

  async fn extract_competencies(&self, raw_data: &str) -> Result<Vec<String>, ExternalError> {
    let resp: ExtractResponse =
      self.post("/extract", &json!({ "raw_data": raw_data })).await?;
    Ok(resp.competencies)
  }
}

// ─── Configured choice ───────────────────────────────────────────────────────

/// The normalizer selected by configuration.
#[derive(Debug, Clone)]
pub enum ConfiguredNormalizer {
  Http(HttpNormalizer),
  Passthrough(Passthrough),
}

impl ConfiguredNormalizer {
  pub fn from_config(config: Option<&NormalizerConfig>) -> Result<Self, Error> {
    match config {
      Some(config) => Ok(Self::Http(HttpNormalizer::new(config)?)),
      None => Ok(Self::Passthrough(Passthrough)),
    }
  }
}

impl Normalizer for ConfiguredNormalizer {
  async fn normalize_competency_name(&self, name: &str) -> Result<String, ExternalError> {
    match self {
      Self::Http(n) => n.normalize_competency_name(name).await,
      Self::Passthrough(n) => n.normalize_competency_name(name).await,
    }
  }

  async fn discover_competency(
    &self,
    name: &str,
  ) -> Result<Option<DiscoveredCompetency>, ExternalError> {
    match self {
      Self::Http(n) => n.discover_competency(name).await,
      Self::Passthrough(n) => n.discover_competency(name).await,
    }
  }

  async fn extract_competencies(&self, raw_data: &str) -> Result<Vec<String>, ExternalError> {
    match self {
      Self::Http(n) => n.extract_competencies(raw_data).await,
      Self::Passthrough(n) => n.extract_competencies(raw_data).await,
    }
  }
}
