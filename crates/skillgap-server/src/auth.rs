//! HTTP Basic service authentication.
//!
//! Each calling service presents `service_id:token`; the token is checked
//! against the argon2 PHC hash configured for that service id.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::HeaderMap,
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::Error;

/// One service allowed to call the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceCredential {
  pub service_id: String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub token_hash: String,
}

/// Credentials accepted as valid for this server instance.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
  pub services: Vec<ServiceCredential>,
}

/// Inserted into request extensions once a caller is verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
  pub service_id: String,
}

/// Verify credentials directly from headers.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<Authenticated, Error> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (service_id, token) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  let credential = config
    .services
    .iter()
    .find(|c| c.service_id == service_id)
    .ok_or(Error::Unauthorized)?;

  let parsed_hash = PasswordHash::new(&credential.token_hash).map_err(|e| {
    warn!(service_id, error = %e, "configured token hash is not a PHC string");
    Error::Unauthorized
  })?;

  Argon2::default()
    .verify_password(token.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(Authenticated { service_id: service_id.to_owned() })
}

/// Middleware rejecting unauthenticated requests with 401.
pub async fn require_auth(
  State(auth): State<Arc<AuthConfig>>,
  mut req: Request,
  next: Next,
) -> Result<Response, Error> {
  let caller = verify_auth(req.headers(), &auth)?;
  debug!(service_id = %caller.service_id, "authenticated");
  req.extensions_mut().insert(caller);
  Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::{HeaderValue, header};

  fn hash(token: &str) -> String {
    use argon2::{PasswordHasher, password_hash::SaltString};
    use rand_core::OsRng;
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
      .hash_password(token.as_bytes(), &salt)
      .unwrap()
      .to_string()
  }

  fn make_config() -> AuthConfig {
    AuthConfig {
      services: vec![
        ServiceCredential { service_id: "exams".into(), token_hash: hash("s3cret") },
        ServiceCredential { service_id: "directory".into(), token_hash: hash("other") },
      ],
    }
  }

  fn basic(service: &str, token: &str) -> HeaderMap {
    let encoded = B64.encode(format!("{service}:{token}"));
    let mut headers = HeaderMap::new();
    headers.insert(
      header::AUTHORIZATION,
      HeaderValue::from_str(&format!("Basic {encoded}")).unwrap(),
    );
    headers
  }

  #[test]
  fn correct_credentials() {
    let config = make_config();
    let caller = verify_auth(&basic("directory", "other"), &config).unwrap();
    assert_eq!(caller.service_id, "directory");
  }

  #[test]
  fn token_of_another_service() {
    let config = make_config();
    assert!(matches!(
      verify_auth(&basic("exams", "other"), &config),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn unknown_service() {
    let config = make_config();
    assert!(matches!(
      verify_auth(&basic("billing", "s3cret"), &config),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn missing_header() {
    let config = make_config();
    assert!(matches!(verify_auth(&HeaderMap::new(), &config), Err(Error::Unauthorized)));
  }

  #[test]
  fn invalid_base64() {
    let config = make_config();
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic !!!not-base64!!!"));
    assert!(matches!(verify_auth(&headers, &config), Err(Error::Unauthorized)));
  }

  #[test]
  fn malformed_hash_is_rejected() {
    let config = AuthConfig {
      services: vec![ServiceCredential {
        service_id: "exams".into(),
        token_hash: "plaintext".into(),
      }],
    };
    assert!(matches!(
      verify_auth(&basic("exams", "plaintext"), &config),
      Err(Error::Unauthorized)
    ));
  }
}
