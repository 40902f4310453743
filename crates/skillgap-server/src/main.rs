//! skillgap server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), layers
//! `SKILLGAP_*` environment variables on top, opens an in-process SQLite
//! store, and serves the JSON API over HTTP.
//!
//! # Token hash generation
//!
//! To generate the argon2 PHC string for a `services[].token_hash` entry:
//!
//! ```
//! cargo run -p skillgap-server -- --hash-token
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use rand_core::OsRng;
use skillgap_api::AppState;
use skillgap_server::{ServerConfig, normalizer::ConfiguredNormalizer};
use skillgap_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "skillgap competency and gap-analysis server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a service token entered on stdin and exit.
  #[arg(long)]
  hash_token: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Helper mode: hash a token and exit.
  if cli.hash_token {
    let token = read_token()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(token.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  // `SKILLGAP_NORMALIZER__URL` sets `normalizer.url`.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("SKILLGAP").separator("__"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  server_cfg.validate()?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let normalizer = ConfiguredNormalizer::from_config(server_cfg.normalizer.as_ref())
    .context("failed to build normalizer client")?;
  if let ConfiguredNormalizer::Passthrough(_) = normalizer {
    tracing::info!("no normalizer configured; competency names pass through unchanged");
  }

  let api = AppState::new(Arc::new(store), Arc::new(normalizer))
    .with_limits(server_cfg.limits());
  let app = skillgap_server::router(api, Arc::new(server_cfg.auth()));
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!(services = server_cfg.services.len(), "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a token from stdin.
fn read_token() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Token: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  match (s.strip_prefix("~/"), std::env::var("HOME")) {
    (Some(rest), Ok(home)) => PathBuf::from(home).join(rest),
    _ => path.to_path_buf(),
  }
}
