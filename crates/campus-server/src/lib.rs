//! Server wiring for Campus: configuration, backends, and the HTTP app.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use axum::Router;
use campus_api::{ApiSettings, AppState, api_router};
use campus_core::catalog::SchoolCatalog;
use campus_store_sqlite::{SqliteDirectory, SqliteStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `CAMPUS_`-prefixed environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                   String,
  #[serde(default = "default_port")]
  pub port:                   u16,
  pub documents_path:         PathBuf,
  pub directory_path:         PathBuf,
  pub email_domain:           String,
  #[serde(default = "default_provision_timeout")]
  pub provision_timeout_secs: u64,
  #[serde(default)]
  pub catalog:                SchoolCatalog,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_provision_timeout() -> u64 { 15 }

impl ServerConfig {
  /// Layer the optional TOML file at `path` under the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("CAMPUS"))
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Backends ─────────────────────────────────────────────────────────────────

pub struct Backends {
  pub directory: Arc<SqliteDirectory>,
  pub store:     Arc<SqliteStore>,
}

impl Backends {
  pub async fn open(config: &ServerConfig) -> anyhow::Result<Self> {
    let documents_path = expand_tilde(&config.documents_path);
    let store = SqliteStore::open(&documents_path)
      .await
      .with_context(|| format!("failed to open document store at {documents_path:?}"))?;

    let directory_path = expand_tilde(&config.directory_path);
    let directory = SqliteDirectory::open(&directory_path)
      .await
      .with_context(|| format!("failed to open identity directory at {directory_path:?}"))?;

    Ok(Self { directory: Arc::new(directory), store: Arc::new(store) })
  }
}

/// The full HTTP application: the API under `/api` with request tracing.
pub fn app(config: &ServerConfig, backends: &Backends) -> Router {
  let state = AppState::new(backends.directory.clone(), backends.store.clone(), ApiSettings {
    email_domain:      config.email_domain.clone(),
    provision_timeout: Duration::from_secs(config.provision_timeout_secs),
    catalog:           config.catalog.clone(),
  });
  Router::new()
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use config::{Config, File, FileFormat};
  use tower::ServiceExt as _;

  use super::*;

  const TOML: &str = r#"
    documents_path = ":memory:"
    directory_path = ":memory:"
    email_domain   = "school.test"

    [catalog.classes.10]
    sections = ["A", "B"]
    subjects = ["Maths", "English"]

    [catalog.classes.11]
    groups = ["Batch-1"]
  "#;

  fn parse(toml: &str) -> ServerConfig {
    Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn defaults_fill_optional_fields() {
    let config = parse(TOML);
    assert_eq!(config.address(), "127.0.0.1:8080");
    assert_eq!(config.provision_timeout_secs, 15);
    assert_eq!(config.catalog.classes["10"].sections, ["A", "B"]);
    assert_eq!(config.catalog.classes["11"].groups, ["Batch-1"]);
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/campus.db")), PathBuf::from(home).join("campus.db"));
    assert_eq!(expand_tilde(Path::new("/var/campus.db")), PathBuf::from("/var/campus.db"));
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let config = parse(TOML);
    let backends = Backends::open(&config).await.unwrap();
    let app = app(&config, &backends);

    let res = app
      .clone()
      .oneshot(Request::builder().method("POST").uri("/api/session").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
      .oneshot(Request::builder().uri("/session").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
  }
}
