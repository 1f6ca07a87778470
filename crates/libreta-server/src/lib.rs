//! Libreta HTTP server: configuration loading and application assembly.
//!
//! The binary in `main.rs` is a thin wrapper around [`load_config`] and
//! [`app`].

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use libreta_store_sqlite::{SqliteStore, StoreConfig};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

/// Environment variables with this prefix override file settings, with `__`
/// separating nested keys (`LIBRETA_STORE__DATA_DIR`).
pub const ENV_PREFIX: &str = "LIBRETA";

pub const DEFAULT_BIND: &str = "127.0.0.1:8899";

/// Server configuration, read from `config.toml` and the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  /// Address to listen on, `host:port`.
  #[serde(default = "default_bind")]
  pub bind:  String,
  #[serde(default)]
  pub store: StoreConfig,
}

fn default_bind() -> String { DEFAULT_BIND.to_owned() }

impl Default for ServerConfig {
  fn default() -> Self {
    Self { bind: default_bind(), store: StoreConfig::default() }
  }
}

/// Values given on the command line; they win over file and environment.
#[derive(Debug, Default)]
pub struct Overrides {
  pub data_dir: Option<PathBuf>,
  pub bind:     Option<String>,
}

/// Layer `path` (optional), the environment, then `overrides`.
pub fn load_config(
  path: &Path,
  overrides: Overrides,
) -> Result<ServerConfig, config::ConfigError> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true),
    )
    .set_override_option(
      "store.data_dir",
      overrides
        .data_dir
        .map(|p| p.to_string_lossy().into_owned()),
    )?
    .set_override_option("bind", overrides.bind)?
    .build()?;

  let mut server_cfg: ServerConfig = settings.try_deserialize()?;
  server_cfg.store.data_dir = expand_tilde(&server_cfg.store.data_dir);
  Ok(server_cfg)
}

/// The full application: the API routes wrapped in request tracing.
pub fn app(store: Arc<SqliteStore>) -> Router {
  libreta_api::api_router(store).layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
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
  use tempfile::TempDir;
  use tower::ServiceExt as _;

  use super::*;

  #[test]
  fn missing_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let cfg = load_config(&dir.path().join("absent.toml"), Overrides::default())
      .unwrap();
    assert_eq!(cfg.bind, DEFAULT_BIND);
    assert_eq!(cfg.store.busy_timeout_ms, 5_000);
    assert_eq!(cfg.store.data_dir, PathBuf::from("./"));
  }

  #[test]
  fn file_values_and_cli_overrides() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
      &path,
      "bind = \"0.0.0.0:9000\"\n\n[store]\ndata_dir = \"/srv/notes\"\nslow_query_ms = 50\n",
    )
    .unwrap();

    let cfg = load_config(&path, Overrides::default()).unwrap();
    assert_eq!(cfg.bind, "0.0.0.0:9000");
    assert_eq!(cfg.store.data_dir, PathBuf::from("/srv/notes"));
    assert_eq!(cfg.store.slow_query_ms, 50);

    let cfg = load_config(&path, Overrides {
      data_dir: Some(PathBuf::from("/tmp/elsewhere")),
      bind:     Some("127.0.0.1:1".into()),
    })
    .unwrap();
    assert_eq!(cfg.bind, "127.0.0.1:1");
    assert_eq!(cfg.store.data_dir, PathBuf::from("/tmp/elsewhere"));
    assert_eq!(cfg.store.slow_query_ms, 50);
  }

  #[test]
  fn tilde_expands_to_home() {
    if let Ok(home) = std::env::var("HOME") {
      assert_eq!(expand_tilde(Path::new("~/notes")), PathBuf::from(home).join("notes"));
    }
    assert_eq!(expand_tilde(Path::new("/abs")), PathBuf::from("/abs"));
  }

  #[tokio::test]
  async fn app_serves_api_routes() {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::open(StoreConfig::new(dir.path())).await.unwrap();
    let req = Request::post("/rpc/generate_node_id").body(Body::empty()).unwrap();

    let resp = app(Arc::new(store)).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
  }
}
