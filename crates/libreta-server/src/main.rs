//! Libreta server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store in the configured data directory, and serves the JSON API
//! over HTTP until interrupted.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use libreta_server::{Overrides, app, load_config};
use libreta_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Libreta note server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Directory holding the database file.
  #[arg(long)]
  data_dir: Option<PathBuf>,

  /// Address to listen on, `host:port`.
  #[arg(long)]
  bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = load_config(&cli.config, Overrides {
    data_dir: cli.data_dir,
    bind:     cli.bind,
  })
  .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let data_dir = server_cfg.store.data_dir.clone();
  let store = SqliteStore::open(server_cfg.store)
    .await
    .with_context(|| format!("failed to open store in {data_dir:?}"))?;
  let store = Arc::new(store);

  tracing::info!("Listening on http://{}", server_cfg.bind);
  let listener = TcpListener::bind(&server_cfg.bind)
    .await
    .with_context(|| format!("failed to bind {}", server_cfg.bind))?;

  axum::serve(listener, app(store.clone()))
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  store.close().await.context("failed to close store")?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}
