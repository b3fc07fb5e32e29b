//! Catalog API server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite catalog, connects the configured audit backend, and serves the JSON
//! API over HTTP.

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context as _;
use catalog_api::{AppState, AuditBackend, ServerConfig};
use catalog_audit::{ElasticStore, MemoryStore};
use catalog_core::{service::CatalogService, store::AuditStore};
use catalog_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Audited product catalog server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
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

  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let database_path = server_cfg.database_path();
  if let Some(parent) = database_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open_with_timeout(&database_path, server_cfg.busy_timeout())
    .await
    .with_context(|| format!("failed to open catalog at {database_path:?}"))?;

  match server_cfg.audit.backend {
    AuditBackend::Elasticsearch => {
      let audit = ElasticStore::new(server_cfg.audit.url.clone())
        .context("failed to build Elasticsearch client")?;
      tracing::info!(url = audit.base_url(), "audit history in Elasticsearch");
      serve(server_cfg, store, audit).await
    }
    AuditBackend::Memory => {
      tracing::warn!("audit history kept in memory; it is lost on restart");
      serve(server_cfg, store, MemoryStore::new()).await
    }
  }
}

async fn serve<A>(server_cfg: ServerConfig, store: SqliteStore, audit: A) -> anyhow::Result<()>
where
  A: AuditStore + 'static,
{
  let service = CatalogService::new(Arc::new(store), Arc::new(audit), server_cfg.policy());
  let app = catalog_api::router(AppState::new(service)).layer(TraceLayer::new_for_http());
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(
    listener,
    app.into_make_service_with_connect_info::<SocketAddr>(),
  )
  .await
  .context("server error")?;

  Ok(())
}
