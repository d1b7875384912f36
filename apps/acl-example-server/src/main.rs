//! ACL example server.
//!
//! Serves the example models over an in-memory store. The caller is named
//! by the `user` header:
//!
//! ```text
//! curl -H 'user: admin' http://127.0.0.1:8087/api/users
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod auth;
mod config;
mod models;

use std::sync::Arc;

use acl::{AclService, ModelConfigRegistry, RootOption};
use acl_sdk::DataStore;
use anyhow::Context;
use clap::Parser;
use memory_store_plugin::MemoryStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use auth::UserHeaderResolver;
use config::{AppConfig, Cli, LogFormat, ServerConfig};

fn init_logging(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match server.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}

fn build_service(config: &AppConfig) -> anyhow::Result<Arc<AclService>> {
    let store: Arc<dyn DataStore> = Arc::new(
        MemoryStore::from_config(&config.store).context("failed to seed the memory store")?,
    );

    let registry = Arc::new(ModelConfigRegistry::from_config(&config.acl));
    models::register(&registry)?;
    registry.set_root_option(RootOption::RootPermissions(Arc::new(
        UserHeaderResolver::new(Arc::clone(&store)),
    )))?;

    Ok(Arc::new(AclService::new(registry, store)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
    }
    init_logging(&config.server);

    let service = build_service(&config)?;
    let app = acl::router(service)?.layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;
    tracing::info!(addr = %listener.local_addr()?, "ACL example server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
