mod app;
mod config;
mod error;
mod handlers;
mod identity;
mod model;
mod state;

use crate::app::App;
use crate::config::Config;
use crate::state::AppState;
use clap::Parser;
use snip_cache::LinkCache;
use snip_pipeline::{DeletePipeline, DeleteProducer, PipelineSettings};
use snip_service::{LinkService, RandomGenerator};
use snip_storage::{select_store, AnyStore, FileStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Outer bound on the whole shutdown sequence, over and above the
/// pipeline's own stop timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    let store = Arc::new(
        select_store(
            config.database_dsn.as_deref(),
            config.file_storage_path.clone(),
            config.store_connect_timeout(),
        )
        .await,
    );
    info!(backend = store.backend_name(), "durable store selected");

    let cache = Arc::new(LinkCache::new());
    let service = {
        let service = LinkService::new(cache, Arc::clone(&store), RandomGenerator::new());
        // Layered fallback: next to a database-backed store, the file
        // keeps receiving cache snapshots. When the file store is the
        // primary there is no second layer.
        match store.as_ref() {
            AnyStore::Postgres(_) => service.with_snapshot(Arc::new(FileStore::new(
                config.file_storage_path.clone(),
            ))),
            _ => service,
        }
    };

    match service.warm_cache().await {
        Ok(count) => info!(links = count, "cache warmed from durable store"),
        Err(err) => warn!(error = %err, "failed to warm cache, starting empty"),
    }

    let mut pipeline = DeletePipeline::new(
        Arc::clone(&store),
        PipelineSettings::builder()
            .flush_size(config.delete_flush_size)
            .flush_interval(config.delete_flush_interval())
            .channel_capacity(config.delete_channel_capacity)
            .build(),
    );
    let producers: Vec<DeleteProducer> = (0..config.delete_channels.max(1))
        .map(|_| pipeline.register_producer())
        .collect();
    let pipeline = pipeline.start();

    let state = AppState::new(Arc::new(service), producers, config.base_url.clone());
    let router = App::router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "starting snip gateway");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The HTTP boundary is gone; drain the delete pipeline under the
    // outer shutdown budget.
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, pipeline.stop()).await {
        Ok(()) => info!("shutdown complete"),
        Err(_) => warn!("shutdown timed out, exiting anyway"),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
}
