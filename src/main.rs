use anyhow::Context;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};

use laundry_cart::{
    create_app, init_observability,
    repositories::{FileStore, KeyValueCartRepository},
    services::HttpCatalogProvider,
    shutdown_observability, ApiState, CartManager, CatalogService, Config, Metrics,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_environment().context("Failed to load configuration")?;

    init_observability(
        &config.observability.service_name,
        &config.observability.service_version,
        config.observability.otlp_endpoint.as_deref(),
        &config.observability.log_level,
        config.observability.enable_json_logging,
    )?;

    info!(
        "Starting {} v{}",
        config.observability.service_name, config.observability.service_version
    );

    let metrics = Arc::new(Metrics::new()?);

    let store = Arc::new(
        FileStore::open(&config.storage.storage_dir).with_context(|| {
            format!(
                "Failed to open storage directory {}",
                config.storage.storage_dir.display()
            )
        })?,
    );
    let repository = Arc::new(KeyValueCartRepository::new(
        store,
        config.storage.cart_key.clone(),
    ));
    info!(
        storage_dir = %config.storage.storage_dir.display(),
        cart_key = %config.storage.cart_key,
        "Cart storage ready"
    );

    let cart = CartManager::load_with_metrics(repository, Some(metrics.clone()));
    spawn_event_logger(&cart);

    let provider = HttpCatalogProvider::new(
        config.catalog.catalog_base_url.clone(),
        config.catalog.timeout(),
    )?;
    let catalog = CatalogService::new_with_metrics(Arc::new(provider), metrics.clone());
    info!(base_url = %config.catalog.catalog_base_url, "Catalog provider ready");

    let app = create_app(
        ApiState::new(cart, catalog),
        metrics,
        config.server.request_timeout(),
    );

    let addr = SocketAddr::new(
        config
            .server
            .host
            .parse()
            .with_context(|| format!("Invalid host {}", config.server.host))?,
        config.server.port,
    );
    let listener = TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Log cart events as notices for operators
fn spawn_event_logger(cart: &CartManager) {
    let mut events = cart.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => info!(kind = event.kind(), "{}", event.message()),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Cart event logger lagged")
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    shutdown_observability().await;
}
