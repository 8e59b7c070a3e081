use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer};

use crate::observability::{observability_middleware, Metrics};

pub mod api;
pub mod cart;
pub mod health;
pub mod metrics;

pub use api::*;
pub use cart::*;
pub use health::*;
pub use metrics::*;

/// Build the full router: health, metrics, catalog and cart endpoints
pub fn create_app(state: ApiState, metrics: Arc<Metrics>, request_timeout: Duration) -> Router {
    let metrics_for_middleware = metrics.clone();

    Router::new()
        .route("/health/status", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
        .route("/api/services", get(list_services))
        .route("/api/cart", get(get_cart))
        .route("/api/cart/items", post(add_cart_item))
        .route(
            "/api/cart/items/:line_id",
            put(update_cart_item).delete(remove_cart_item),
        )
        .route("/api/cart/clear", post(clear_cart))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(move |req, next| {
            observability_middleware(metrics_for_middleware.clone(), req, next)
        }))
}
