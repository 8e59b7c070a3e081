use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use crate::handlers::api::{service_error_to_response, ApiState};
use crate::models::{CartEvent, CartLine, CartSummary, DEFAULT_QUANTITY};

/// Body of `POST /api/cart/items`
#[derive(Debug, Deserialize)]
pub struct AddCartItemRequest {
    #[serde(alias = "serviceId")]
    pub service_id: String,
    #[serde(default)]
    pub quantity: Option<i64>,
}

/// Body of `PUT /api/cart/items/:line_id`
#[derive(Debug, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
pub struct RemoveCartItemResponse {
    pub removed: Option<CartLine>,
    pub message: Option<String>,
    pub cart: CartSummary,
}

#[instrument(skip(state))]
pub async fn get_cart(State(state): State<ApiState>) -> Json<CartSummary> {
    Json(state.cart.lock().await.summary())
}

/// Resolve the service through the catalog, then add it to the cart
#[instrument(skip(state, request))]
pub async fn add_cart_item(
    State(state): State<ApiState>,
    Json(request): Json<AddCartItemRequest>,
) -> Result<(StatusCode, Json<CartSummary>), (StatusCode, Json<Value>)> {
    // Catalog lookup happens before the cart lock is taken
    let service = state
        .catalog
        .find_service(&request.service_id)
        .await
        .map_err(service_error_to_response)?;

    let quantity = request.quantity.unwrap_or(i64::from(DEFAULT_QUANTITY));

    let mut cart = state.cart.lock().await;
    let summary = cart.add_item(&service, quantity).summary();
    info!(item_count = summary.item_count, "{} added to cart", service.name);

    Ok((StatusCode::CREATED, Json(summary)))
}

#[instrument(skip(state, request))]
pub async fn update_cart_item(
    State(state): State<ApiState>,
    Path(line_id): Path<String>,
    Json(request): Json<UpdateCartItemRequest>,
) -> Json<CartSummary> {
    let mut cart = state.cart.lock().await;
    Json(cart.set_quantity(&line_id, request.quantity).summary())
}

#[instrument(skip(state))]
pub async fn remove_cart_item(
    State(state): State<ApiState>,
    Path(line_id): Path<String>,
) -> Json<RemoveCartItemResponse> {
    let mut cart = state.cart.lock().await;
    let removed = cart.remove_item(&line_id);
    let message = removed
        .as_ref()
        .map(|line| CartEvent::item_removed(line).message());

    Json(RemoveCartItemResponse {
        removed,
        message,
        cart: cart.summary(),
    })
}

/// Empty the cart after checkout
#[instrument(skip(state))]
pub async fn clear_cart(State(state): State<ApiState>) -> Json<CartSummary> {
    let mut cart = state.cart.lock().await;
    Json(cart.clear().summary())
}
