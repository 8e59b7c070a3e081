use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, instrument};

use crate::models::{PriceUnit, Service, ServiceError, ServiceFilters};
use crate::services::{CartManager, CatalogService};

/// Shared state for the catalog and cart endpoints
#[derive(Clone)]
pub struct ApiState {
    pub cart: Arc<Mutex<CartManager>>,
    pub catalog: Arc<CatalogService>,
}

impl ApiState {
    pub fn new(cart: CartManager, catalog: CatalogService) -> Self {
        Self {
            cart: Arc::new(Mutex::new(cart)),
            catalog: Arc::new(catalog),
        }
    }
}

/// Query parameters for listing services
#[derive(Debug, Default, Deserialize)]
pub struct ListServicesQuery {
    pub category: Option<String>,
    #[serde(alias = "q")]
    pub search: Option<String>,
    #[serde(alias = "priceType")]
    pub price_unit: Option<String>,
}

impl From<ListServicesQuery> for ServiceFilters {
    fn from(query: ListServicesQuery) -> Self {
        ServiceFilters {
            category: query.category,
            search_term: query.search,
            price_unit: query
                .price_unit
                .filter(|label| !label.trim().is_empty())
                .map(|label| label.parse::<PriceUnit>().unwrap_or_default()),
        }
    }
}

/// List catalog services, optionally filtered
#[instrument(skip(state))]
pub async fn list_services(
    State(state): State<ApiState>,
    Query(query): Query<ListServicesQuery>,
) -> Result<Json<Vec<Service>>, (StatusCode, Json<Value>)> {
    let filters = ServiceFilters::from(query);

    state
        .catalog
        .list_services(&filters)
        .await
        .map(Json)
        .map_err(|err| {
            error!("Failed to list services: {}", err);
            service_error_to_response(err)
        })
}

/// Map a service error to a status code and `{ error, message }` body
pub fn service_error_to_response(err: ServiceError) -> (StatusCode, Json<Value>) {
    let (status, kind) = match err {
        ServiceError::ServiceNotFound { .. } => (StatusCode::NOT_FOUND, "service_not_found"),
        ServiceError::ValidationError { .. } => (StatusCode::BAD_REQUEST, "validation_error"),
        ServiceError::Catalog { .. } => (StatusCode::BAD_GATEWAY, "catalog_unavailable"),
        ServiceError::Repository { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
    };

    (
        status,
        Json(json!({
            "error": kind,
            "message": err.to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}
