#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use laundry_cart::{
    create_app,
    repositories::{InMemoryStore, KeyValueCartRepository, DEFAULT_CART_KEY},
    services::{HttpCatalogProvider, SERVICES_PATH},
    ApiState, CartManager, CatalogService, Metrics,
};

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub metrics: Arc<Metrics>,
    // Held so the mock catalog outlives the router
    pub catalog_server: MockServer,
}

impl TestApp {
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    pub fn stored_cart(&self) -> Option<Value> {
        use laundry_cart::repositories::KeyValueStore;

        self.store
            .get(DEFAULT_CART_KEY)
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }
}

pub fn catalog_body() -> Value {
    json!({
        "success": true,
        "services": [
            {
                "_id": "wash-fold",
                "name": "Wash & Fold",
                "price": 1.75,
                "priceType": "per lb",
                "category": "Washing",
                "description": "Washed, dried and folded"
            },
            {
                "_id": "dry-clean",
                "name": "Dry Cleaning",
                "price": "10",
                "category": "Dry Cleaning",
                "description": "Suits, dresses and delicates"
            },
            {
                "id": "stain",
                "name": "Stain Treatment",
                "price": 5,
                "priceType": "per stain",
                "category": "Specialty"
            }
        ]
    })
}

/// App backed by an in-memory store and a mock catalog answering `response`
pub async fn spawn_app_with_catalog(response: ResponseTemplate) -> TestApp {
    let catalog_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SERVICES_PATH))
        .respond_with(response)
        .mount(&catalog_server)
        .await;

    let store = Arc::new(InMemoryStore::new());
    let repository = Arc::new(KeyValueCartRepository::with_default_key(store.clone()));
    let metrics = Arc::new(Metrics::new().unwrap());

    let cart = CartManager::load_with_metrics(repository, Some(metrics.clone()));
    let provider = HttpCatalogProvider::new(catalog_server.uri(), Duration::from_secs(2)).unwrap();
    let catalog = CatalogService::new_with_metrics(Arc::new(provider), metrics.clone());

    let router = create_app(
        ApiState::new(cart, catalog),
        metrics.clone(),
        Duration::from_secs(10),
    );

    TestApp {
        router,
        store,
        metrics,
        catalog_server,
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_catalog(ResponseTemplate::new(200).set_body_json(catalog_body())).await
}
