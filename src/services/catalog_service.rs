use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::models::{
    CatalogError, CatalogResponse, CatalogResult, RawService, Service, ServiceError,
    ServiceFilters, ServiceResult,
};
use crate::observability::Metrics;

/// Path of the catalog listing on the backend (spelling is the backend's)
pub const SERVICES_PATH: &str = "/service/avaliable";

/// Source of purchasable services
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn fetch_services(&self) -> CatalogResult<Vec<Service>>;
}

/// Catalog provider backed by the laundry backend's HTTP API
pub struct HttpCatalogProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalogProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> CatalogResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn services_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), SERVICES_PATH)
    }
}

#[async_trait]
impl CatalogProvider for HttpCatalogProvider {
    #[instrument(skip(self), fields(url = %self.services_url()))]
    async fn fetch_services(&self) -> CatalogResult<Vec<Service>> {
        let response = self.client.get(self.services_url()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
            });
        }

        let body: CatalogResponse = response.json().await?;
        if !body.success {
            return Err(CatalogError::Unsuccessful);
        }

        let services = normalize_services(body.services);
        debug!(count = services.len(), "Catalog fetched");
        Ok(services)
    }
}

/// Normalize raw catalog records, skipping the ones that can't be identified
pub fn normalize_services(records: Vec<Value>) -> Vec<Service> {
    records
        .into_iter()
        .filter_map(|record| {
            let raw: RawService = match serde_json::from_value(record) {
                Ok(raw) => raw,
                Err(e) => {
                    crate::warn_with_trace!(error = %e, "Skipping malformed catalog record");
                    return None;
                }
            };
            match Service::try_from(raw) {
                Ok(service) => Some(service),
                Err(e) => {
                    crate::warn_with_trace!(error = %e, "Skipping catalog record");
                    None
                }
            }
        })
        .collect()
}

/// Catalog lookups used by the HTTP layer
pub struct CatalogService {
    provider: Arc<dyn CatalogProvider>,
    metrics: Option<Arc<Metrics>>,
}

impl CatalogService {
    pub fn new(provider: Arc<dyn CatalogProvider>) -> Self {
        Self {
            provider,
            metrics: None,
        }
    }

    pub fn new_with_metrics(provider: Arc<dyn CatalogProvider>, metrics: Arc<Metrics>) -> Self {
        Self {
            provider,
            metrics: Some(metrics),
        }
    }

    /// List services matching `filters`, in catalog order
    #[instrument(skip(self), fields(filters = ?filters))]
    pub async fn list_services(&self, filters: &ServiceFilters) -> ServiceResult<Vec<Service>> {
        let services = self.fetch().await?;

        let matching: Vec<Service> = services
            .into_iter()
            .filter(|service| service.matches_filters(filters))
            .collect();

        crate::info_with_trace!(count = matching.len(), "Listed catalog services");
        Ok(matching)
    }

    #[instrument(skip(self))]
    pub async fn find_service(&self, service_id: &str) -> ServiceResult<Service> {
        self.fetch()
            .await?
            .into_iter()
            .find(|service| service.id == service_id)
            .ok_or_else(|| ServiceError::ServiceNotFound {
                id: service_id.to_string(),
            })
    }

    async fn fetch(&self) -> ServiceResult<Vec<Service>> {
        let result = self.provider.fetch_services().await;

        if let Some(ref metrics) = self.metrics {
            metrics.record_catalog_request(result.is_ok());
        }
        if let Err(ref e) = result {
            crate::error_with_trace!(error = %e, "Catalog fetch failed");
        }

        Ok(result?)
    }
}
