use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to register metric: {0}")]
    Registration(#[from] prometheus::Error),
    #[error("Failed to encode metrics: {0}")]
    Encoding(String),
}

/// Prometheus metrics for the cart service
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    // HTTP metrics
    pub http_requests_total: CounterVec,
    pub http_request_duration_seconds: HistogramVec,

    // Cart metrics
    pub cart_operations_total: CounterVec,
    pub cart_persistence_failures_total: CounterVec,
    pub cart_lines: Gauge,
    pub cart_items: Gauge,

    // Catalog metrics
    pub catalog_requests_total: CounterVec,
}

impl Metrics {
    /// Create a new metrics instance with all required metrics registered
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        info!("Initializing Prometheus metrics");

        let http_requests_total = CounterVec::new(
            Opts::new(
                "http_requests_total",
                "Total number of HTTP requests processed",
            ),
            &["method", "endpoint", "status_code"],
        )?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["method", "endpoint"],
        )?;

        let cart_operations_total = CounterVec::new(
            Opts::new("cart_operations_total", "Total number of cart operations"),
            &["operation", "status"],
        )?;

        let cart_persistence_failures_total = CounterVec::new(
            Opts::new(
                "cart_persistence_failures_total",
                "Cart reads or writes that failed against the storage backend",
            ),
            &["operation"],
        )?;

        let cart_lines = Gauge::new("cart_lines", "Number of distinct lines in the cart")?;

        let cart_items = Gauge::new("cart_items", "Sum of quantities across cart lines")?;

        let catalog_requests_total = CounterVec::new(
            Opts::new(
                "catalog_requests_total",
                "Total number of service catalog fetches",
            ),
            &["status"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(cart_operations_total.clone()))?;
        registry.register(Box::new(cart_persistence_failures_total.clone()))?;
        registry.register(Box::new(cart_lines.clone()))?;
        registry.register(Box::new(cart_items.clone()))?;
        registry.register(Box::new(catalog_requests_total.clone()))?;

        info!("Prometheus metrics initialized successfully");

        Ok(Metrics {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            cart_operations_total,
            cart_persistence_failures_total,
            cart_lines,
            cart_items,
            catalog_requests_total,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode all metrics in Prometheus text format
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricsError::Encoding(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }

    pub fn record_http_request(
        &self,
        method: &str,
        endpoint: &str,
        status_code: u16,
        duration_seconds: f64,
    ) {
        let status_str = status_code.to_string();

        self.http_requests_total
            .with_label_values(&[method, endpoint, &status_str])
            .inc();

        self.http_request_duration_seconds
            .with_label_values(&[method, endpoint])
            .observe(duration_seconds);
    }

    /// `changed` is false for operations that turned out to be no-ops
    pub fn record_cart_operation(&self, operation: &str, changed: bool) {
        let status = if changed { "applied" } else { "noop" };
        self.cart_operations_total
            .with_label_values(&[operation, status])
            .inc();
    }

    pub fn record_persistence_failure(&self, operation: &str) {
        self.cart_persistence_failures_total
            .with_label_values(&[operation])
            .inc();
    }

    pub fn set_cart_size(&self, lines: usize, items: u64) {
        self.cart_lines.set(lines as f64);
        self.cart_items.set(items as f64);
    }

    pub fn record_catalog_request(&self, success: bool) {
        let status = if success { "success" } else { "error" };
        self.catalog_requests_total
            .with_label_values(&[status])
            .inc();
    }
}
