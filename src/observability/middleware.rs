use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::{sync::Arc, time::Instant};
use tracing::{info, warn, Instrument};

use super::Metrics;

/// Wraps each request in a server span and records request metrics
pub async fn observability_middleware(
    metrics: Arc<Metrics>,
    request: Request,
    next: Next,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();

    // Route template when routing already happened, raw path otherwise
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched_path| matched_path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let user_agent = request
        .headers()
        .get("user-agent")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let span_name = format!("{} {}", method, endpoint);
    let span = tracing::info_span!(
        target: "laundry_cart::http",
        "{}", span_name,
        otel.name = %span_name,
        otel.kind = "server",
        http.method = %method,
        http.route = %endpoint,
        http.user_agent = %user_agent,
        http.status_code = tracing::field::Empty,
        http.response_time_ms = tracing::field::Empty,
    );

    async move {
        let response = next.run(request).await;

        let duration = start_time.elapsed();
        let status_code = response.status().as_u16();

        let current = tracing::Span::current();
        current.record("http.status_code", status_code);
        current.record("http.response_time_ms", duration.as_millis() as u64);

        metrics.record_http_request(&method, &endpoint, status_code, duration.as_secs_f64());

        if status_code >= 500 {
            warn!(
                method = %method,
                path = %endpoint,
                status_code,
                duration_ms = duration.as_millis() as u64,
                "Request failed"
            );
        } else {
            info!(
                method = %method,
                path = %endpoint,
                status_code,
                duration_ms = duration.as_millis() as u64,
                "Request completed"
            );
        }

        response
    }
    .instrument(span)
    .await
}
