use super::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};
use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

/// Record count and latency for every HTTP request
///
/// Uses the matched route template as the path label so ids in the URL do
/// not blow up label cardinality. The metrics endpoint itself is skipped.
pub async fn track_http_metrics(req: Request, next: Next) -> Response {
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    if path == "/metrics" {
        return next.run(req).await;
    }

    let method = req.method().to_string();
    let start = Instant::now();
    let response = next.run(req).await;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, response.status().as_str()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &path])
        .observe(start.elapsed().as_secs_f64());

    response
}
