use crate::api::{handlers, AppState};
use crate::metrics::track_http_metrics;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/health/live", get(handlers::health_check))
        .route("/health/ready", get(handlers::readiness_check))
        // Retrieval and recommendation
        .route("/v1/search", post(handlers::search_similar))
        .route("/v1/recommendations", post(handlers::recommend))
        // Summarization pipeline
        .route("/v1/pipeline/runs", post(handlers::run_pipeline))
        .route("/v1/summaries", get(handlers::list_summaries))
        // Prometheus
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(track_http_metrics))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(false))
                .on_response(DefaultOnResponse::new()),
        )
        .layer(CorsLayer::permissive())
}
