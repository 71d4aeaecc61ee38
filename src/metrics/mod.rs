/// Prometheus metrics for the summarization pipeline and the recommendation service.
///
/// Covers HTTP traffic, model calls, similarity search calls, and per-issue
/// pipeline outcomes. Everything is registered on [`PROMETHEUS_REGISTRY`] and
/// exported by [`gather_metrics`].
///
/// # Example
/// ```no_run
/// use eng_rec_helper::metrics::SEARCH_REQUESTS_TOTAL;
///
/// SEARCH_REQUESTS_TOTAL.with_label_values(&["success"]).inc();
/// ```

mod middleware;

pub use middleware::track_http_metrics;

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry};

const NAMESPACE: &str = "eng_rec_helper";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Total number of HTTP requests received
    ///
    /// Labels: method, path, status_code
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests")
            .namespace(NAMESPACE),
        &["method", "path", "status_code"]
    ).expect("Failed to create HTTP_REQUESTS_TOTAL metric");

    /// HTTP request duration in seconds
    ///
    /// Labels: method, path
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["method", "path"]
    ).expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric");

    /// Total number of chat completion calls
    ///
    /// Labels: model, status (success, rate_limited, error, timeout)
    pub static ref LLM_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("llm_requests_total", "Total number of LLM API requests")
            .namespace(NAMESPACE),
        &["model", "status"]
    ).expect("Failed to create LLM_REQUESTS_TOTAL metric");

    /// Chat completion latency in seconds
    ///
    /// Labels: model
    pub static ref LLM_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "llm_request_duration_seconds",
            "LLM API request duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["model"]
    ).expect("Failed to create LLM_REQUEST_DURATION_SECONDS metric");

    /// Model calls per stage (distiller, censor, recommendation)
    ///
    /// Labels: stage, status (success, error)
    pub static ref LLM_STAGE_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("llm_stage_requests_total", "Total number of LLM calls per stage")
            .namespace(NAMESPACE),
        &["stage", "status"]
    ).expect("Failed to create LLM_STAGE_REQUESTS_TOTAL metric");

    /// Stage latency including retries and reply parsing
    ///
    /// Labels: stage
    pub static ref LLM_STAGE_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "llm_stage_duration_seconds",
            "LLM call duration per stage in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["stage"]
    ).expect("Failed to create LLM_STAGE_DURATION_SECONDS metric");

    /// Total number of similarity search calls
    ///
    /// Labels: status (success, error)
    pub static ref SEARCH_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("search_requests_total", "Total number of vector search requests")
            .namespace(NAMESPACE),
        &["status"]
    ).expect("Failed to create SEARCH_REQUESTS_TOTAL metric");

    /// Search responses whose columns do not match the summary table
    pub static ref SEARCH_SCHEMA_MISMATCHES_TOTAL: Counter = Counter::with_opts(
        Opts::new("search_schema_mismatches_total", "Vector search responses with an unexpected manifest")
            .namespace(NAMESPACE)
    ).expect("Failed to create SEARCH_SCHEMA_MISMATCHES_TOTAL metric");

    /// Similarity search latency in seconds
    pub static ref SEARCH_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "search_request_duration_seconds",
            "Vector search request duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["backend"]
    ).expect("Failed to create SEARCH_REQUEST_DURATION_SECONDS metric");

    /// Issues that went through the pipeline
    ///
    /// Labels: outcome (succeeded, failed, timed_out, skipped)
    pub static ref PIPELINE_ITEMS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("pipeline_items_total", "Total number of issues processed by the pipeline")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create PIPELINE_ITEMS_TOTAL metric");

    /// Batch duration in seconds
    pub static ref PIPELINE_BATCH_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "pipeline_batch_duration_seconds",
            "Duration of a full distill and censor batch in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![1.0, 5.0, 15.0, 60.0, 300.0, 900.0, 3600.0]),
        &["status"]
    ).expect("Failed to create PIPELINE_BATCH_DURATION_SECONDS metric");

    /// Recommendations served
    ///
    /// Labels: outcome (generated, no_similar_issues, error)
    pub static ref RECOMMENDATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("recommendations_total", "Total number of recommendation requests")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create RECOMMENDATIONS_TOTAL metric");

    /// Rows currently in the summary table
    pub static ref SUMMARY_ROWS: Gauge = Gauge::with_opts(
        Opts::new("summary_rows", "Rows in the persisted summary table")
            .namespace(NAMESPACE)
    ).expect("Failed to create SUMMARY_ROWS metric");

    /// Build information
    pub static ref BUILD_INFO: GaugeVec = GaugeVec::new(
        Opts::new("build_info", "Build information")
            .namespace(NAMESPACE),
        &["version"]
    ).expect("Failed to create BUILD_INFO metric");
}

/// Register all metrics with the global registry
///
/// Must be called once at startup; a second call returns an
/// `AlreadyReg` error.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    PROMETHEUS_REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))?;

    PROMETHEUS_REGISTRY.register(Box::new(LLM_REQUESTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(LLM_REQUEST_DURATION_SECONDS.clone()))?;

    PROMETHEUS_REGISTRY.register(Box::new(LLM_STAGE_REQUESTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(LLM_STAGE_DURATION_SECONDS.clone()))?;

    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_REQUESTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_SCHEMA_MISMATCHES_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_REQUEST_DURATION_SECONDS.clone()))?;

    PROMETHEUS_REGISTRY.register(Box::new(PIPELINE_ITEMS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(PIPELINE_BATCH_DURATION_SECONDS.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(RECOMMENDATIONS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(SUMMARY_ROWS.clone()))?;

    PROMETHEUS_REGISTRY.register(Box::new(BUILD_INFO.clone()))?;
    BUILD_INFO
        .with_label_values(&[env!("CARGO_PKG_VERSION")])
        .set(1.0);

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Record one model call made on behalf of `stage`
pub fn observe_llm_stage(stage: &str, elapsed: std::time::Duration, succeeded: bool) {
    let status = if succeeded { "success" } else { "error" };
    LLM_STAGE_REQUESTS_TOTAL
        .with_label_values(&[stage, status])
        .inc();
    LLM_STAGE_DURATION_SECONDS
        .with_label_values(&[stage])
        .observe(elapsed.as_secs_f64());
}

/// Generate Prometheus text format metrics for the /metrics endpoint
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}
