pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::factory::Components;
use crate::pipeline::PipelineRunner;
use crate::recommend::RetrievalRecommendationFlow;
use crate::storage::SummaryStore;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub flow: Arc<RetrievalRecommendationFlow>,
    pub runner: Arc<PipelineRunner>,
    pub store: Arc<dyn SummaryStore>,
    pub started_at: Instant,
    /// Upper bound for search and recommendation requests
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        flow: Arc<RetrievalRecommendationFlow>,
        runner: Arc<PipelineRunner>,
        store: Arc<dyn SummaryStore>,
    ) -> Self {
        Self {
            flow,
            runner,
            store,
            started_at: Instant::now(),
            request_timeout: Duration::from_secs(120),
        }
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

impl From<Components> for AppState {
    fn from(components: Components) -> Self {
        Self::new(components.flow, components.runner, components.store)
    }
}
