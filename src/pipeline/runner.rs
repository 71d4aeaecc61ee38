use super::stages::{CensorStage, DistillStage};
use crate::config::PipelineConfig;
use crate::error::{AppError, Result};
use crate::llm::StructuredGenerator;
use crate::metrics::{PIPELINE_BATCH_DURATION_SECONDS, PIPELINE_ITEMS_TOTAL};
use crate::models::{CensorIssue, PipelineRecord, RawIssue};
use crate::prompts::{PromptSpec, Stage};
use crate::render::{render_raw, render_summary};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// What to do with the rest of a batch after one issue fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    ContinueOnError,
    /// Stop scheduling new issues; issues not yet started are reported as skipped
    FailFast,
}

/// Why a single issue in a batch has no censored output
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("issue #{index} failed in {stage} stage: {source}")]
    Stage {
        index: usize,
        stage: Stage,
        source: AppError,
    },

    #[error("issue #{index} timed out after {after:?}")]
    TimedOut { index: usize, after: Duration },

    #[error("issue #{index} skipped after an earlier failure")]
    Skipped { index: usize },
}

impl ItemError {
    /// Position of the issue in the input batch
    pub fn index(&self) -> usize {
        match self {
            ItemError::Stage { index, .. }
            | ItemError::TimedOut { index, .. }
            | ItemError::Skipped { index } => *index,
        }
    }

    fn outcome_label(&self) -> &'static str {
        match self {
            ItemError::Stage { .. } => "failed",
            ItemError::TimedOut { .. } => "timed_out",
            ItemError::Skipped { .. } => "skipped",
        }
    }
}

pub type ItemResult = std::result::Result<CensorIssue, ItemError>;

/// Per-issue results of a batch, `results[i]` belongs to input `i`
#[derive(Debug)]
pub struct BatchOutcome {
    pub results: Vec<ItemResult>,
}

impl BatchOutcome {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemError> {
        self.results.iter().filter_map(|r| r.as_ref().err())
    }

    pub fn is_complete(&self) -> bool {
        self.results.iter().all(|r| r.is_ok())
    }

    /// All censored issues in input order, or an error naming every failed index
    pub fn into_censored(self) -> Result<Vec<CensorIssue>> {
        let total = self.results.len();
        let mut censored = Vec::with_capacity(total);
        let mut failed = Vec::new();

        for result in self.results {
            match result {
                Ok(issue) => censored.push(issue),
                Err(e) => failed.push(e),
            }
        }

        if failed.is_empty() {
            return Ok(censored);
        }

        let indices: Vec<usize> = failed.iter().map(ItemError::index).collect();
        Err(AppError::Pipeline(format!(
            "{} of {} issues failed (indices {:?}); first failure: {}",
            failed.len(),
            total,
            indices,
            failed[0]
        )))
    }
}

/// Runs raw issues through distill then censor with bounded concurrency
pub struct PipelineRunner {
    distill: DistillStage,
    censor: CensorStage,
    max_concurrent: usize,
    item_timeout: Duration,
    policy: FailurePolicy,
}

impl PipelineRunner {
    pub fn new(
        generator: Arc<dyn StructuredGenerator>,
        prompts: &PromptSpec,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            distill: DistillStage::new(generator.clone(), prompts.distiller.clone()),
            censor: CensorStage::new(generator, prompts.censor.clone()),
            max_concurrent: config.max_concurrent.max(1),
            item_timeout: Duration::from_secs(config.item_timeout_secs),
            policy: if config.fail_fast {
                FailurePolicy::FailFast
            } else {
                FailurePolicy::ContinueOnError
            },
        }
    }

    pub fn with_item_timeout(mut self, item_timeout: Duration) -> Self {
        self.item_timeout = item_timeout;
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Run a batch with the configured failure policy
    pub async fn run_batch(&self, issues: &[RawIssue]) -> BatchOutcome {
        self.run_batch_with(issues, self.policy).await
    }

    /// Run a batch; one issue's failure never changes another issue's result
    pub async fn run_batch_with(&self, issues: &[RawIssue], policy: FailurePolicy) -> BatchOutcome {
        let start = Instant::now();
        let abort = AtomicBool::new(false);

        info!(
            issues = issues.len(),
            max_concurrent = self.max_concurrent,
            ?policy,
            "Starting pipeline batch"
        );

        let abort = &abort;
        let item_timeout = self.item_timeout;
        let items: Vec<_> = issues
            .iter()
            .enumerate()
            .map(|(index, issue)| async move {
                if policy == FailurePolicy::FailFast && abort.load(Ordering::SeqCst) {
                    return (index, Err(ItemError::Skipped { index }));
                }

                let result = match timeout(item_timeout, self.process(index, issue)).await {
                    Ok(result) => result,
                    Err(_) => Err(ItemError::TimedOut {
                        index,
                        after: item_timeout,
                    }),
                };

                if result.is_err() && policy == FailurePolicy::FailFast {
                    abort.store(true, Ordering::SeqCst);
                }
                (index, result)
            })
            .collect();

        let completed: Vec<(usize, ItemResult)> = stream::iter(items)
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mut slots: Vec<Option<ItemResult>> = (0..issues.len()).map(|_| None).collect();
        for (index, result) in completed {
            slots[index] = Some(result);
        }

        let results: Vec<ItemResult> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.unwrap_or(Err(ItemError::Skipped { index })))
            .collect();

        for result in &results {
            let label = match result {
                Ok(_) => "succeeded",
                Err(e) => e.outcome_label(),
            };
            PIPELINE_ITEMS_TOTAL.with_label_values(&[label]).inc();
        }

        let outcome = BatchOutcome { results };
        let status = if outcome.is_complete() { "complete" } else { "partial" };
        PIPELINE_BATCH_DURATION_SECONDS
            .with_label_values(&[status])
            .observe(start.elapsed().as_secs_f64());

        info!(
            succeeded = outcome.succeeded(),
            failed = outcome.len() - outcome.succeeded(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Pipeline batch finished"
        );

        outcome
    }

    async fn process(&self, index: usize, issue: &RawIssue) -> ItemResult {
        let distilled = self.distill.run(issue).await.map_err(|source| {
            warn!(index, issue_id = issue.id, error = %source, "Distill stage failed");
            ItemError::Stage {
                index,
                stage: Stage::Distiller,
                source,
            }
        })?;

        self.censor.run(&distilled).await.map_err(|source| {
            warn!(index, issue_id = issue.id, error = %source, "Censor stage failed");
            ItemError::Stage {
                index,
                stage: Stage::Censor,
                source,
            }
        })
    }

    /// Summarize a batch into table rows; fails unless every issue succeeds
    pub async fn summarize(&self, issues: &[RawIssue]) -> Result<Vec<PipelineRecord>> {
        let censored = self.run_batch(issues).await.into_censored().map_err(|e| {
            error!(error = %e, "Pipeline batch incomplete");
            e
        })?;
        build_records(issues, &censored)
    }
}

/// Join source metadata, original markdown, and censored summary per issue
pub fn build_records(issues: &[RawIssue], censored: &[CensorIssue]) -> Result<Vec<PipelineRecord>> {
    if issues.len() != censored.len() {
        return Err(AppError::Pipeline(format!(
            "{} raw issues but {} censored issues",
            issues.len(),
            censored.len()
        )));
    }

    Ok(issues
        .iter()
        .zip(censored)
        .map(|(issue, censored)| PipelineRecord {
            id: issue.id,
            market: issue.market.clone(),
            site: issue.site.clone(),
            turbine: issue.turbine.clone(),
            original: render_raw(issue),
            summary: render_summary(censored),
        })
        .collect())
}
