//! Distill and censor pipeline over closed engineering issues.

mod runner;
mod stages;

pub use runner::{build_records, BatchOutcome, FailurePolicy, ItemError, ItemResult, PipelineRunner};
pub use stages::{build_prompt, CensorStage, DistillStage};
