//! Engineering recommendation helper.
//!
//! Turns closed turbine engineering tickets into anonymized summaries with a
//! two-stage LLM pipeline (distill, then censor), and recommends actions for
//! new issues from the most similar past issues in a vector index.

pub mod api;
pub mod config;
pub mod error;
pub mod factory;
pub mod llm;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod recommend;
pub mod render;
pub mod retry;
pub mod search;
pub mod storage;

pub use error::{AppError, Result};
