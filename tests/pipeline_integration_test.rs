//! Distill and censor pipeline against a mocked chat-completion endpoint

mod common;

use common::*;
use eng_rec_helper::config::Config;
use eng_rec_helper::error::AppError;
use eng_rec_helper::factory::{build_llm_client, build_pipeline_runner};
use eng_rec_helper::pipeline::{FailurePolicy, ItemError, PipelineRunner};
use eng_rec_helper::prompts::Stage;
use eng_rec_helper::storage::{FileSummaryStore, SummaryStore};
use mockito::Matcher;
use tempfile::TempDir;

fn config_for(server_url: &str) -> Config {
    let mut config = Config::default();
    config.llm.base_url = server_url.to_string();
    config.llm.model = "instruct-test".to_string();
    config.llm.max_retries = 1;
    config.llm.retry_backoff_ms = 1;
    config.pipeline.max_concurrent = 2;
    config
}

fn runner_for(config: &Config) -> PipelineRunner {
    let client = build_llm_client(&config.llm).unwrap();
    build_pipeline_runner(config, client).unwrap()
}

#[tokio::test]
async fn test_summarize_over_http_and_persist() {
    let mut server = mockito::Server::new_async().await;
    let distill = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("Distill the following issue".to_string()),
            Matcher::Regex("json_schema".to_string()),
        ]))
        .with_status(200)
        .with_body(chat_completion_body(&fields_json(
            "The pitch motor at Windwhisper Park overheated.",
            "John Smith recommended checking the fan.",
            "Fan replaced.",
        )))
        .expect(3)
        .create_async()
        .await;
    let censor = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex("Censor the following issue".to_string()))
        .with_status(200)
        .with_body(chat_completion_body(&format!(
            "```json\n{}\n```",
            fields_json(
                "The pitch motor at SITE overheated.",
                "Individual recommended checking the fan.",
                "Fan replaced.",
            )
        )))
        .expect(3)
        .create_async()
        .await;

    let config = config_for(&server.url());
    let issues = sample_raw_issues();
    let records = runner_for(&config).summarize(&issues).await.unwrap();

    distill.assert_async().await;
    censor.assert_async().await;

    assert_eq!(records.len(), 3);
    for (record, issue) in records.iter().zip(&issues) {
        assert_eq!(record.id, issue.id);
        assert_eq!(record.turbine, issue.turbine);
        assert!(record.original.starts_with(&format!("# {}\n\n## Description\n", issue.title)));
        assert_eq!(
            record.summary,
            "### Symptoms:\nThe pitch motor at SITE overheated.\n\n\
             ### Recommendation:\nIndividual recommended checking the fan.\n\n\
             ### Resolution:\nFan replaced."
        );
    }

    let dir = TempDir::new().unwrap();
    let store = FileSummaryStore::new(dir.path().join("summaries.json")).unwrap();
    store.overwrite(&records).await.unwrap();
    assert_eq!(store.list().await.unwrap(), records);
}

#[tokio::test]
async fn test_malformed_censor_reply_fails_only_that_stage() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex("Distill the following issue".to_string()))
        .with_status(200)
        .with_body(chat_completion_body(&fields_json("s", "r", "")))
        .create_async()
        .await;
    server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex("Censor the following issue".to_string()))
        .with_status(200)
        .with_body(chat_completion_body(r#"{"symptoms": "only one field"}"#))
        .create_async()
        .await;

    let config = config_for(&server.url());
    let issues = vec![raw_issue(5.0, "Blade icing")];
    let outcome = runner_for(&config).run_batch(&issues).await;

    match &outcome.results[0] {
        Err(ItemError::Stage { index, stage, source }) => {
            assert_eq!(*index, 0);
            assert_eq!(*stage, Stage::Censor);
            assert!(matches!(source, AppError::Generation(_)));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_server_errors_are_retried_then_reported() {
    let mut server = mockito::Server::new_async().await;
    let failing = server
        .mock("POST", "/chat/completions")
        .with_status(503)
        .with_body("overloaded")
        .expect(4)
        .create_async()
        .await;

    let config = config_for(&server.url());
    let issues = vec![raw_issue(1.0, "Converter trip"), raw_issue(2.0, "Anemometer fault")];
    let outcome = runner_for(&config)
        .run_batch_with(&issues, FailurePolicy::ContinueOnError)
        .await;

    // one retry per call, one distill call per issue
    failing.assert_async().await;
    assert_eq!(outcome.succeeded(), 0);
    assert_eq!(outcome.failures().count(), 2);
    let err = outcome.into_censored().unwrap_err();
    assert!(matches!(err, AppError::Pipeline(_)));
}
