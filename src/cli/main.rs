use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use eng_rec_helper::{
    config::Config,
    factory::{build_llm_client, build_pipeline_runner},
    pipeline::{build_records, FailurePolicy},
    storage::{load_raw_issues, FileSummaryStore, SummaryStore},
};
use reqwest::Client;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "eng-rec-cli")]
#[command(about = "Engineering recommendation helper CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080", env = "ENG_REC_ENDPOINT")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Distill and censor a raw issue export into a summary table file
    Summarize {
        /// JSON array of raw issues
        #[arg(short, long)]
        input: PathBuf,

        /// Summary table to (over)write
        #[arg(short, long, default_value = "summaries.json")]
        output: PathBuf,

        /// Stop scheduling issues after the first failure
        #[arg(long)]
        fail_fast: bool,
    },

    /// Find past issues similar to a description
    Search {
        #[arg(short, long)]
        query: String,

        #[arg(short, long)]
        num_results: Option<usize>,
    },

    /// Recommend actions for a new issue
    Recommend {
        #[arg(short, long)]
        query: String,
    },

    /// Check server health
    Health,
}

async fn summarize(input: PathBuf, output: PathBuf, fail_fast: bool) -> Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    config.validate()?;

    let issues = load_raw_issues(&input)?;
    println!("Loaded {} issues from {}", issues.len(), input.display());

    let client = build_llm_client(&config.llm)?;
    let runner = build_pipeline_runner(&config, client)?;
    let policy = if fail_fast || config.pipeline.fail_fast {
        FailurePolicy::FailFast
    } else {
        FailurePolicy::ContinueOnError
    };

    let outcome = runner.run_batch_with(&issues, policy).await;
    for failure in outcome.failures() {
        eprintln!("  ✗ {}", failure);
    }
    println!(
        "{} of {} issues summarized",
        outcome.succeeded(),
        outcome.len()
    );
    if !outcome.is_complete() {
        bail!("summary table not written: some issues failed");
    }

    let censored = outcome.into_censored()?;
    let records = build_records(&issues, &censored)?;
    let store = FileSummaryStore::new(output)?;
    store.overwrite(&records).await?;
    println!("Wrote {} rows to {}", records.len(), store.path().display());
    Ok(())
}

async fn print_response(response: reqwest::Response) -> Result<()> {
    let status = response.status();
    let body: serde_json::Value = response
        .json()
        .await
        .context("server returned a non-JSON body")?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    if !status.is_success() {
        bail!("request failed with status {}", status);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::builder()
        .timeout(Duration::from_secs(180))
        .build()
        .context("failed to build HTTP client")?;

    match cli.command {
        Commands::Summarize {
            input,
            output,
            fail_fast,
        } => summarize(input, output, fail_fast).await?,

        Commands::Search { query, num_results } => {
            let response = client
                .post(format!("{}/v1/search", cli.endpoint))
                .json(&json!({
                    "query": query,
                    "num_results": num_results,
                }))
                .send()
                .await?;
            print_response(response).await?;
        }

        Commands::Recommend { query } => {
            let response = client
                .post(format!("{}/v1/recommendations", cli.endpoint))
                .json(&json!({ "query": query }))
                .send()
                .await?;
            print_response(response).await?;
        }

        Commands::Health => {
            let response = client
                .get(format!("{}/health", cli.endpoint))
                .send()
                .await?;
            print_response(response).await?;
        }
    }

    Ok(())
}
