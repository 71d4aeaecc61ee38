use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Language model endpoint configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Vector search endpoint configuration
    #[serde(default)]
    pub vector_search: VectorSearchConfig,

    /// Distill/censor pipeline configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Summary table configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Prompt specification overrides
    #[serde(default)]
    pub prompts: PromptsConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> std::result::Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: ENG_REC_)
            .add_source(
                config::Environment::with_prefix("ENG_REC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Reject settings that would only fail later, at request time
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.max_concurrent == 0 {
            return Err(AppError::Configuration(
                "pipeline.max_concurrent must be greater than 0".to_string(),
            ));
        }
        for (name, secs) in [
            ("pipeline.item_timeout_secs", self.pipeline.item_timeout_secs),
            ("llm.timeout_secs", self.llm.timeout_secs),
            ("vector_search.timeout_secs", self.vector_search.timeout_secs),
        ] {
            if secs == 0 {
                return Err(AppError::Configuration(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }
        if self.vector_search.num_results == 0 {
            return Err(AppError::Configuration(
                "vector_search.num_results must be greater than 0".to_string(),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(AppError::Configuration("llm.model must be set".to_string()));
        }
        for (name, url) in [
            ("llm.base_url", &self.llm.base_url),
            ("vector_search.base_url", &self.vector_search.base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(AppError::Configuration(format!(
                    "{} must be an http(s) URL, got '{}'",
                    name, url
                )));
            }
        }
        if self.storage.backend == StorageBackend::File && self.storage.path.is_none() {
            return Err(AppError::Configuration(
                "storage.path is required for the file backend".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible serving endpoint
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model used for the distill and censor stages
    #[serde(default = "default_instruct_model")]
    pub model: String,

    /// Model used for recommendations (falls back to `model`)
    pub recommendation_model: Option<String>,

    /// Environment variable holding the API key
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Max retry attempts after the first call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial retry backoff (milliseconds), doubled per attempt
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl LlmConfig {
    pub fn recommendation_model(&self) -> &str {
        self.recommendation_model.as_deref().unwrap_or(&self.model)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_instruct_model(),
            recommendation_model: None,
            api_key_env: default_llm_api_key_env(),
            timeout_secs: default_llm_timeout(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorSearchConfig {
    /// Workspace URL hosting the vector search endpoint
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Fully qualified index name
    #[serde(default = "default_index_name")]
    pub index_name: String,

    /// Environment variable holding the access token
    #[serde(default = "default_search_token_env")]
    pub token_env: String,

    /// Number of similar issues to retrieve
    #[serde(default = "default_num_results")]
    pub num_results: usize,

    /// Per-request timeout (seconds)
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,

    /// Max retry attempts after the first call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial retry backoff (milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Serve built-in sample results instead of calling the index
    #[serde(default)]
    pub mock: bool,
}

impl Default for VectorSearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            index_name: default_index_name(),
            token_env: default_search_token_env(),
            num_results: default_num_results(),
            timeout_secs: default_search_timeout(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            mock: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum issues processed at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Timeout for one issue through both stages (seconds)
    #[serde(default = "default_item_timeout")]
    pub item_timeout_secs: u64,

    /// Stop scheduling new issues after the first failure
    #[serde(default)]
    pub fail_fast: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            item_timeout_secs: default_item_timeout(),
            fail_fast: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Summary table backend
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path of the JSON table file (file backend)
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    InMemory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PromptsConfig {
    /// YAML file overriding the built-in prompt specs
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Service name
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            service_name: default_service_name(),
            prometheus_enabled: true,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    120
}

fn default_llm_base_url() -> String {
    "http://localhost:8000/serving-endpoints".to_string()
}

fn default_instruct_model() -> String {
    "databricks-meta-llama-3-1-70b-instruct".to_string()
}

fn default_llm_api_key_env() -> String {
    "ENG_REC_LLM_API_KEY".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_search_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_index_name() -> String {
    "workspace.default.eng_rec_index".to_string()
}

fn default_search_token_env() -> String {
    "ENG_REC_SEARCH_TOKEN".to_string()
}

fn default_num_results() -> usize {
    5
}

fn default_search_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_max_concurrent() -> usize {
    4
}

fn default_item_timeout() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "eng-rec-helper".to_string()
}

fn default_true() -> bool {
    true
}
