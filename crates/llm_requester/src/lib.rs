//! Completion client for the translation pipeline.
//!
//! An [`LlmPool`] holds one client per credential and is built explicitly from
//! [`LlmConfig`]; nothing here is a process-wide singleton.

pub mod error;
pub mod llm_pool;
pub mod llm_provider_trait;
pub mod openai_provider;
pub mod pkg_config;
pub mod response_extractor;
pub mod retry;
pub mod utils;

pub use error::{LlmError, Retryable};
pub use llm_pool::{CompletionJob, JobResult, LlmPool};
pub use llm_provider_trait::ChatCompletion;
pub use openai_provider::OpenAIProvider;
pub use pkg_config::{LlmConfig, RetryConfig, SUPPORTED_MODELS};
pub use response_extractor::CodeExtractor;
pub use retry::RetryPolicy;
