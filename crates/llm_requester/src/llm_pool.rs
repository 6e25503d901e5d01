use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::LlmError;
use crate::llm_provider_trait::ChatCompletion;
use crate::openai_provider::OpenAIProvider;
use crate::pkg_config::LlmConfig;
use crate::response_extractor::CodeExtractor;
use crate::retry::RetryPolicy;
use crate::utils::estimate_token_count;

/// One unit of batch work: a prompt plus whatever the caller needs back.
pub struct CompletionJob<T> {
    pub prompt: String,
    pub payload: T,
}

pub struct JobResult<T> {
    pub payload: T,
    pub prompt: String,
    /// Index of the credential that served the job.
    pub client_index: usize,
    pub response: Result<String, LlmError>,
}

/// Completion clients, one per configured credential, sharing a model policy.
///
/// Requests dispatched to different clients run as independent tasks that share
/// no mutable state.
pub struct LlmPool {
    providers: Vec<Arc<dyn ChatCompletion>>,
    default_model: String,
    supported_models: Vec<String>,
    temperature: f32,
    retry: RetryPolicy,
}

impl LlmPool {
    /// Build one [`OpenAIProvider`] per usable key in `cfg`.
    pub fn from_config(cfg: &LlmConfig) -> Result<Self, LlmError> {
        let keys = cfg.usable_api_keys();
        if keys.is_empty() {
            return Err(LlmError::Configuration(
                "no API keys configured in [llm].api_keys".to_string(),
            ));
        }

        let timeout = Duration::from_secs(cfg.request_timeout_secs.max(1));
        let mut providers: Vec<Arc<dyn ChatCompletion>> = Vec::with_capacity(keys.len());
        for key in &keys {
            providers.push(Arc::new(OpenAIProvider::new(&cfg.base_url, key, timeout)?));
        }

        Ok(Self::new(
            providers,
            cfg.model.clone(),
            cfg.supported_models.clone(),
            RetryPolicy::from(&cfg.retry),
        )?
        .with_temperature(cfg.temperature))
    }

    pub fn new(
        providers: Vec<Arc<dyn ChatCompletion>>,
        model: Option<String>,
        supported_models: Vec<String>,
        retry: RetryPolicy,
    ) -> Result<Self, LlmError> {
        if providers.is_empty() {
            return Err(LlmError::Configuration(
                "at least one completion client is required".to_string(),
            ));
        }

        let default_model = match model {
            Some(model) => model,
            None => supported_models.first().cloned().ok_or_else(|| {
                LlmError::Configuration(
                    "supported model list is empty, a model must be named explicitly".to_string(),
                )
            })?,
        };

        if !supported_models.contains(&default_model) {
            return Err(LlmError::UnsupportedModel {
                model: default_model,
                supported: supported_models,
            });
        }

        info!(
            "LLM pool ready: {} client(s), default model {}",
            providers.len(),
            default_model
        );

        Ok(Self {
            providers,
            default_model,
            supported_models,
            temperature: 0.0,
            retry,
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn client_count(&self) -> usize {
        self.providers.len()
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn supported_models(&self) -> &[String] {
        &self.supported_models
    }

    /// The requested model, or the pool default. Unknown models are rejected.
    pub fn resolve_model(&self, requested: Option<&str>) -> Result<String, LlmError> {
        let model = requested.unwrap_or(&self.default_model);
        if self.supported_models.iter().any(|m| m == model) {
            Ok(model.to_string())
        } else {
            Err(LlmError::UnsupportedModel {
                model: model.to_string(),
                supported: self.supported_models.clone(),
            })
        }
    }

    /// Single retried completion on the first client.
    pub async fn generate(&self, prompt: &str, model: Option<&str>) -> Result<String, LlmError> {
        let model = self.resolve_model(model)?;
        estimate_token_count(prompt);

        let provider = &self.providers[0];
        let label = format!("{}#0", provider.provider_name());
        self.retry
            .run(&label, || provider.complete(prompt, &model, self.temperature))
            .await
    }

    fn spawn_completion(
        &self,
        set: &mut JoinSet<(usize, Result<String, LlmError>)>,
        index: usize,
        prompt: Arc<str>,
        model: Arc<str>,
    ) {
        let provider = self.providers[index].clone();
        let retry = self.retry.clone();
        let temperature = self.temperature;

        set.spawn(async move {
            let label = format!("{}#{}", provider.provider_name(), index);
            let result = retry
                .run(&label, || provider.complete(&prompt, &model, temperature))
                .await;
            (index, result)
        });
    }

    fn fan_out(&self, prompt: &str, model: &str) -> JoinSet<(usize, Result<String, LlmError>)> {
        let prompt: Arc<str> = Arc::from(prompt);
        let model: Arc<str> = Arc::from(model);
        let mut set = JoinSet::new();
        for index in 0..self.providers.len() {
            self.spawn_completion(&mut set, index, prompt.clone(), model.clone());
        }
        set
    }

    /// Send `prompt` through every client and collect the extracted code in
    /// completion order. Failed clients are logged and skipped.
    pub async fn generate_code_in_parallel(
        &self,
        prompt: &str,
        model: Option<&str>,
        extractor: &CodeExtractor,
    ) -> Result<Vec<String>, LlmError> {
        let model = self.resolve_model(model)?;
        info!(
            "Parallel code generation on {} client(s), ~{} prompt tokens",
            self.providers.len(),
            estimate_token_count(prompt)
        );

        let mut set = self.fan_out(prompt, &model);
        let mut codes = Vec::with_capacity(self.providers.len());

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(response))) => codes.push(extractor.extract_code(&response)),
                Ok((index, Err(e))) => {
                    error!("Error processing request on client {}: {}", index, e)
                }
                Err(e) => error!("Completion task failed: {}", e),
            }
        }

        debug!("Collected {} candidate(s)", codes.len());
        Ok(codes)
    }

    /// Fan out like [`Self::generate_code_in_parallel`] but return as soon as one
    /// client produces non-empty code. Answers without code are skipped. Slower
    /// clients keep running to the end of their own retry budget and their
    /// results are dropped.
    pub async fn first_code(
        &self,
        prompt: &str,
        model: Option<&str>,
        extractor: &CodeExtractor,
    ) -> Result<Option<(String, String)>, LlmError> {
        let model = self.resolve_model(model)?;
        info!(
            "First-available code generation on {} client(s), ~{} prompt tokens",
            self.providers.len(),
            estimate_token_count(prompt)
        );

        let mut set = self.fan_out(prompt, &model);

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, Ok(response))) => {
                    let code = extractor.extract_code(&response);
                    if code.trim().is_empty() {
                        warn!("Client {} answered without code, waiting for others", index);
                        continue;
                    }
                    debug!("Client {} answered first", index);
                    set.detach_all();
                    return Ok(Some((response, code)));
                }
                Ok((index, Err(e))) => warn!("Client {} produced no response: {}", index, e),
                Err(e) => error!("Completion task failed: {}", e),
            }
        }

        Ok(None)
    }

    /// Batch fan-out: job `i` is served by client `i % n`, at most `n` jobs in
    /// flight. Results arrive in completion order.
    pub async fn generate_jobs_in_parallel<T>(
        &self,
        jobs: Vec<CompletionJob<T>>,
        model: Option<&str>,
    ) -> Result<Vec<JobResult<T>>, LlmError>
    where
        T: Send + 'static,
    {
        let model: Arc<str> = Arc::from(self.resolve_model(model)?);
        let permits = Arc::new(Semaphore::new(self.providers.len()));
        let total = jobs.len();
        info!(
            "Dispatching {} job(s) over {} client(s)",
            total,
            self.providers.len()
        );

        let mut set = JoinSet::new();
        for (i, job) in jobs.into_iter().enumerate() {
            let client_index = i % self.providers.len();
            let provider = self.providers[client_index].clone();
            let retry = self.retry.clone();
            let temperature = self.temperature;
            let model = model.clone();
            let permits = permits.clone();

            set.spawn(async move {
                let response = match permits.acquire_owned().await {
                    Ok(_permit) => {
                        let label =
                            format!("{}#{} job {}", provider.provider_name(), client_index, i);
                        retry
                            .run(&label, || provider.complete(&job.prompt, &model, temperature))
                            .await
                    }
                    Err(e) => Err(LlmError::Configuration(format!("semaphore error: {}", e))),
                };
                JobResult {
                    payload: job.payload,
                    prompt: job.prompt,
                    client_index,
                    response,
                }
            });
        }

        let mut results = Vec::with_capacity(total);
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => error!("Batch completion task failed: {}", e),
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        reply: Result<&'static str, fn() -> LlmError>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl Scripted {
        fn ok(reply: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply),
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            })
        }

        fn slow(reply: &'static str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply),
                calls: AtomicUsize::new(0),
                delay,
            })
        }

        fn failing(err: fn() -> LlmError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(err),
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            })
        }
    }

    #[async_trait::async_trait]
    impl ChatCompletion for Scripted {
        async fn complete(&self, prompt: &str, _model: &str, _t: f32) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.reply {
                Ok(reply) => Ok(reply.replace("{prompt}", prompt)),
                Err(make) => Err(make()),
            }
        }

        fn provider_name(&self) -> &str {
            "scripted"
        }
    }

    fn supported() -> Vec<String> {
        vec!["model-a".to_string(), "model-b".to_string()]
    }

    fn pool(providers: Vec<Arc<dyn ChatCompletion>>) -> LlmPool {
        LlmPool::new(providers, None, supported(), RetryPolicy::without_delay(6)).unwrap()
    }

    #[test]
    fn test_default_model_is_first_supported() {
        let p = pool(vec![Scripted::ok("x")]);
        assert_eq!(p.default_model(), "model-a");
        assert_eq!(p.resolve_model(Some("model-b")).unwrap(), "model-b");
    }

    #[test]
    fn test_unsupported_model_is_rejected_at_construction() {
        let result = LlmPool::new(
            vec![Scripted::ok("x")],
            Some("gpt-2".into()),
            supported(),
            RetryPolicy::without_delay(1),
        );
        assert!(matches!(result, Err(LlmError::UnsupportedModel { .. })));
    }

    #[test]
    fn test_empty_pool_is_configuration_error() {
        let result = LlmPool::new(vec![], None, supported(), RetryPolicy::without_delay(1));
        assert!(matches!(result, Err(LlmError::Configuration(_))));
    }

    #[test]
    fn test_from_config_requires_keys() {
        let result = LlmPool::from_config(&LlmConfig::default());
        assert!(matches!(result, Err(LlmError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_unsupported_request_model_makes_no_call() {
        let client = Scripted::ok("x");
        let p = pool(vec![client.clone()]);
        let result = p.generate("prompt", Some("gpt-2")).await;
        assert!(matches!(result, Err(LlmError::UnsupportedModel { .. })));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generate_retries_transient_six_times() {
        let client = Scripted::failing(|| LlmError::Transient("503".into()));
        let p = pool(vec![client.clone()]);
        let result = p.generate("prompt", None).await;
        assert!(matches!(
            result,
            Err(LlmError::RetriesExhausted { attempts: 6, .. })
        ));
        assert_eq!(client.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_parallel_collects_from_every_client() {
        let a = Scripted::ok("```rust\nfn a() {}\n```");
        let b = Scripted::ok("fn b() {}");
        let broken = Scripted::failing(|| LlmError::EmptyResponse);
        let p = pool(vec![a.clone(), b.clone(), broken.clone()]);

        let mut codes = p
            .generate_code_in_parallel("prompt", None, &CodeExtractor::rust().unwrap())
            .await
            .unwrap();
        codes.sort();

        assert_eq!(codes, vec!["fn a() {}", "fn b() {}"]);
        assert_eq!(broken.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_first_code_returns_fastest_answer() {
        let slow = Scripted::slow("fn slow() {}", Duration::from_millis(500));
        let fast = Scripted::ok("```rust\nfn fast() {}\n```");
        let p = pool(vec![slow, fast]);

        let (raw, code) = p
            .first_code("prompt", None, &CodeExtractor::rust().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(code, "fn fast() {}");
        assert!(raw.contains("```rust"));
    }

    #[tokio::test]
    async fn test_first_code_skips_answer_without_code() {
        let empty = Scripted::ok("```rust\n\n```");
        let late = Scripted::slow("```rust\nfn main() {}\n```", Duration::from_millis(200));
        let p = pool(vec![empty.clone(), late]);

        let (_, code) = p
            .first_code("prompt", None, &CodeExtractor::rust().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(code, "fn main() {}");
        assert_eq!(empty.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_first_code_none_when_no_answer_has_code() {
        let p = pool(vec![Scripted::ok("```rust\n```"), Scripted::ok("   ")]);
        let result = p
            .first_code("prompt", None, &CodeExtractor::rust().unwrap())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_first_code_none_when_all_fail() {
        let p = pool(vec![
            Scripted::failing(|| LlmError::EmptyResponse),
            Scripted::failing(|| LlmError::Rejected {
                status: 401,
                message: "bad key".into(),
            }),
        ]);
        let result = p
            .first_code("prompt", None, &CodeExtractor::rust().unwrap())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_jobs_are_spread_round_robin() {
        let a = Scripted::ok("a:{prompt}");
        let b = Scripted::ok("b:{prompt}");
        let p = pool(vec![a.clone(), b.clone()]);

        let jobs = (0..5)
            .map(|i| CompletionJob {
                prompt: format!("job{}", i),
                payload: i,
            })
            .collect();
        let mut results = p.generate_jobs_in_parallel(jobs, None).await.unwrap();
        results.sort_by_key(|r| r.payload);

        assert_eq!(results.len(), 5);
        for r in &results {
            assert_eq!(r.client_index, r.payload % 2);
            let expected = format!("{}:job{}", if r.payload % 2 == 0 { "a" } else { "b" }, r.payload);
            assert_eq!(r.response.as_ref().unwrap(), &expected);
        }
        assert_eq!(a.calls.load(Ordering::SeqCst), 3);
        assert_eq!(b.calls.load(Ordering::SeqCst), 2);
    }
}
