use db_services::ExampleRetriever;
use llm_requester::{CodeExtractor, LlmError, LlmPool};
use log::{debug, error, info, warn};
use prompt_builder::PromptBuilder;
use rust_checker::{CodeChecker, extract_key_errors, is_warnings_only};
use std::path::PathBuf;
use std::sync::Arc;

use crate::artifact::{TranslationArtifact, save_artifact};
use crate::pkg_config::RepairConfig;
use crate::session::{
    AttemptRecord, Candidate, CandidateOrigin, SessionError, SessionState, TranslationOutcome,
    TranslationRequest,
};

/// Stage notification callback.
pub type StageCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// The first code produced for a prompt, with the text it came from.
#[derive(Debug, Clone)]
pub struct Generated {
    pub prompt: String,
    pub response: String,
    pub code: String,
}

/// Drives translate, check and repair for one request at a time.
///
/// Sessions are independent; one engine can serve concurrent sessions.
pub struct RepairEngine {
    pool: Arc<LlmPool>,
    retriever: Option<Arc<dyn ExampleRetriever>>,
    checker: Arc<dyn CodeChecker>,
    max_retries: usize,
    top_k: usize,
    artifact_dir: Option<PathBuf>,
    callback: Option<StageCallback>,
}

impl RepairEngine {
    pub fn new(pool: Arc<LlmPool>, checker: Arc<dyn CodeChecker>, cfg: &RepairConfig) -> Self {
        Self {
            pool,
            retriever: None,
            checker,
            max_retries: cfg.max_retries,
            top_k: 1,
            artifact_dir: cfg.artifact_dir.clone(),
            callback: None,
        }
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn ExampleRetriever>, top_k: usize) -> Self {
        self.retriever = Some(retriever);
        self.top_k = top_k;
        self
    }

    pub fn with_callback(mut self, callback: StageCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn with_artifact_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.artifact_dir = dir;
        self
    }

    pub fn pool(&self) -> &LlmPool {
        &self.pool
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    fn notify(&self, state: SessionState, label: &str) {
        debug!("[{}] -> {}", label, state);
        if let Some(cb) = &self.callback {
            cb(&format!("{}: {}", label, state));
        }
    }

    /// Examples for the prompt. Retrieval problems never stop a session.
    async fn examples_for(&self, source_code: &str) -> Vec<db_services::RetrievalExample> {
        let Some(retriever) = &self.retriever else {
            return Vec::new();
        };
        match retriever.retrieve(source_code, self.top_k).await {
            Ok(examples) => {
                info!("Retrieved {} translation pair examples", examples.len());
                examples
            }
            Err(e) => {
                warn!("Example retrieval failed, continuing without examples: {}", e);
                Vec::new()
            }
        }
    }

    /// First extracted answer for `prompt`. Only an unsupported model is fatal;
    /// every other completion failure reads as "no answer".
    async fn first_answer(
        &self,
        prompt: String,
        model: &str,
        extractor: &CodeExtractor,
    ) -> Result<Option<Generated>, SessionError> {
        match self.pool.first_code(&prompt, Some(model), extractor).await {
            Ok(Some((response, code))) => Ok(Some(Generated {
                prompt,
                response,
                code,
            })),
            Ok(None) => Ok(None),
            Err(e @ LlmError::UnsupportedModel { .. }) => Err(SessionError::UnsupportedModel(e)),
            Err(e) => {
                error!("Completion failed: {}", e);
                Ok(None)
            }
        }
    }

    fn record(&self, request: &TranslationRequest, attempt_index: usize, generated: &Generated) {
        let artifact = TranslationArtifact {
            message: generated.prompt.clone(),
            response: generated.response.clone(),
            function: request.source_code.clone(),
            translated_function: generated.code.clone(),
        };
        save_artifact(
            self.artifact_dir.as_deref(),
            request.label(),
            attempt_index,
            &artifact,
        );
    }

    fn model_and_extractor(
        &self,
        request: &TranslationRequest,
    ) -> Result<(String, CodeExtractor), SessionError> {
        let model = self
            .pool
            .resolve_model(request.target_model.as_deref())
            .map_err(SessionError::UnsupportedModel)?;
        let extractor = CodeExtractor::for_language(&request.target_language)
            .map_err(|e| SessionError::Configuration(format!("target language pattern: {}", e)))?;
        Ok((model, extractor))
    }

    /// Retrieval-grounded translation prompt for `request`.
    pub async fn translation_prompt(&self, request: &TranslationRequest) -> String {
        let examples = self.examples_for(&request.source_code).await;
        if !request.context.is_empty() {
            debug!("[{}] prompt carries function context", request.label());
        }
        PromptBuilder::new(&request.source_language, &request.target_language)
            .with_context(request.context.clone())
            .translation_prompt(&request.source_code, &examples)
    }

    /// Initial translation only, without compiling. Used by generation-only
    /// batches.
    pub async fn translate(
        &self,
        request: &TranslationRequest,
    ) -> Result<Option<Generated>, SessionError> {
        let (model, extractor) = self.model_and_extractor(request)?;
        let label = request.label();
        self.notify(SessionState::Translating, label);

        let prompt = self.translation_prompt(request).await;
        info!(
            "[{}] start {}->{} translation",
            model, request.source_language, request.target_language
        );
        let generated = self.first_answer(prompt, &model, &extractor).await?;
        if let Some(g) = &generated {
            self.record(request, 0, g);
        }
        Ok(generated.filter(|g| !g.code.trim().is_empty()))
    }

    /// Translate, then compile and repair until the candidate compiles or the
    /// repair budget runs out.
    pub async fn translate_and_repair(
        &self,
        request: &TranslationRequest,
    ) -> Result<TranslationOutcome, SessionError> {
        let label = request.label().to_string();
        self.notify(SessionState::Init, &label);

        let (model, extractor) = self.model_and_extractor(request)?;
        let Some(initial) = self.translate(request).await? else {
            warn!("[{}] Initial translation failed", label);
            self.notify(SessionState::Failure, &label);
            return Ok(TranslationOutcome::failure());
        };

        let builder = PromptBuilder::new(&request.source_language, &request.target_language);
        let mut current = Candidate {
            code_text: initial.code,
            origin: CandidateOrigin::Initial,
            attempt_index: 0,
        };
        let mut history: Vec<AttemptRecord> = Vec::new();
        let mut fallback: Option<String> = None;
        let mut repairs = 0;

        loop {
            self.notify(SessionState::Checking, &label);
            let result = self.checker.check(&current.code_text).await;
            history.push(AttemptRecord {
                candidate: current.clone(),
                result: result.clone(),
            });

            if result.success {
                info!(
                    "[{}] Compilation successful (attempt {})",
                    label, current.attempt_index
                );
                self.notify(SessionState::Success, &label);
                return Ok(TranslationOutcome {
                    code: Some(current.code_text),
                    success: true,
                    state: SessionState::Success,
                    history,
                });
            }

            warn!(
                "[{}] Compilation failed (attempt {}):\n{}",
                label,
                current.attempt_index,
                extract_key_errors(&result.stderr)
            );
            if is_warnings_only(&result.stderr) {
                fallback = Some(current.code_text.clone());
            }

            if repairs >= self.max_retries {
                warn!("[{}] Reached maximum repair attempts {}", label, self.max_retries);
                break;
            }

            repairs += 1;
            self.notify(SessionState::Repairing, &label);
            let prompt =
                builder.repair_prompt(&request.source_code, &current.code_text, &result.stderr);
            let Some(repaired) = self.first_answer(prompt, &model, &extractor).await? else {
                warn!("[{}] No repair response, stopping", label);
                break;
            };
            self.record(request, repairs, &repaired);

            if repaired.code.trim().is_empty() || repaired.code == current.code_text {
                info!("[{}] No improvement in repair {}", label, repairs);
                break;
            }

            current = Candidate {
                code_text: repaired.code,
                origin: CandidateOrigin::Repaired,
                attempt_index: repairs,
            };
        }

        self.notify(SessionState::Exhausted, &label);
        Ok(TranslationOutcome {
            code: Some(fallback.unwrap_or(current.code_text)),
            success: false,
            state: SessionState::Exhausted,
            history,
        })
    }
}
