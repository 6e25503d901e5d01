//! Data carried through one translate-verify-repair session.

use rust_checker::CompilationResult;
use std::fmt;
use thiserror::Error;

use llm_requester::LlmError;
use prompt_builder::FunctionContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub source_language: String,
    pub source_code: String,
    pub target_language: String,
    pub target_model: Option<String>,
    /// Prefix of the audit artifact files. Defaults to `translation`.
    pub label: Option<String>,
    /// Target-side facts (signature, dependencies, libraries) rendered into the
    /// translation prompt.
    pub context: FunctionContext,
}

impl TranslationRequest {
    pub fn new(source_language: impl Into<String>, source_code: impl Into<String>) -> Self {
        Self {
            source_language: source_language.into(),
            source_code: source_code.into(),
            target_language: "Rust".to_string(),
            target_model: None,
            label: None,
            context: FunctionContext::default(),
        }
    }

    pub fn with_target_language(mut self, target_language: impl Into<String>) -> Self {
        self.target_language = target_language.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.target_model = Some(model.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_context(mut self, context: FunctionContext) -> Self {
        self.context = context;
        self
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("translation")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOrigin {
    Initial,
    Repaired,
}

/// One generated translation. Replaced, never edited, on each attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub code_text: String,
    pub origin: CandidateOrigin,
    /// 0 for the initial translation, n for the n-th repair.
    pub attempt_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Translating,
    Checking,
    Repairing,
    Success,
    Exhausted,
    Failure,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Exhausted | Self::Failure)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Translating => "translating",
            Self::Checking => "checking",
            Self::Repairing => "repairing",
            Self::Success => "success",
            Self::Exhausted => "exhausted",
            Self::Failure => "failure",
        };
        f.write_str(name)
    }
}

/// A candidate and the compile result it produced.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub candidate: Candidate,
    pub result: CompilationResult,
}

#[derive(Debug, Clone)]
pub struct TranslationOutcome {
    pub code: Option<String>,
    pub success: bool,
    pub state: SessionState,
    /// One entry per compile check, in order.
    pub history: Vec<AttemptRecord>,
}

impl TranslationOutcome {
    pub fn failure() -> Self {
        Self {
            code: None,
            success: false,
            state: SessionState::Failure,
            history: Vec::new(),
        }
    }

    /// Number of repaired candidates that were produced.
    pub fn repair_count(&self) -> usize {
        self.history
            .iter()
            .filter(|r| r.candidate.origin == CandidateOrigin::Repaired)
            .count()
    }

    pub fn into_pair(self) -> (Option<String>, bool) {
        (self.code, self.success)
    }
}

/// Errors that end a session before it can produce an outcome.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    UnsupportedModel(LlmError),
    #[error("invalid session configuration: {0}")]
    Configuration(String),
}
