use thiserror::Error;

/// Errors raised by the completion client.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network failure, rate limit or server-side error. Retried by [`crate::RetryPolicy`].
    #[error("transient completion service error: {0}")]
    Transient(String),

    /// The service answered but the first choice carried no content.
    #[error("Empty response from API")]
    EmptyResponse,

    #[error("Unsupported model: {model}. Supported models are: {}", supported.join(", "))]
    UnsupportedModel {
        model: String,
        supported: Vec<String>,
    },

    /// Non-retryable HTTP status (authentication, malformed request, ...).
    #[error("completion request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("completion failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: usize,
        #[source]
        last: Box<LlmError>,
    },

    #[error("LLM configuration error: {0}")]
    Configuration(String),
}

/// Decides whether a failed remote call is worth another attempt.
pub trait Retryable: Sized {
    fn is_retryable(&self) -> bool;

    /// Final error once the attempt budget is spent.
    fn into_exhausted(self, _attempts: usize) -> Self {
        self
    }
}

impl Retryable for LlmError {
    fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Transient(_))
    }

    fn into_exhausted(self, attempts: usize) -> Self {
        LlmError::RetriesExhausted {
            attempts,
            last: Box::new(self),
        }
    }
}

impl LlmError {
    /// HTTP status classification used by the providers.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            408 | 429 | 500..=599 => LlmError::Transient(format!("HTTP {}: {}", status, message)),
            _ => LlmError::Rejected { status, message },
        }
    }
}
