use log::{debug, warn};

/// Prompts above this estimate are logged as warnings.
pub const PROMPT_WARN_TOKENS: usize = 100_000;

/// Approximate token count based on character count.
/// Uses a conservative 2.5 characters per token, good enough for size logging.
pub fn estimate_token_count(text: &str) -> usize {
    let char_count = text.chars().count();
    let tokens = (char_count as f64 / 2.5).ceil() as usize;

    if tokens > PROMPT_WARN_TOKENS {
        warn!(
            "Large token count estimated: {} tokens ({} chars)",
            tokens, char_count
        );
    } else if tokens > PROMPT_WARN_TOKENS / 2 {
        debug!(
            "Moderate token count: {} tokens ({} chars)",
            tokens, char_count
        );
    }

    tokens
}
