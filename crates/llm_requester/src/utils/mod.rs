pub mod token_counter;

pub use token_counter::{PROMPT_WARN_TOKENS, estimate_token_count};
