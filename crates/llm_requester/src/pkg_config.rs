use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Models accepted when the configuration does not name its own list.
/// The first entry is the default model.
pub const SUPPORTED_MODELS: [&str; 3] = [
    "claude-3-5-sonnet-20240620",
    "claude-3-7-sonnet-20250219",
    "deepseek-v3",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub min_delay_secs: f64,
    pub max_delay_secs: f64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            min_delay_secs: 1.0,
            max_delay_secs: 10.0,
            multiplier: 1.0,
        }
    }
}

/// `[llm]` section of config.toml
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    /// One completion client is created per key.
    pub api_keys: Vec<String>,
    pub model: Option<String>,
    pub supported_models: Vec<String>,
    pub temperature: f32,
    pub request_timeout_secs: u64,
    pub retry: RetryConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_keys: Vec::new(),
            model: None,
            supported_models: SUPPORTED_MODELS.iter().map(|m| m.to_string()).collect(),
            temperature: 0.0,
            request_timeout_secs: 120,
            retry: RetryConfig::default(),
        }
    }
}

impl LlmConfig {
    /// Credentials with placeholders and blanks removed.
    pub fn usable_api_keys(&self) -> Vec<String> {
        self.api_keys
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty() && !k.starts_with("your_"))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_service_contract() {
        let cfg = LlmConfig::default();
        assert_eq!(cfg.retry.max_attempts, 6);
        assert_eq!(cfg.retry.min_delay_secs, 1.0);
        assert_eq!(cfg.retry.max_delay_secs, 10.0);
        assert_eq!(cfg.temperature, 0.0);
        assert_eq!(cfg.supported_models[0], "claude-3-5-sonnet-20240620");
    }

    #[test]
    fn test_placeholder_keys_are_dropped() {
        let cfg = LlmConfig {
            api_keys: vec![
                "sk-live".into(),
                "  ".into(),
                "your_api_key_here".into(),
                " sk-other ".into(),
            ],
            ..LlmConfig::default()
        };
        assert_eq!(cfg.usable_api_keys(), vec!["sk-live", "sk-other"]);
    }

    #[test]
    fn test_deserialize_partial_section() {
        let cfg: LlmConfig = serde_json::from_str(
            r#"{"api_keys": ["k1", "k2"], "model": "deepseek-v3", "retry": {"max_attempts": 3}}"#,
        )
        .unwrap();
        assert_eq!(cfg.api_keys.len(), 2);
        assert_eq!(cfg.model.as_deref(), Some("deepseek-v3"));
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.retry.max_delay_secs, 10.0);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }
}
