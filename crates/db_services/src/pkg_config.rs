use serde::Deserialize;

/// `[retrieval]` section of config.toml
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Build prompts without examples when false.
    pub enabled: bool,
    pub qdrant_url: String,
    pub collection_name: String,
    pub vector_size: usize,
    pub top_k: usize,
    pub embedding_model: String,
    pub timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            qdrant_url: "http://localhost:6334".to_string(),
            collection_name: "function_pair".to_string(),
            vector_size: 384,
            top_k: 1,
            embedding_model: "all-minilm-l6-v2".to_string(),
            timeout_secs: 60,
        }
    }
}
