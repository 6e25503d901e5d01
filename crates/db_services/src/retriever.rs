use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::embedding::{cosine_similarity, Encoder};
use crate::error::RetrievalError;
use crate::{IndexMatch, VectorIndex};

/// Payload field holding the stored translation.
pub const TRANSLATION_FIELD: &str = "translation";

/// A previously stored (source, translation) pair used to ground a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalExample {
    pub source_snippet: String,
    pub translated_snippet: String,
    pub score: f32,
}

impl From<IndexMatch> for RetrievalExample {
    fn from(m: IndexMatch) -> Self {
        let translated_snippet = m.metadata.get(TRANSLATION_FIELD).cloned().unwrap_or_default();
        Self {
            source_snippet: m.document,
            translated_snippet,
            score: m.score,
        }
    }
}

/// One line of a pairs file: `{"source": "...", "translation": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationPair {
    pub source: String,
    pub translation: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[async_trait]
pub trait ExampleRetriever: Send + Sync {
    /// Examples most similar to `query_code`, best first, at most `top_k`.
    async fn retrieve(
        &self,
        query_code: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalExample>, RetrievalError>;
}

/// Encoder + index composition. Holds no state of its own.
pub struct SimilarityRetriever {
    encoder: Arc<dyn Encoder>,
    index: Arc<dyn VectorIndex>,
}

impl SimilarityRetriever {
    pub fn new(encoder: Arc<dyn Encoder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { encoder, index }
    }

    pub async fn similarity(&self, code1: &str, code2: &str) -> Result<f32, RetrievalError> {
        let a = self.encoder.encode(code1).await?;
        let b = self.encoder.encode(code2).await?;
        Ok(cosine_similarity(&a, &b))
    }

    /// Encode and store every pair. Returns the number stored.
    pub async fn index_pairs(&self, pairs: &[TranslationPair]) -> Result<usize, RetrievalError> {
        let mut stored = 0;
        for pair in pairs {
            if pair.source.trim().is_empty() {
                warn!("Skipping translation pair with empty source");
                continue;
            }
            let vector = self.encoder.encode(&pair.source).await?;
            let mut metadata = HashMap::new();
            metadata.insert(TRANSLATION_FIELD.to_string(), pair.translation.clone());
            if let Some(lang) = &pair.language {
                metadata.insert("language".to_string(), lang.clone());
            }
            self.index.upsert(vector, &pair.source, metadata).await?;
            stored += 1;
        }
        info!("Indexed {} of {} translation pairs", stored, pairs.len());
        Ok(stored)
    }
}

#[async_trait]
impl ExampleRetriever for SimilarityRetriever {
    async fn retrieve(
        &self,
        query_code: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalExample>, RetrievalError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let vector = self.encoder.encode(query_code).await?;
        let mut examples: Vec<RetrievalExample> = self
            .index
            .query(vector, top_k)
            .await?
            .into_iter()
            .map(RetrievalExample::from)
            .collect();

        examples.sort_by(|a, b| b.score.total_cmp(&a.score));
        examples.truncate(top_k);
        debug!("Retrieved {} examples", examples.len());
        Ok(examples)
    }
}

/// Parse a JSON-lines file of translation pairs. Blank lines are skipped.
pub fn load_pairs_jsonl(path: &Path) -> Result<Vec<TranslationPair>, RetrievalError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| RetrievalError::Pairs(format!("{}: {}", path.display(), e)))?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line)
                .map_err(|e| RetrievalError::Pairs(format!("line {}: {}", n + 1, e)))
        })
        .collect()
}
