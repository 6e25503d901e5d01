//! Similarity retrieval of previously translated examples.
//!
//! [`SimilarityRetriever`] composes an [`Encoder`] with a [`VectorIndex`]; both are
//! external services seen only through these traits.

use async_trait::async_trait;
use std::collections::HashMap;

pub mod embedding;
pub mod error;
pub mod pkg_config;
pub mod qdrant_services;
pub mod retriever;

pub use embedding::{cosine_similarity, Encoder};
#[cfg(feature = "fastembed")]
pub use embedding::FastEmbedEncoder;
pub use error::RetrievalError;
pub use pkg_config::RetrievalConfig;
pub use qdrant_services::QdrantIndex;
pub use retriever::{
    load_pairs_jsonl, ExampleRetriever, RetrievalExample, SimilarityRetriever, TranslationPair,
};

/// One ranked hit from the vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMatch {
    pub document: String,
    pub metadata: HashMap<String, String>,
    pub score: f32,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Up to `k` nearest entries, highest score first.
    async fn query(&self, vector: Vec<f32>, k: usize) -> Result<Vec<IndexMatch>, RetrievalError>;

    /// Store one entry and return its id.
    async fn upsert(
        &self,
        vector: Vec<f32>,
        document: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String, RetrievalError>;
}

/// Build the default retriever: local fastembed model over a Qdrant collection.
#[cfg(feature = "fastembed")]
pub async fn connect(cfg: &RetrievalConfig) -> Result<SimilarityRetriever, RetrievalError> {
    use std::sync::Arc;

    let model_name = cfg.embedding_model.clone();
    let encoder = tokio::task::spawn_blocking(move || FastEmbedEncoder::new(&model_name))
        .await
        .map_err(|e| RetrievalError::Encoding(format!("model load task failed: {}", e)))??;

    // 向量维度必须与集合配置一致
    if encoder.dimension() != cfg.vector_size {
        return Err(RetrievalError::Configuration(format!(
            "embedding model {} produces {} dimensions but vector_size is {}",
            cfg.embedding_model,
            encoder.dimension(),
            cfg.vector_size
        )));
    }

    // 连接 Qdrant，集合不存在时自动创建
    let index = QdrantIndex::new(cfg).await?;
    Ok(SimilarityRetriever::new(Arc::new(encoder), Arc::new(index)))
}
