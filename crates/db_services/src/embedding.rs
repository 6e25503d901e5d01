use async_trait::async_trait;

use crate::error::RetrievalError;

/// Turns a code snippet into a fixed-size vector.
#[async_trait]
pub trait Encoder: Send + Sync {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, RetrievalError>;

    fn dimension(&self) -> usize;
}

/// Cosine of the angle between two vectors. Zero for mismatched lengths or a
/// zero vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(feature = "fastembed")]
pub use local::FastEmbedEncoder;

#[cfg(feature = "fastembed")]
mod local {
    use async_trait::async_trait;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use log::info;
    use std::sync::{Arc, Mutex};

    use super::Encoder;
    use crate::error::RetrievalError;

    /// Local ONNX embedding model.
    pub struct FastEmbedEncoder {
        model: Arc<Mutex<TextEmbedding>>,
        dimension: usize,
    }

    fn resolve_model(name: &str) -> Result<(EmbeddingModel, usize), RetrievalError> {
        match name.to_lowercase().as_str() {
            "all-minilm-l6-v2" | "allminilml6v2" => Ok((EmbeddingModel::AllMiniLML6V2, 384)),
            "bge-small-en-v1.5" | "bgesmallenv15" => Ok((EmbeddingModel::BGESmallENV15, 384)),
            "bge-base-en-v1.5" | "bgebaseenv15" => Ok((EmbeddingModel::BGEBaseENV15, 768)),
            other => Err(RetrievalError::Configuration(format!(
                "unknown embedding model: {}",
                other
            ))),
        }
    }

    impl FastEmbedEncoder {
        /// Loads (and on first use downloads) the named model.
        pub fn new(model_name: &str) -> Result<Self, RetrievalError> {
            let (model, dimension) = resolve_model(model_name)?;
            let embedding = TextEmbedding::try_new(InitOptions::new(model))
                .map_err(|e| RetrievalError::Encoding(format!("model load failed: {}", e)))?;
            info!(
                "Loaded embedding model {} (dimension: {})",
                model_name, dimension
            );
            Ok(Self {
                model: Arc::new(Mutex::new(embedding)),
                dimension,
            })
        }
    }

    #[async_trait]
    impl Encoder for FastEmbedEncoder {
        async fn encode(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
            let model = Arc::clone(&self.model);
            let text = text.to_string();
            let mut vectors = tokio::task::spawn_blocking(move || {
                let mut guard = model
                    .lock()
                    .map_err(|_| RetrievalError::Encoding("embedding model lock poisoned".into()))?;
                guard
                    .embed(vec![text], None)
                    .map_err(|e| RetrievalError::Encoding(e.to_string()))
            })
            .await
            .map_err(|e| RetrievalError::Encoding(format!("embedding task failed: {}", e)))??;

            vectors
                .pop()
                .ok_or_else(|| RetrievalError::Encoding("model returned no embedding".into()))
        }

        fn dimension(&self) -> usize {
            self.dimension
        }
    }

}
