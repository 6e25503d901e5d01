use async_trait::async_trait;
use log::{debug, info};
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::error::RetrievalError;
use crate::pkg_config::RetrievalConfig;
use crate::{IndexMatch, VectorIndex};

/// Payload field holding the stored source snippet.
pub const DOCUMENT_FIELD: &str = "document";

/// Qdrant collection of (source, translation) pairs.
pub struct QdrantIndex {
    client: Qdrant,
    collection_name: String,
    vector_size: u64,
}

impl QdrantIndex {
    /// Connect and make sure the collection exists.
    pub async fn new(cfg: &RetrievalConfig) -> Result<Self, RetrievalError> {
        let timeout = Duration::from_secs(cfg.timeout_secs.max(1));
        let client = Qdrant::from_url(&cfg.qdrant_url)
            .timeout(timeout)
            .build()
            .map_err(|e| RetrievalError::Index(format!("Failed to create Qdrant client: {}", e)))?;

        let index = Self {
            client,
            collection_name: cfg.collection_name.clone(),
            vector_size: cfg.vector_size as u64,
        };
        index.ensure_collection().await?;

        info!(
            "Qdrant index ready: {} (collection: {}, vector dimension: {})",
            cfg.qdrant_url, index.collection_name, index.vector_size
        );
        Ok(index)
    }

    async fn ensure_collection(&self) -> Result<(), RetrievalError> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| RetrievalError::Index(e.to_string()))?;
        // 检查集合是否已存在
        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection_name);

        if exists {
            debug!("Using existing collection: {}", self.collection_name);
            return Ok(());
        }

        // 创建新集合，使用余弦距离
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection_name)
                    .vectors_config(VectorParamsBuilder::new(self.vector_size, Distance::Cosine)),
            )
            .await
            .map_err(|e| RetrievalError::Index(format!("Failed to create collection: {}", e)))?;

        info!(
            "Created Qdrant collection: {} (dimension: {})",
            self.collection_name, self.vector_size
        );
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn query(&self, vector: Vec<f32>, k: usize) -> Result<Vec<IndexMatch>, RetrievalError> {
        let points = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection_name, vector, k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| RetrievalError::Index(format!("Failed to search points: {}", e)))?
            .result;

        let matches: Vec<IndexMatch> = points
            .into_iter()
            .map(|point| {
                let mut metadata = payload_strings(&point.payload);
                let document = metadata.remove(DOCUMENT_FIELD).unwrap_or_default();
                IndexMatch {
                    document,
                    metadata,
                    score: point.score,
                }
            })
            .collect();

        debug!("Found {} similar entries", matches.len());
        Ok(matches)
    }

    async fn upsert(
        &self,
        vector: Vec<f32>,
        document: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String, RetrievalError> {
        // 每条记录使用随机 UUID 作为点 ID
        let point_id = Uuid::new_v4().to_string();
        let mut payload = Payload::new();
        payload.insert(DOCUMENT_FIELD, document.to_string());
        for (key, value) in metadata {
            payload.insert(key, value);
        }

        let point = PointStruct::new(point_id.clone(), vector, payload);
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection_name, vec![point]).wait(true))
            .await
            .map_err(|e| RetrievalError::Index(format!("Failed to insert point: {}", e)))?;

        debug!("Inserted point {}", point_id);
        Ok(point_id)
    }
}

/// String-valued payload fields; other kinds are not used by retrieval.
fn payload_strings(payload: &HashMap<String, QdrantValue>) -> HashMap<String, String> {
    payload
        .iter()
        .filter_map(|(key, value)| match &value.kind {
            Some(Kind::StringValue(s)) => Some((key.clone(), s.clone())),
            _ => None,
        })
        .collect()
}
