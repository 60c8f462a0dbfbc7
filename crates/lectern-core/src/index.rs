//! Vector index over extracted documents.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{LecternError, LecternResult};
use crate::splitter::TextSplitter;
use crate::traits::{Embedder, StorageStats, VectorRecord, VectorSearchResult, VectorStore};
use crate::types::Document;

/// Receives extracted documents for indexing.
#[async_trait]
pub trait IngestionSink: Send + Sync {
    /// Index a document. Returns the number of chunks stored.
    async fn insert_document(&self, document: Document) -> LecternResult<usize>;
}

/// A chunk returned by retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub text: String,
    pub filename: Option<String>,
    pub score: f32,
}

impl From<VectorSearchResult> for RetrievedChunk {
    fn from(result: VectorSearchResult) -> Self {
        Self {
            text: result.get_string("data").unwrap_or_default().to_string(),
            filename: result.get_string("filename").map(str::to_string),
            score: result.score,
        }
    }
}

/// Splits, embeds and stores documents; answers similarity queries.
pub struct DocumentIndex {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    splitter: TextSplitter,
}

impl DocumentIndex {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            splitter: TextSplitter::default(),
        }
    }

    pub fn with_splitter(mut self, splitter: TextSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    /// The `top_k` chunks most similar to `query`.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> LecternResult<Vec<RetrievedChunk>> {
        if query.trim().is_empty() {
            return Err(LecternError::validation("query must not be empty"));
        }
        let vector = self.embedder.embed(query).await?;
        let results = self.store.search(&vector, top_k.max(1)).await?;
        debug!(query, hits = results.len(), "Retrieved chunks");
        Ok(results.into_iter().map(RetrievedChunk::from).collect())
    }

    /// Storage usage of the underlying store.
    pub async fn stats(&self) -> LecternResult<StorageStats> {
        self.store.stats().await
    }

    /// Delete every indexed vector. Returns the number removed.
    pub async fn clear(&self) -> LecternResult<u64> {
        let removed = self.store.clear().await?;
        info!(removed, collection = self.store.collection_name(), "Vector store cleared");
        Ok(removed)
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }
}

#[async_trait]
impl IngestionSink for DocumentIndex {
    async fn insert_document(&self, document: Document) -> LecternResult<usize> {
        let chunks = self.splitter.split(&document.text);
        if chunks.is_empty() {
            debug!(document_id = %document.id, "Document has no text to index");
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(LecternError::embedding(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let created_at = chrono::Utc::now().to_rfc3339();
        let records: Vec<VectorRecord> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                let mut payload: HashMap<String, serde_json::Value> = document.metadata.clone();
                payload.insert("data".into(), chunk.text.into());
                payload.insert("document_id".into(), document.id.clone().into());
                payload.insert("chunk_index".into(), chunk.index.into());
                payload.insert("created_at".into(), created_at.clone().into());
                VectorRecord::new(uuid::Uuid::new_v4().to_string(), vector, payload)
            })
            .collect();

        let count = records.len();
        self.store.insert(records).await?;
        info!(
            document_id = %document.id,
            filename = document.filename().unwrap_or_default(),
            chunks = count,
            "Document indexed"
        );
        Ok(count)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::traits::{DistanceMetric, TableInfo};
    use std::sync::Mutex;

    /// Embeds text as letter frequencies over `a..=z`.
    pub struct LetterEmbedder;

    #[async_trait]
    impl Embedder for LetterEmbedder {
        async fn embed(&self, text: &str) -> LecternResult<Vec<f32>> {
            let mut v = vec![0.0f32; 26];
            for c in text.to_lowercase().chars() {
                if c.is_ascii_lowercase() {
                    v[(c as u8 - b'a') as usize] += 1.0;
                }
            }
            Ok(v)
        }

        fn dimension(&self) -> usize {
            26
        }

        fn model_name(&self) -> &str {
            "letters"
        }
    }

    /// Brute-force cosine store kept in a vector.
    #[derive(Default)]
    pub struct ListStore {
        pub records: Mutex<Vec<VectorRecord>>,
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if na == 0.0 || nb == 0.0 {
            0.0
        } else {
            dot / (na * nb)
        }
    }

    #[async_trait]
    impl VectorStore for ListStore {
        async fn create_collection(&self, _: usize, _: DistanceMetric) -> LecternResult<()> {
            Ok(())
        }

        async fn insert(&self, records: Vec<VectorRecord>) -> LecternResult<()> {
            self.records.lock().unwrap().extend(records);
            Ok(())
        }

        async fn search(&self, query: &[f32], limit: usize) -> LecternResult<Vec<VectorSearchResult>> {
            let mut hits: Vec<VectorSearchResult> = self
                .records
                .lock()
                .unwrap()
                .iter()
                .map(|r| VectorSearchResult {
                    id: r.id.clone(),
                    score: cosine(query, &r.vector),
                    payload: r.payload.clone(),
                })
                .collect();
            hits.sort_by(|a, b| b.score.total_cmp(&a.score));
            hits.truncate(limit);
            Ok(hits)
        }

        async fn get(&self, id: &str) -> LecternResult<Option<VectorRecord>> {
            Ok(self.records.lock().unwrap().iter().find(|r| r.id == id).cloned())
        }

        async fn delete(&self, id: &str) -> LecternResult<()> {
            self.records.lock().unwrap().retain(|r| r.id != id);
            Ok(())
        }

        async fn count(&self) -> LecternResult<u64> {
            Ok(self.records.lock().unwrap().len() as u64)
        }

        async fn clear(&self) -> LecternResult<u64> {
            let mut records = self.records.lock().unwrap();
            let n = records.len() as u64;
            records.clear();
            Ok(n)
        }

        async fn stats(&self) -> LecternResult<StorageStats> {
            Ok(StorageStats {
                backend: "list".into(),
                vector_count: self.count().await?,
                size_bytes: None,
                tables: vec![TableInfo {
                    name: "list".into(),
                    size: "0 B".into(),
                    indexes: vec![],
                }],
            })
        }

        fn collection_name(&self) -> &str {
            "list"
        }
    }

    pub fn index() -> (DocumentIndex, Arc<ListStore>) {
        let store = Arc::new(ListStore::default());
        (DocumentIndex::new(Arc::new(LetterEmbedder), store.clone()), store)
    }
}
