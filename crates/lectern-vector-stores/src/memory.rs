//! In-memory vector store.
//!
//! Brute-force similarity over every stored vector. Suitable for
//! development and tests; nothing survives a restart.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use lectern_core::error::{LecternError, LecternResult};
use lectern_core::size::human_size;
use lectern_core::traits::{
    DistanceMetric, StorageStats, TableInfo, VectorRecord, VectorSearchResult, VectorStore,
    VectorStoreConfig,
};

#[derive(Default)]
struct Collection {
    dimension: Option<usize>,
    distance: DistanceMetric,
    records: HashMap<String, VectorRecord>,
}

/// Vector store kept entirely in process memory.
pub struct MemoryVectorStore {
    name: String,
    inner: Arc<RwLock<Collection>>,
}

impl MemoryVectorStore {
    pub fn new(config: VectorStoreConfig) -> Self {
        Self {
            name: config.collection_name,
            inner: Arc::new(RwLock::new(Collection {
                dimension: None,
                distance: config.distance,
                records: HashMap::new(),
            })),
        }
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot / (norm_a * norm_b)
    }

    /// Similarity where higher is closer, matching the pgvector scores.
    fn score(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
        match metric {
            DistanceMetric::Cosine => Self::cosine_similarity(a, b),
            DistanceMetric::DotProduct => a.iter().zip(b).map(|(x, y)| x * y).sum(),
            DistanceMetric::Euclidean => {
                let d: f32 = a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f32>().sqrt();
                1.0 / (1.0 + d)
            }
        }
    }

    fn approximate_size(records: &HashMap<String, VectorRecord>) -> u64 {
        records
            .values()
            .map(|r| {
                let payload = serde_json::to_string(&r.payload).map(|s| s.len()).unwrap_or(0);
                (r.id.len() + r.vector.len() * std::mem::size_of::<f32>() + payload) as u64
            })
            .sum()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn create_collection(
        &self,
        dimension: usize,
        distance: DistanceMetric,
    ) -> LecternResult<()> {
        let mut inner = self.inner.write().await;
        inner.dimension = Some(dimension);
        inner.distance = distance;
        debug!(collection = %self.name, dimension, "Memory collection ready");
        Ok(())
    }

    async fn insert(&self, records: Vec<VectorRecord>) -> LecternResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(dim) = inner.dimension {
            if let Some(bad) = records.iter().find(|r| r.vector.len() != dim) {
                return Err(LecternError::vector_store(format!(
                    "vector '{}' has dimension {}, collection expects {}",
                    bad.id,
                    bad.vector.len(),
                    dim
                )));
            }
        }
        let count = records.len();
        for record in records {
            inner.records.insert(record.id.clone(), record);
        }
        debug!(collection = %self.name, count, "Inserted vectors");
        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> LecternResult<Vec<VectorSearchResult>> {
        let inner = self.inner.read().await;
        let mut results: Vec<VectorSearchResult> = inner
            .records
            .values()
            .filter(|r| r.vector.len() == query_vector.len())
            .map(|r| VectorSearchResult {
                id: r.id.clone(),
                score: Self::score(inner.distance, query_vector, &r.vector),
                payload: r.payload.clone(),
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(limit);
        Ok(results)
    }

    async fn get(&self, id: &str) -> LecternResult<Option<VectorRecord>> {
        Ok(self.inner.read().await.records.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> LecternResult<()> {
        self.inner.write().await.records.remove(id);
        Ok(())
    }

    async fn count(&self) -> LecternResult<u64> {
        Ok(self.inner.read().await.records.len() as u64)
    }

    async fn clear(&self) -> LecternResult<u64> {
        let mut inner = self.inner.write().await;
        let removed = inner.records.len() as u64;
        inner.records.clear();
        Ok(removed)
    }

    async fn stats(&self) -> LecternResult<StorageStats> {
        let inner = self.inner.read().await;
        let size = Self::approximate_size(&inner.records);
        Ok(StorageStats {
            backend: "memory".to_string(),
            vector_count: inner.records.len() as u64,
            size_bytes: Some(size),
            tables: vec![TableInfo {
                name: self.name.clone(),
                size: human_size(size),
                indexes: Vec::new(),
            }],
        })
    }

    fn collection_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, vector: Vec<f32>, filename: &str) -> VectorRecord {
        let mut payload = HashMap::new();
        payload.insert("filename".to_string(), serde_json::json!(filename));
        VectorRecord::new(id, vector, payload)
    }

    async fn store() -> MemoryVectorStore {
        let store = MemoryVectorStore::new(VectorStoreConfig::default());
        store.create_collection(3, DistanceMetric::Cosine).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let store = store().await;
        store
            .insert(vec![
                record("a", vec![1.0, 0.0, 0.0], "a.pdf"),
                record("b", vec![0.0, 1.0, 0.0], "b.pdf"),
                record("c", vec![0.7, 0.7, 0.0], "c.pdf"),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "a");
        assert!((results[0].score - 1.0).abs() < 0.001);
        assert_eq!(results[1].id, "c");
        assert_eq!(results[1].get_string("filename"), Some("c.pdf"));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let store = store().await;
        let err = store
            .insert(vec![record("x", vec![1.0, 0.0], "x.pdf")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("dimension 2"));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_same_id_overwrites() {
        let store = store().await;
        store.insert(vec![record("a", vec![1.0, 0.0, 0.0], "old.pdf")]).await.unwrap();
        store.insert(vec![record("a", vec![0.0, 1.0, 0.0], "new.pdf")]).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let stored = store.get("a").await.unwrap().unwrap();
        assert_eq!(stored.get_string("filename"), Some("new.pdf"));
    }

    #[tokio::test]
    async fn test_clear_and_stats() {
        let store = store().await;
        store
            .insert(vec![
                record("a", vec![1.0, 0.0, 0.0], "a.pdf"),
                record("b", vec![0.0, 1.0, 0.0], "b.pdf"),
            ])
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.backend, "memory");
        assert_eq!(stats.vector_count, 2);
        assert!(stats.size_bytes.unwrap() > 0);
        assert_eq!(stats.tables[0].name, "documents");

        assert_eq!(store.clear().await.unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.search(&[1.0, 0.0, 0.0], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = store().await;
        store.insert(vec![record("a", vec![1.0, 0.0, 0.0], "a.pdf")]).await.unwrap();
        store.delete("a").await.unwrap();
        assert!(store.get("a").await.unwrap().is_none());
    }

    #[test]
    fn test_scores() {
        let sim = MemoryVectorStore::score(DistanceMetric::Cosine, &[1.0, 0.0], &[-1.0, 0.0]);
        assert!((sim + 1.0).abs() < 0.001);

        let near = MemoryVectorStore::score(DistanceMetric::Euclidean, &[0.0, 0.0], &[0.0, 0.0]);
        assert!((near - 1.0).abs() < 0.001);

        let dot = MemoryVectorStore::score(DistanceMetric::DotProduct, &[2.0, 1.0], &[3.0, 4.0]);
        assert!((dot - 10.0).abs() < 0.001);
    }
}
