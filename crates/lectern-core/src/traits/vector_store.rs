//! Vector store trait and related types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::LecternResult;

/// Distance metric for vector similarity.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
    DotProduct,
}

/// A vector record with payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Unique identifier.
    pub id: String,
    /// Vector embedding.
    pub vector: Vec<f32>,
    /// Metadata payload.
    pub payload: HashMap<String, serde_json::Value>,
}

impl VectorRecord {
    /// Create a new vector record.
    pub fn new(
        id: impl Into<String>,
        vector: Vec<f32>,
        payload: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            id: id.into(),
            vector,
            payload,
        }
    }

    /// Get a payload value as a string.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }

    /// Get the "data" field (chunk text).
    pub fn get_data(&self) -> Option<&str> {
        self.get_string("data")
    }
}

/// Search result from vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorSearchResult {
    /// Unique identifier.
    pub id: String,
    /// Similarity score, higher is closer.
    pub score: f32,
    /// Metadata payload.
    pub payload: HashMap<String, serde_json::Value>,
}

impl VectorSearchResult {
    /// Get a payload value as a string.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }
}

/// A table (or in-memory collection) and its indexes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableInfo {
    /// Table name.
    pub name: String,
    /// Human readable total size.
    pub size: String,
    /// Index names with their sizes, e.g. `documents_pkey (16 kB)`.
    pub indexes: Vec<String>,
}

/// Storage usage reported by a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageStats {
    /// Backend identifier, e.g. `pgvector`.
    pub backend: String,
    /// Number of stored vectors in the active collection.
    pub vector_count: u64,
    /// Total size in bytes, when the backend can report it.
    pub size_bytes: Option<u64>,
    /// Tables visible to the backend.
    pub tables: Vec<TableInfo>,
}

/// Core VectorStore trait - all vector store backends implement this.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if it does not exist.
    async fn create_collection(&self, dimension: usize, distance: DistanceMetric)
        -> LecternResult<()>;

    /// Insert vectors into the collection.
    async fn insert(&self, records: Vec<VectorRecord>) -> LecternResult<()>;

    /// Search for similar vectors.
    async fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> LecternResult<Vec<VectorSearchResult>>;

    /// Get a vector by ID.
    async fn get(&self, id: &str) -> LecternResult<Option<VectorRecord>>;

    /// Delete a vector by ID.
    async fn delete(&self, id: &str) -> LecternResult<()>;

    /// Number of vectors in the collection.
    async fn count(&self) -> LecternResult<u64>;

    /// Delete every vector, keeping the collection itself.
    async fn clear(&self) -> LecternResult<u64>;

    /// Storage usage and table listing.
    async fn stats(&self) -> LecternResult<StorageStats>;

    /// Get the collection name.
    fn collection_name(&self) -> &str;
}

/// Vector store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// Provider type.
    pub provider: VectorStoreProvider,
    /// Collection (table) name.
    pub collection_name: String,
    /// Embedding dimensions.
    #[serde(default = "default_embedding_dims")]
    pub embedding_model_dims: usize,
    /// Distance metric used for search.
    #[serde(default)]
    pub distance: DistanceMetric,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: serde_json::Value,
}

fn default_embedding_dims() -> usize {
    1536
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            provider: VectorStoreProvider::Memory,
            collection_name: "documents".to_string(),
            embedding_model_dims: default_embedding_dims(),
            distance: DistanceMetric::Cosine,
            config: serde_json::json!({}),
        }
    }
}

/// Vector store provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VectorStoreProvider {
    #[default]
    Memory,
    Pgvector,
}

impl VectorStoreProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Pgvector => "pgvector",
        }
    }
}

impl std::str::FromStr for VectorStoreProvider {
    type Err = crate::error::LecternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "in_memory" => Ok(Self::Memory),
            "pgvector" | "postgres" | "postgresql" => Ok(Self::Pgvector),
            other => Err(crate::error::LecternError::UnsupportedProvider {
                provider: other.to_string(),
            }),
        }
    }
}
