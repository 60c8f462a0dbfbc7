//! Factory for creating vector store providers.

use std::sync::Arc;

use lectern_core::error::{LecternError, LecternResult};
use lectern_core::traits::{VectorStore, VectorStoreConfig, VectorStoreProvider};

use crate::memory::MemoryVectorStore;

/// Factory for creating vector store providers.
pub struct VectorStoreFactory;

impl VectorStoreFactory {
    /// Create a vector store and make sure its collection exists.
    pub async fn create(config: VectorStoreConfig) -> LecternResult<Arc<dyn VectorStore>> {
        let dims = config.embedding_model_dims;
        let distance = config.distance;

        let store: Arc<dyn VectorStore> = match config.provider {
            VectorStoreProvider::Memory => Arc::new(MemoryVectorStore::new(config)),

            #[cfg(feature = "pgvector")]
            VectorStoreProvider::Pgvector => {
                Arc::new(crate::pgvector::PgVectorStore::new(config).await?)
            }

            #[allow(unreachable_patterns)]
            other => {
                return Err(LecternError::UnsupportedProvider {
                    provider: format!("{other:?} (enable the matching feature)"),
                })
            }
        };

        store.create_collection(dims, distance).await?;
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_memory_store() {
        let config = VectorStoreConfig {
            collection_name: "invoices".into(),
            ..Default::default()
        };
        let store = VectorStoreFactory::create(config).await.unwrap();
        assert_eq!(store.collection_name(), "invoices");
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
