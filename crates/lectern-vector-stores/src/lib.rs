//! lectern-vector-stores - Vector store implementations for lectern.
//!
//! # Supported Backends
//!
//! - **Memory** (always built) - brute-force search in process memory
//! - **pgvector** (feature: `pgvector`, default) - PostgreSQL with pgvector extension

mod factory;
mod memory;

#[cfg(feature = "pgvector")]
mod pgvector;

pub use factory::VectorStoreFactory;
pub use memory::MemoryVectorStore;

#[cfg(feature = "pgvector")]
pub use pgvector::{PgConnection, PgVectorStore};

// Re-export core types for convenience
pub use lectern_core::traits::{
    DistanceMetric, StorageStats, TableInfo, VectorRecord, VectorSearchResult, VectorStore,
    VectorStoreConfig, VectorStoreProvider,
};
