//! lectern-core - Core library for lectern.
//!
//! Provides the error hierarchy, configuration, provider traits, and the
//! ingestion and retrieval halves of the document question-answering flow.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lectern_core::{DocumentIndex, DocumentIngester, ToolAgent, RetrievalAgent, Prompts};
//!
//! let index = Arc::new(DocumentIndex::new(embedder, store));
//! let ingester = DocumentIngester::new(pipeline, index.clone());
//! let outcome = ingester.ingest_upload(upload, &Prompts::default()).await?;
//!
//! let agent = ToolAgent::new(llm, index);
//! let answer = agent.chat("What is the invoice total?", "Answer in table format").await?;
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod index;
pub mod ingest;
pub mod size;
pub mod splitter;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use agent::{RetrievalAgent, ToolAgent};
pub use config::{LecternConfig, PromptStore, Prompts, PromptsUpdate};
pub use error::{ErrorCode, LecternError, LecternResult};
pub use index::{DocumentIndex, IngestionSink, RetrievedChunk};
pub use ingest::{DocumentIngester, IngestOutcome};
pub use size::human_size;
pub use splitter::{Chunk, TextSplitter};
pub use traits::{
    Embedder, EmbedderConfig, Llm, LlmConfig, StorageStats, VectorStore, VectorStoreConfig,
};
pub use types::{Document, Message, MessageRole};
