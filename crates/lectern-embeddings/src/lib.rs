//! lectern-embeddings - Embedding providers for lectern.
//!
//! # Example
//!
//! ```ignore
//! use lectern_embeddings::EmbedderFactory;
//!
//! let embedder = EmbedderFactory::openai_with_model("text-embedding-3-small", 1536)?;
//! let vector = embedder.embed("Invoice No. 123").await?;
//! ```

mod factory;
#[cfg(feature = "openai")]
mod openai;

pub use factory::EmbedderFactory;
#[cfg(feature = "openai")]
pub use openai::OpenAIEmbedder;

// Re-export core types for convenience
pub use lectern_core::traits::{Embedder, EmbedderConfig, EmbedderProvider};
