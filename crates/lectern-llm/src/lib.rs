//! lectern-llm - Chat model providers for lectern.
//!
//! # Supported Providers
//!
//! - **OpenAI** (feature: `openai`) - any chat model with function calling
//!
//! # Example
//!
//! ```ignore
//! use lectern_llm::LlmFactory;
//!
//! let llm = LlmFactory::openai_with_model("gpt-4o-mini")?;
//! ```

mod factory;
#[cfg(feature = "openai")]
mod openai;

pub use factory::LlmFactory;
#[cfg(feature = "openai")]
pub use openai::OpenAIProvider;

// Re-export core types for convenience
pub use lectern_core::config::LlmProvider;
pub use lectern_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse};
