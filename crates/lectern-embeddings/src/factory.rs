//! Factory for creating embedding providers.

use std::sync::Arc;

use lectern_core::config::EmbedderProviderConfig;
use lectern_core::error::{LecternError, LecternResult};
use lectern_core::traits::{Embedder, EmbedderConfig, EmbedderProvider};

/// Factory for creating embedding providers.
pub struct EmbedderFactory;

impl EmbedderFactory {
    /// Create an embedder from the given configuration.
    pub fn create(
        provider: EmbedderProvider,
        config: EmbedderConfig,
    ) -> LecternResult<Arc<dyn Embedder>> {
        match provider {
            #[cfg(feature = "openai")]
            EmbedderProvider::OpenAI => {
                let embedder = crate::openai::OpenAIEmbedder::new(config)?;
                Ok(Arc::new(embedder))
            }
            #[allow(unreachable_patterns)]
            _ => {
                let _ = config;
                Err(LecternError::UnsupportedProvider {
                    provider: format!("{:?}", provider),
                })
            }
        }
    }

    /// Create an embedder from the `embedder` section of the configuration.
    pub fn from_config(config: &EmbedderProviderConfig) -> LecternResult<Arc<dyn Embedder>> {
        Self::create(config.provider, config.config.clone())
    }

    /// Create an OpenAI embedder with a specific model.
    pub fn openai_with_model(
        model: impl Into<String>,
        dims: usize,
    ) -> LecternResult<Arc<dyn Embedder>> {
        let config = EmbedderConfig {
            model: model.into(),
            embedding_dims: dims,
            ..Default::default()
        };
        Self::create(EmbedderProvider::OpenAI, config)
    }
}
