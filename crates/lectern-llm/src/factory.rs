//! Factory for creating LLM providers.

use std::sync::Arc;

use lectern_core::config::{LlmProvider, LlmProviderConfig};
use lectern_core::error::{LecternError, LecternResult};
use lectern_core::traits::{Llm, LlmConfig};

/// Factory for creating LLM providers.
pub struct LlmFactory;

impl LlmFactory {
    /// Create an LLM provider from the given configuration.
    pub fn create(provider: LlmProvider, config: LlmConfig) -> LecternResult<Arc<dyn Llm>> {
        match provider {
            #[cfg(feature = "openai")]
            LlmProvider::OpenAI => {
                let llm = crate::openai::OpenAIProvider::new(config)?;
                Ok(Arc::new(llm))
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

    /// Create a provider from the `llm` section of the configuration.
    pub fn from_config(config: &LlmProviderConfig) -> LecternResult<Arc<dyn Llm>> {
        Self::create(config.provider, config.config.clone())
    }

    /// Create an OpenAI LLM provider with a specific model.
    pub fn openai_with_model(model: impl Into<String>) -> LecternResult<Arc<dyn Llm>> {
        let config = LlmConfig {
            model: model.into(),
            ..Default::default()
        };
        Self::create(LlmProvider::OpenAI, config)
    }
}

#[cfg(all(test, feature = "openai"))]
mod tests {
    use super::*;

    #[test]
    fn test_create_openai_with_key() {
        let config = LlmConfig {
            model: "gpt-4o-mini".into(),
            api_key: Some("sk-test".into()),
            ..Default::default()
        };
        let llm = LlmFactory::create(LlmProvider::OpenAI, config).unwrap();
        assert_eq!(llm.model_name(), "gpt-4o-mini");
        assert!(!llm.is_reasoning_model());
    }
}
