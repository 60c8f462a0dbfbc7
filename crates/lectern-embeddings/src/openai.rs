//! OpenAI embedding provider implementation.

use async_trait::async_trait;
use tracing::debug;

use lectern_core::error::{ErrorCode, LecternError, LecternResult};
use lectern_core::traits::{Embedder, EmbedderConfig};

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{CreateEmbeddingRequest, EmbeddingInput},
    Client,
};

/// Inputs sent per embeddings request.
const MAX_BATCH: usize = 256;

/// OpenAI embedding provider.
pub struct OpenAIEmbedder {
    client: Client<OpenAIConfig>,
    config: EmbedderConfig,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder.
    pub fn new(config: EmbedderConfig) -> LecternResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                LecternError::Configuration("OpenAI API key not found. Set OPENAI_API_KEY environment variable or provide api_key in config.".to_string())
            })?;

        let openai_config = if let Some(ref base_url) = config.base_url {
            OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(base_url)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Ok(Self {
            client: Client::with_config(openai_config),
            config,
        })
    }

    fn request(&self, input: EmbeddingInput) -> CreateEmbeddingRequest {
        // Only the text-embedding-3 family accepts a dimensions override.
        let dimensions = self
            .config
            .model
            .starts_with("text-embedding-3")
            .then_some(self.config.embedding_dims as u32);

        CreateEmbeddingRequest {
            model: self.config.model.clone(),
            input,
            dimensions,
            ..Default::default()
        }
    }

    async fn create(&self, input: EmbeddingInput) -> LecternResult<Vec<Vec<f32>>> {
        let response = self
            .client
            .embeddings()
            .create(self.request(input))
            .await
            .map_err(classify)?;

        let mut data = response.data;
        data.sort_by_key(|e| e.index);
        Ok(data.into_iter().map(|e| e.embedding).collect())
    }
}

fn classify(err: OpenAIError) -> LecternError {
    let code = match &err {
        OpenAIError::Reqwest(_) => ErrorCode::EmbConnectionFailed,
        _ => ErrorCode::EmbGenerationFailed,
    };
    LecternError::Embedding {
        message: format!("OpenAI embedding error: {err}"),
        code,
        source: Some(Box::new(err)),
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> LecternResult<Vec<f32>> {
        self.create(EmbeddingInput::String(text.to_string()))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LecternError::embedding("No embedding returned"))
    }

    async fn embed_batch(&self, texts: &[String]) -> LecternResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH) {
            let vectors = self.create(EmbeddingInput::StringArray(batch.to_vec())).await?;
            if vectors.len() != batch.len() {
                return Err(LecternError::embedding(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            embeddings.extend(vectors);
        }
        debug!(model = %self.config.model, count = embeddings.len(), "Embedded batch");
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.config.embedding_dims
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedder(model: &str) -> OpenAIEmbedder {
        OpenAIEmbedder::new(EmbedderConfig {
            model: model.into(),
            api_key: Some("sk-test".into()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_dimensions_only_for_v3_models() {
        let request = embedder("text-embedding-3-small").request(EmbeddingInput::String("a".into()));
        assert_eq!(request.dimensions, Some(1536));

        let request = embedder("text-embedding-ada-002").request(EmbeddingInput::String("a".into()));
        assert_eq!(request.dimensions, None);
    }

    #[test]
    fn test_dimension_and_name() {
        let e = embedder("text-embedding-3-small");
        assert_eq!(e.dimension(), 1536);
        assert_eq!(e.model_name(), "text-embedding-3-small");
    }
}
