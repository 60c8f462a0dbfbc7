//! Wires configured providers into an [`AppState`].

use std::sync::Arc;

use tracing::info;

use lectern_core::agent::ToolAgent;
use lectern_core::config::LecternConfig;
use lectern_core::error::{LecternError, LecternResult};
use lectern_core::index::DocumentIndex;
use lectern_core::ingest::DocumentIngester;
use lectern_core::splitter::TextSplitter;
use lectern_embeddings::EmbedderFactory;
use lectern_extractors::{ExtractionPipeline, OpenAiVision, VisionTranscriber};
use lectern_llm::LlmFactory;
use lectern_vector_stores::VectorStoreFactory;

use crate::state::{AppState, ServiceInfo};

/// Build every provider named in `config` and assemble the server state.
pub async fn create_state(config: &LecternConfig) -> LecternResult<AppState> {
    let vision = OpenAiVision::new(config.vision.to_vision_config())
        .map_err(|e| LecternError::Configuration(format!("vision model: {e}")))?;
    let transcriber =
        Arc::new(VisionTranscriber::new(Arc::new(vision)).with_timeout(config.vision.timeout()));
    let pipeline = Arc::new(ExtractionPipeline::with_settings(
        transcriber,
        &config.extraction.to_settings(),
    ));

    let embedder = EmbedderFactory::from_config(&config.embedder)?;

    // The table's vector column must match what the embedder produces.
    let mut store_config = config.vector_store.clone();
    store_config.embedding_model_dims = embedder.dimension();
    let store = VectorStoreFactory::create(store_config).await?;

    let index = Arc::new(
        DocumentIndex::new(embedder.clone(), store.clone())
            .with_splitter(TextSplitter::from_config(&config.splitter)),
    );

    let llm = LlmFactory::from_config(&config.llm)?;
    let agent = Arc::new(ToolAgent::new(llm.clone(), index.clone()).with_config(config.agent));
    let ingester = Arc::new(DocumentIngester::new(pipeline, index.clone()));

    let service = ServiceInfo {
        vector_store: config.vector_store.provider.as_str().to_string(),
        collection: store.collection_name().to_string(),
        llm_model: llm.model_name().to_string(),
        vision_model: config.vision.model.clone(),
        embedding_model: embedder.model_name().to_string(),
    };
    info!(
        store = %service.vector_store,
        collection = %service.collection,
        llm = %service.llm_model,
        vision = %service.vision_model,
        embedder = %service.embedding_model,
        "Providers ready"
    );

    Ok(AppState::new(
        config.prompts.clone(),
        ingester,
        index,
        agent,
        service,
    ))
}
