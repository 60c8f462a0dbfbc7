//! Server state management.

use std::sync::Arc;

use lectern_core::agent::RetrievalAgent;
use lectern_core::config::{PromptStore, Prompts};
use lectern_core::index::DocumentIndex;
use lectern_core::ingest::DocumentIngester;
use serde::Serialize;

/// Names of the configured backends, reported by `/health`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServiceInfo {
    pub vector_store: String,
    pub collection: String,
    pub llm_model: String,
    pub vision_model: String,
    pub embedding_model: String,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub prompts: PromptStore,
    pub ingester: Arc<DocumentIngester>,
    pub index: Arc<DocumentIndex>,
    pub agent: Arc<dyn RetrievalAgent>,
    pub info: Arc<ServiceInfo>,
}

impl AppState {
    pub fn new(
        prompts: Prompts,
        ingester: Arc<DocumentIngester>,
        index: Arc<DocumentIndex>,
        agent: Arc<dyn RetrievalAgent>,
        info: ServiceInfo,
    ) -> Self {
        Self {
            prompts: PromptStore::new(prompts),
            ingester,
            index,
            agent,
            info: Arc::new(info),
        }
    }
}
