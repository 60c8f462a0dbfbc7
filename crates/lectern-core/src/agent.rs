//! Tool-calling retrieval agent.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::error::{LecternError, LecternResult};
use crate::index::{DocumentIndex, RetrievedChunk};
use crate::traits::{Llm, Tool, ToolCall, ToolChoice};
use crate::types::Message;

/// Name of the search tool exposed to the model.
pub const SEARCH_TOOL: &str = "document_search";

/// Answers questions over the indexed corpus.
#[async_trait]
pub trait RetrievalAgent: Send + Sync {
    async fn chat(&self, query: &str, system_prompt: &str) -> LecternResult<String>;
}

/// Agent that lets the model call `document_search` before answering.
pub struct ToolAgent {
    llm: Arc<dyn Llm>,
    index: Arc<DocumentIndex>,
    config: AgentConfig,
}

impl ToolAgent {
    pub fn new(llm: Arc<dyn Llm>, index: Arc<DocumentIndex>) -> Self {
        Self {
            llm,
            index,
            config: AgentConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    fn search_tool() -> Tool {
        Tool::new(
            SEARCH_TOOL,
            "Search the uploaded documents (PDF, Word, Excel and images) stored in the vector database. \
             Returns the most relevant passages with their file names.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to look for in the documents"
                    }
                },
                "required": ["query"]
            }),
        )
    }

    async fn run_tool(&self, call: &ToolCall, fallback_query: &str) -> String {
        if call.name != SEARCH_TOOL {
            warn!(tool = %call.name, "Model requested an unknown tool");
            return format!("Unknown tool '{}'", call.name);
        }

        let query = call
            .string_arg("query")
            .filter(|q| !q.trim().is_empty())
            .unwrap_or(fallback_query);

        match self.index.retrieve(query, self.config.top_k).await {
            Ok(chunks) => format_results(&chunks),
            Err(e) => {
                warn!(error = %e, "Document search failed");
                format!("Search failed: {e}")
            }
        }
    }
}

/// Render search hits for the model.
pub fn format_results(chunks: &[RetrievedChunk]) -> String {
    if chunks.is_empty() {
        return "No matching documents found.".to_string();
    }
    chunks
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                "[{}] {} (score {:.3})\n{}",
                i + 1,
                c.filename.as_deref().unwrap_or("unknown file"),
                c.score,
                c.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl RetrievalAgent for ToolAgent {
    async fn chat(&self, query: &str, system_prompt: &str) -> LecternResult<String> {
        if query.trim().is_empty() {
            return Err(LecternError::validation("query must not be empty"));
        }

        let tools = [Self::search_tool()];
        let mut messages = vec![Message::system(system_prompt), Message::user(query)];

        for round in 0..self.config.max_tool_rounds {
            let response = self
                .llm
                .generate_with_tools(&messages, &tools, ToolChoice::Auto, None)
                .await?;

            if response.tool_calls.is_empty() {
                info!(rounds = round, "Agent answered");
                return Ok(response.content_or_empty().to_string());
            }

            debug!(round, calls = response.tool_calls.len(), "Agent requested tools");
            let calls = response.tool_calls.clone();
            messages.push(Message::assistant_tool_calls(
                response.content_or_empty(),
                calls.clone(),
            ));
            for call in &calls {
                let result = self.run_tool(call, query).await;
                messages.push(Message::tool(call.id.clone(), result));
            }
        }

        info!(
            rounds = self.config.max_tool_rounds,
            "Tool round limit reached, requesting final answer"
        );
        let response = self
            .llm
            .generate_with_tools(&messages, &tools, ToolChoice::None, None)
            .await?;
        Ok(response.content_or_empty().to_string())
    }
}
