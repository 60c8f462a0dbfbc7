//! Process-wide prompt settings.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Default instruction sent with every image transcription.
pub const DEFAULT_INSTRUCTION_PROMPT: &str =
    "Split the image content into items and their data and output them";

/// Default system prompt for the retrieval agent.
pub const DEFAULT_SYSTEM_PROMPT: &str = "Answer in table format";

/// Prompts used by extraction and question answering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Prompts {
    /// Instruction given to the vision model for each image.
    pub instruction_prompt: String,
    /// System prompt given to the retrieval agent.
    pub system_prompt: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            instruction_prompt: DEFAULT_INSTRUCTION_PROMPT.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Partial update of [`Prompts`]. Missing fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptsUpdate {
    pub instruction_prompt: Option<String>,
    pub system_prompt: Option<String>,
}

impl PromptsUpdate {
    fn is_empty(&self) -> bool {
        self.instruction_prompt.is_none() && self.system_prompt.is_none()
    }
}

/// Shared, mutable prompt settings.
///
/// Readers take a copy at call time; an in-flight extraction keeps the
/// prompt it started with. Concurrent writers: last write wins.
#[derive(Debug, Clone, Default)]
pub struct PromptStore {
    inner: Arc<RwLock<Prompts>>,
}

impl PromptStore {
    pub fn new(prompts: Prompts) -> Self {
        Self {
            inner: Arc::new(RwLock::new(prompts)),
        }
    }

    /// Copy of the current prompts.
    pub async fn snapshot(&self) -> Prompts {
        self.inner.read().await.clone()
    }

    /// Apply a partial update and return the resulting prompts.
    ///
    /// Blank values are rejected so extraction always has an instruction.
    pub async fn update(&self, update: PromptsUpdate) -> crate::error::LecternResult<Prompts> {
        for (field, value) in [
            ("instruction_prompt", &update.instruction_prompt),
            ("system_prompt", &update.system_prompt),
        ] {
            if matches!(value, Some(v) if v.trim().is_empty()) {
                return Err(crate::error::LecternError::validation(format!(
                    "{field} must not be blank"
                )));
            }
        }

        let mut prompts = self.inner.write().await;
        if update.is_empty() {
            return Ok(prompts.clone());
        }
        if let Some(instruction) = update.instruction_prompt {
            prompts.instruction_prompt = instruction;
        }
        if let Some(system) = update.system_prompt {
            prompts.system_prompt = system;
        }
        tracing::info!("Prompt settings updated");
        Ok(prompts.clone())
    }
}
