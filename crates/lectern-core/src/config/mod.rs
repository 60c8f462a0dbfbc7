//! Configuration system for lectern.

mod prompts;

pub use prompts::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use lectern_extractors::{ExtractorSettings, VisionConfig};

use crate::error::{LecternError, LecternResult};
use crate::traits::{EmbedderConfig, EmbedderProvider, LlmConfig, VectorStoreConfig};

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAI,
}

/// Provider configuration with type.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmProviderConfig {
    /// Provider type.
    pub provider: LlmProvider,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: LlmConfig,
}

/// Embedder provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EmbedderProviderConfig {
    /// Provider type.
    pub provider: EmbedderProvider,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: EmbedderConfig,
}

/// Vision model used for image transcription.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for VisionSettings {
    fn default() -> Self {
        let defaults = VisionConfig::default();
        Self {
            model: defaults.model,
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
            timeout_secs: lectern_extractors::transcriber::DEFAULT_TIMEOUT.as_secs(),
            api_key: None,
            base_url: None,
        }
    }
}

impl VisionSettings {
    /// Client configuration for [`lectern_extractors::OpenAiVision`].
    pub fn to_vision_config(&self) -> VisionConfig {
        VisionConfig {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            ..VisionConfig::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Extraction tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Render resolution for scanned PDF pages.
    pub dpi: u32,
    /// Page transcriptions in flight at once.
    pub max_concurrent_transcriptions: usize,
    /// Directory holding libpdfium.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdfium_library_dir: Option<PathBuf>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        let defaults = ExtractorSettings::default();
        Self {
            dpi: defaults.dpi,
            max_concurrent_transcriptions: defaults.max_concurrent_transcriptions,
            pdfium_library_dir: None,
        }
    }
}

impl ExtractionConfig {
    pub fn to_settings(&self) -> ExtractorSettings {
        ExtractorSettings {
            dpi: self.dpi,
            max_concurrent_transcriptions: self.max_concurrent_transcriptions,
            pdfium_library_dir: self.pdfium_library_dir.clone(),
        }
    }
}

/// Chunking of extracted text before embedding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between neighbouring chunks.
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 128,
        }
    }
}

/// Retrieval agent behaviour.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Tool-call rounds before a final answer is forced.
    pub max_tool_rounds: usize,
    /// Chunks returned per search.
    pub top_k: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 3,
            top_k: 5,
        }
    }
}

/// HTTP listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Main lectern configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LecternConfig {
    /// Chat model used by the retrieval agent.
    pub llm: LlmProviderConfig,
    /// Embedding model.
    pub embedder: EmbedderProviderConfig,
    /// Vector store configuration.
    pub vector_store: VectorStoreConfig,
    /// Vision model used for transcription.
    pub vision: VisionSettings,
    pub extraction: ExtractionConfig,
    pub splitter: SplitterConfig,
    pub agent: AgentConfig,
    pub prompts: Prompts,
    pub server: ServerConfig,
}

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl LecternConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> LecternResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| LecternError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| LecternError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| LecternError::Configuration(e.to_string())),
            _ => Err(LecternError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> LecternResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load from `LECTERN_CONFIG` when set, then apply environment overrides.
    pub fn load() -> LecternResult<Self> {
        let mut config = match env("LECTERN_CONFIG") {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from environment variables that are set.
    pub fn apply_env(&mut self) -> LecternResult<()> {
        if let Some(api_key) = env("OPENAI_API_KEY") {
            self.llm.config.api_key = Some(api_key.clone());
            self.embedder.config.api_key = Some(api_key.clone());
            self.vision.api_key = Some(api_key);
        }
        if let Some(model) = env("LECTERN_LLM_MODEL") {
            self.llm.config.model = model;
        }
        if let Some(model) = env("LECTERN_VISION_MODEL") {
            self.vision.model = model;
        }
        if let Some(model) = env("LECTERN_EMBEDDING_MODEL") {
            self.embedder.config.model = model;
        }

        if let Some(provider) = env("LECTERN_VECTOR_STORE") {
            self.vector_store.provider = provider.parse()?;
        }
        if let Some(table) = env("LECTERN_TABLE") {
            self.vector_store.collection_name = table;
        }
        self.apply_postgres_env()?;

        if let Some(prompt) = env("CUSTOM_PROMPT") {
            self.prompts.instruction_prompt = prompt;
        }
        if let Some(prompt) = env("SYSTEM_PROMPT") {
            self.prompts.system_prompt = prompt;
        }

        if let Some(host) = env("LECTERN_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env("LECTERN_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| LecternError::Configuration(format!("invalid LECTERN_PORT: {port}")))?;
        }

        Ok(())
    }

    fn apply_postgres_env(&mut self) -> LecternResult<()> {
        if !self.vector_store.config.is_object() {
            self.vector_store.config = serde_json::json!({});
        }
        let Some(map) = self.vector_store.config.as_object_mut() else {
            return Err(LecternError::Internal("vector store config is not a map".into()));
        };

        for (var, key) in [
            ("PG_HOST", "host"),
            ("PG_DATABASE", "database"),
            ("PG_USER", "user"),
            ("PG_PASSWORD", "password"),
        ] {
            if let Some(value) = env(var) {
                map.insert(key.to_string(), serde_json::Value::String(value));
            }
        }
        if let Some(port) = env("PG_PORT") {
            let port: u16 = port
                .parse()
                .map_err(|_| LecternError::Configuration(format!("invalid PG_PORT: {port}")))?;
            map.insert("port".to_string(), port.into());
        }
        Ok(())
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> LecternConfigBuilder {
        LecternConfigBuilder::default()
    }
}

/// Builder for LecternConfig.
#[derive(Default)]
pub struct LecternConfigBuilder {
    config: LecternConfig,
}

impl LecternConfigBuilder {
    /// Set vector store configuration.
    pub fn vector_store(mut self, config: VectorStoreConfig) -> Self {
        self.config.vector_store = config;
        self
    }

    /// Set LLM configuration.
    pub fn llm(mut self, config: LlmProviderConfig) -> Self {
        self.config.llm = config;
        self
    }

    /// Set embedder configuration.
    pub fn embedder(mut self, config: EmbedderProviderConfig) -> Self {
        self.config.embedder = config;
        self
    }

    /// Set vision model configuration.
    pub fn vision(mut self, config: VisionSettings) -> Self {
        self.config.vision = config;
        self
    }

    pub fn extraction(mut self, config: ExtractionConfig) -> Self {
        self.config.extraction = config;
        self
    }

    pub fn splitter(mut self, config: SplitterConfig) -> Self {
        self.config.splitter = config;
        self
    }

    pub fn agent(mut self, config: AgentConfig) -> Self {
        self.config.agent = config;
        self
    }

    /// Set the image instruction prompt.
    pub fn instruction_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompts.instruction_prompt = prompt.into();
        self
    }

    /// Set the agent system prompt.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompts.system_prompt = prompt.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> LecternConfig {
        self.config
    }
}
