//! Documents handed to the ingestion sink.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata key that always carries the upload's original filename.
pub const FILENAME_KEY: &str = "filename";

/// A block of extracted text with metadata, ready for indexing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier, shared by every chunk of the document.
    pub id: String,
    /// Document text.
    pub text: String,
    /// Metadata copied into every chunk payload.
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Document {
    /// Create a document for an uploaded file.
    pub fn new(text: impl Into<String>, filename: impl Into<String>) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert(
            FILENAME_KEY.to_string(),
            serde_json::Value::String(filename.into()),
        );
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            metadata,
        }
    }

    /// Add a metadata entry.
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The original filename.
    pub fn filename(&self) -> Option<&str> {
        self.metadata.get(FILENAME_KEY).and_then(|v| v.as_str())
    }
}
