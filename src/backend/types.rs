//! Wire types for the document QA backend

use serde::{Deserialize, Serialize};

/// Body of `POST /api/chat/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Absent on the first call of a session; sent as `null`
    pub conversation_id: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, conversation_id: Option<String>) -> Self {
        Self {
            message: message.into(),
            conversation_id,
        }
    }
}

/// Successful reply from `POST /api/chat/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub conversation_id: String,
    /// Source chunks the answer was drawn from
    #[serde(default)]
    pub sources: Option<Vec<String>>,
}

impl ChatResponse {
    #[allow(dead_code)] // Used in tests
    pub fn new(response: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            conversation_id: conversation_id.into(),
            sources: None,
        }
    }

    pub fn source_count(&self) -> usize {
        self.sources.as_ref().map_or(0, Vec::len)
    }
}

/// Successful reply from `POST /api/documents/upload`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub document_id: Option<String>,
}

impl UploadResponse {
    #[allow(dead_code)] // Used in tests
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            message: None,
            document_id: None,
        }
    }
}

/// Reply from `GET /api/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
