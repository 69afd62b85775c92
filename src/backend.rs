//! Document QA backend abstraction
//!
//! The controller sees the backend as two opaque remote operations (ingest a
//! document, exchange a message) plus a health probe for the front end.

mod document;
mod error;
mod http;
mod types;

pub use document::{Document, ALLOWED_EXTENSIONS};
pub use error::{ClientError, ErrorKind, Operation};
pub use http::HttpBackend;
pub use types::{ChatRequest, ChatResponse, HealthResponse, UploadResponse};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Remote operations consumed by the session controller
#[async_trait]
pub trait Backend: Send + Sync {
    /// `POST /api/documents/upload`
    async fn upload_document(&self, document: &Document) -> Result<UploadResponse, ClientError>;

    /// `POST /api/chat/`
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError>;

    /// `GET /api/health`
    async fn health(&self) -> Result<HealthResponse, ClientError>;
}

#[async_trait]
impl<T: Backend + ?Sized> Backend for Arc<T> {
    async fn upload_document(&self, document: &Document) -> Result<UploadResponse, ClientError> {
        (**self).upload_document(document).await
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        (**self).chat(request).await
    }

    async fn health(&self) -> Result<HealthResponse, ClientError> {
        (**self).health().await
    }
}

/// Logging wrapper for backends
pub struct LoggingBackend {
    inner: Arc<dyn Backend>,
}

impl LoggingBackend {
    pub fn new(inner: Arc<dyn Backend>) -> Self {
        Self { inner }
    }
}

fn log_outcome<T>(
    operation: Operation,
    request_id: Uuid,
    started: Instant,
    result: &Result<T, ClientError>,
) {
    let duration_ms = started.elapsed().as_millis();
    match result {
        Ok(_) => {
            tracing::info!(
                operation = operation.as_str(),
                %request_id,
                duration_ms = %duration_ms,
                "Backend request completed"
            );
        }
        Err(e) => {
            tracing::error!(
                operation = operation.as_str(),
                %request_id,
                duration_ms = %duration_ms,
                kind = ?e.kind,
                status = ?e.status,
                error = %e.message,
                "Backend request failed"
            );
        }
    }
}

#[async_trait]
impl Backend for LoggingBackend {
    async fn upload_document(&self, document: &Document) -> Result<UploadResponse, ClientError> {
        let request_id = Uuid::new_v4();
        tracing::debug!(
            %request_id,
            filename = %document.filename,
            bytes = document.content.len(),
            "Uploading document"
        );
        let started = Instant::now();
        let result = self.inner.upload_document(document).await;
        log_outcome(Operation::Upload, request_id, started, &result);
        result
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        let request_id = Uuid::new_v4();
        tracing::debug!(
            %request_id,
            conversation_id = ?request.conversation_id,
            "Sending chat message"
        );
        let started = Instant::now();
        let result = self.inner.chat(request).await;
        if let Ok(response) = &result {
            tracing::debug!(%request_id, sources = response.source_count(), "Chat reply received");
        }
        log_outcome(Operation::Chat, request_id, started, &result);
        result
    }

    async fn health(&self) -> Result<HealthResponse, ClientError> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();
        let result = self.inner.health().await;
        log_outcome(Operation::Health, request_id, started, &result);
        result
    }
}
