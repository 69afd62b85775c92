//! HTTP implementation of the backend over reqwest

use super::{
    Backend, ChatRequest, ChatResponse, ClientError, Document, HealthResponse, Operation,
    UploadResponse,
};
use crate::config::ClientConfig;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

const UPLOAD_PATH: &str = "/api/documents/upload";
const CHAT_PATH: &str = "/api/chat/";
const HEALTH_PATH: &str = "/api/health";

/// Backend reached over HTTP at a fixed origin
pub struct HttpBackend {
    client: Client,
    config: ClientConfig,
}

impl HttpBackend {
    pub fn new(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    fn classify(&self, operation: Operation, err: &reqwest::Error) -> ClientError {
        ClientError::from_reqwest(operation, &self.config.base_url, err)
    }

    /// Turn a response into `T`, classifying non-success statuses
    async fn decode<T: DeserializeOwned>(
        &self,
        operation: Operation,
        response: Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            // The status alone classifies the failure; a broken body only
            // loses the detail
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) if e.is_timeout() => return Err(ClientError::timeout(operation)),
                Err(e) => {
                    tracing::debug!(error = %e, status = status.as_u16(), "Unreadable error body");
                    String::new()
                }
            };
            return Err(ClientError::server(operation, status.as_u16(), &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.classify(operation, &e))?;

        serde_json::from_str(&body)
            .map_err(|e| ClientError::unknown(format!("Failed to parse {} response: {e}", operation.as_str())))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn upload_document(&self, document: &Document) -> Result<UploadResponse, ClientError> {
        let operation = Operation::Upload;
        let part = Part::bytes(document.content.clone())
            .file_name(document.filename.clone())
            .mime_str(&document.mime_type())
            .map_err(|e| self.classify(operation, &e))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.url(UPLOAD_PATH))
            .multipart(form)
            .timeout(self.config.timeout_for(operation))
            .send()
            .await
            .map_err(|e| self.classify(operation, &e))?;

        self.decode(operation, response).await
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        let operation = Operation::Chat;
        let response = self
            .client
            .post(self.url(CHAT_PATH))
            .json(request)
            .timeout(self.config.timeout_for(operation))
            .send()
            .await
            .map_err(|e| self.classify(operation, &e))?;

        self.decode(operation, response).await
    }

    async fn health(&self) -> Result<HealthResponse, ClientError> {
        let operation = Operation::Health;
        let response = self
            .client
            .get(self.url(HEALTH_PATH))
            .timeout(self.config.timeout_for(operation))
            .send()
            .await
            .map_err(|e| self.classify(operation, &e))?;

        self.decode(operation, response).await
    }
}
