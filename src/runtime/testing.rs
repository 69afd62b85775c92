//! Mock implementations for testing
//!
//! These mocks enable driving the runtime end to end without real I/O.

use super::{start, SessionEvent, SessionHandle};
use crate::backend::{
    Backend, ChatRequest, ChatResponse, ClientError, Document, HealthResponse, UploadResponse,
};
use crate::config::ClientConfig;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

pub const TEST_BASE_URL: &str = "http://localhost:8000";

// ============================================================================
// Mock Backend
// ============================================================================

/// Mock backend that returns queued results and records every call
#[derive(Default)]
pub struct MockBackend {
    chat_results: Mutex<VecDeque<Result<ChatResponse, ClientError>>>,
    upload_results: Mutex<VecDeque<Result<UploadResponse, ClientError>>>,
    /// Record of all chat requests made
    pub chat_requests: Mutex<Vec<ChatRequest>>,
    /// Record of all documents uploaded
    pub uploads: Mutex<Vec<Document>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_chat(&self, response: ChatResponse) {
        self.chat_results.lock().unwrap().push_back(Ok(response));
    }

    pub fn queue_chat_error(&self, error: ClientError) {
        self.chat_results.lock().unwrap().push_back(Err(error));
    }

    pub fn queue_upload(&self, response: UploadResponse) {
        self.upload_results.lock().unwrap().push_back(Ok(response));
    }

    pub fn queue_upload_error(&self, error: ClientError) {
        self.upload_results.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_chat_requests(&self) -> Vec<ChatRequest> {
        self.chat_requests.lock().unwrap().clone()
    }

    pub fn recorded_uploads(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.filename.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.chat_requests.lock().unwrap().len() + self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn upload_document(&self, document: &Document) -> Result<UploadResponse, ClientError> {
        self.uploads.lock().unwrap().push(document.clone());
        self.upload_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::unreachable(TEST_BASE_URL)))
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        self.chat_requests.lock().unwrap().push(request.clone());
        self.chat_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::unreachable(TEST_BASE_URL)))
    }

    async fn health(&self) -> Result<HealthResponse, ClientError> {
        Ok(HealthResponse {
            status: "healthy".to_string(),
        })
    }
}

// ============================================================================
// Delayed Mock Backend (for timeout and overlap testing)
// ============================================================================

/// Mock backend that sleeps before answering and tracks concurrency
pub struct DelayedMockBackend {
    pub inner: MockBackend,
    delay: Duration,
    in_flight: AtomicUsize,
    /// Highest number of calls ever in flight at once
    pub max_in_flight: AtomicUsize,
    /// Notified when a call starts (for test synchronization)
    pub request_started: Arc<Notify>,
}

impl DelayedMockBackend {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MockBackend::new(),
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            request_started: Arc::new(Notify::new()),
        }
    }

    async fn delayed<T>(&self, call: impl std::future::Future<Output = T>) -> T {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.request_started.notify_one();
        tokio::time::sleep(self.delay).await;
        let result = call.await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl Backend for DelayedMockBackend {
    async fn upload_document(&self, document: &Document) -> Result<UploadResponse, ClientError> {
        self.delayed(self.inner.upload_document(document)).await
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        self.delayed(self.inner.chat(request)).await
    }

    async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.inner.health().await
    }
}

/// Backend whose calls panic mid-flight
pub struct PanickingBackend;

#[async_trait]
impl Backend for PanickingBackend {
    async fn upload_document(&self, _document: &Document) -> Result<UploadResponse, ClientError> {
        panic!("upload exploded");
    }

    async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        panic!("chat exploded");
    }

    async fn health(&self) -> Result<HealthResponse, ClientError> {
        panic!("health exploded");
    }
}

// ============================================================================
// Test Session Builder
// ============================================================================

/// Helper for building test sessions with minimal boilerplate
pub struct TestSession<B: Backend + 'static> {
    pub handle: SessionHandle,
    pub backend: Arc<B>,
    pub events: broadcast::Receiver<SessionEvent>,
}

pub struct TestSessionBuilder {
    config: ClientConfig,
}

impl TestSession<MockBackend> {
    pub fn new() -> TestSessionBuilder {
        TestSessionBuilder::new()
    }
}

impl TestSessionBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default().with_base_url(TEST_BASE_URL),
        }
    }

    pub fn timeouts(mut self, upload: Duration, chat: Duration) -> Self {
        self.config = self.config.with_timeouts(upload, chat);
        self
    }

    pub fn build<B: Backend + 'static>(self, backend: B) -> TestSession<B> {
        let backend = Arc::new(backend);
        let handle = start(self.config, backend.clone());
        let events = handle.subscribe();
        TestSession {
            handle,
            backend,
            events,
        }
    }
}

impl Default for TestSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend + 'static> TestSession<B> {
    /// Wait for the session to go idle, failing the test after `timeout`
    pub async fn settle(&self, timeout: Duration) -> crate::session::ConversationSession {
        tokio::time::timeout(timeout, self.handle.wait_until_idle())
            .await
            .expect("session did not settle in time")
            .expect("runtime stopped")
    }

    /// Drain notifications until the session reports idle again
    pub async fn events_until_idle(&mut self, timeout: Duration) -> Vec<SessionEvent> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut seen = Vec::new();
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.events.recv()).await {
                Ok(Ok(event)) => {
                    let done = matches!(
                        event,
                        SessionEvent::BusyChanged { busy } if busy.is_idle()
                    );
                    seen.push(event);
                    if done {
                        break;
                    }
                }
                _ => continue,
            }
        }
        seen
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ErrorKind, Operation};
    use crate::runtime::RuntimeError;
    use crate::session::{BusyState, Role};
    use crate::state_machine::TransitionError;

    const SETTLE: Duration = Duration::from_secs(2);

    fn pdf(name: &str) -> Document {
        Document::new(name, b"%PDF-1.7".to_vec())
    }

    #[tokio::test]
    async fn test_mock_backend_queue() {
        let mock = MockBackend::new();
        mock.queue_chat(ChatResponse::new("Hello", "abc"));

        let response = mock.chat(&ChatRequest::new("hi", None)).await.unwrap();
        assert_eq!(response.response, "Hello");

        // Second call should fail (no more responses)
        let err = mock.chat(&ChatRequest::new("hi", None)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NetworkUnreachable);
        assert_eq!(mock.recorded_chat_requests().len(), 2);
    }

    /// Upload, ask, ask again: the bound id rides along on later calls
    #[tokio::test]
    async fn test_upload_then_ask() {
        let backend = MockBackend::new();
        backend.queue_upload(UploadResponse::new("contract.pdf"));
        backend.queue_chat(ChatResponse::new("Either party may terminate with notice.", "abc123"));
        backend.queue_chat(ChatResponse::new("Thirty days.", "abc123"));
        let rt = TestSession::new().build(backend);

        let busy = rt.handle.upload_document(pdf("contract.pdf")).await.unwrap();
        assert_eq!(busy, BusyState::Uploading);
        let session = rt.settle(SETTLE).await;
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::Assistant);
        assert!(session.messages()[0].content.contains("\"contract.pdf\""));

        rt.handle.send_message("What is the termination clause?").await.unwrap();
        let session = rt.settle(SETTLE).await;
        assert_eq!(session.messages().len(), 3);
        assert_eq!(session.messages()[1].role, Role::User);
        assert_eq!(session.messages()[1].content, "What is the termination clause?");
        assert_eq!(session.messages()[2].role, Role::Assistant);
        assert_eq!(session.id(), Some("abc123"));

        rt.handle.send_message("How much notice?").await.unwrap();
        rt.settle(SETTLE).await;

        let requests = rt.backend.recorded_chat_requests();
        assert_eq!(requests[0].conversation_id, None);
        assert_eq!(requests[1].conversation_id.as_deref(), Some("abc123"));
        assert_eq!(rt.backend.recorded_uploads(), vec!["contract.pdf"]);
    }

    #[tokio::test]
    async fn test_unsupported_upload_is_rejected_locally() {
        let mut rt = TestSession::new().build(MockBackend::new());

        let result = rt.handle.upload_document(Document::new("report.txt", b"hi".to_vec())).await;
        assert!(matches!(
            result,
            Err(RuntimeError::Rejected(TransitionError::UnsupportedFileType { .. }))
        ));
        assert_eq!(rt.backend.call_count(), 0);
        assert!(rt.handle.snapshot().messages().is_empty());

        match rt.events.recv().await.unwrap() {
            SessionEvent::Rejected { reason } => {
                assert_eq!(reason, "Please upload a PDF, DOC, or DOCX file");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_blank_message_is_noop() {
        let rt = TestSession::new().build(MockBackend::new());

        let busy = rt.handle.send_message("   \n ").await.unwrap();
        assert_eq!(busy, BusyState::Idle);
        assert_eq!(rt.backend.call_count(), 0);
        assert!(rt.handle.snapshot().messages().is_empty());
    }

    #[tokio::test]
    async fn test_second_action_rejected_while_busy() {
        let backend = DelayedMockBackend::new(Duration::from_millis(200));
        backend.inner.queue_chat(ChatResponse::new("first answer", "abc123"));
        let rt = TestSession::new().build(backend);

        assert_eq!(rt.handle.send_message("first").await.unwrap(), BusyState::Sending);

        let second = rt.handle.send_message("second").await;
        assert!(matches!(
            second,
            Err(RuntimeError::Rejected(TransitionError::Busy(BusyState::Sending)))
        ));
        let upload = rt.handle.upload_document(pdf("a.pdf")).await;
        assert!(matches!(
            upload,
            Err(RuntimeError::Rejected(TransitionError::Busy(BusyState::Sending)))
        ));

        let session = rt.settle(SETTLE).await;
        let contents: Vec<_> = session.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "first answer"]);
        assert_eq!(rt.backend.inner.call_count(), 1);
        assert_eq!(rt.backend.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_chat_timeout_keeps_question() {
        let backend = DelayedMockBackend::new(Duration::from_millis(500));
        backend.inner.queue_chat(ChatResponse::new("too late", "abc123"));
        let rt = TestSession::new()
            .timeouts(Duration::from_millis(50), Duration::from_millis(50))
            .build(backend);

        rt.handle.send_message("Anyone there?").await.unwrap();
        let session = rt.settle(SETTLE).await;

        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[0].content, "Anyone there?");
        assert_eq!(
            session.messages()[1].content,
            format!("❌ Error: {}", Operation::Chat.timeout_message())
        );
        assert_eq!(session.id(), None);
    }

    #[tokio::test]
    async fn test_upload_timeout() {
        let rt = TestSession::new()
            .timeouts(Duration::from_millis(50), Duration::from_millis(50))
            .build(DelayedMockBackend::new(Duration::from_millis(500)));

        rt.handle.upload_document(pdf("huge.pdf")).await.unwrap();
        let session = rt.settle(SETTLE).await;

        assert_eq!(session.messages().len(), 1);
        assert!(session.messages()[0]
            .content
            .starts_with("❌ Error uploading document: Upload timeout"));
    }

    #[tokio::test]
    async fn test_server_error_detail_shown() {
        let backend = MockBackend::new();
        backend.queue_chat_error(ClientError::server(
            Operation::Chat,
            500,
            r#"{"detail": "index missing"}"#,
        ));
        let rt = TestSession::new().build(backend);

        rt.handle.send_message("hello").await.unwrap();
        let session = rt.settle(SETTLE).await;

        assert_eq!(session.messages().len(), 2);
        assert!(session.messages()[1].content.contains("index missing"));
        assert!(session.busy().is_idle());
    }

    #[tokio::test]
    async fn test_unreachable_names_base_url() {
        // Nothing queued: the mock reports the host as unreachable
        let rt = TestSession::new().build(MockBackend::new());

        rt.handle.send_message("hello").await.unwrap();
        let session = rt.settle(SETTLE).await;

        assert!(session.messages()[1].content.contains(TEST_BASE_URL));
    }

    #[tokio::test]
    async fn test_failed_send_does_not_bind_and_later_send_binds() {
        let backend = MockBackend::new();
        backend.queue_chat_error(ClientError::unknown("boom"));
        backend.queue_chat(ChatResponse::new("ok", "abc123"));
        backend.queue_chat(ChatResponse::new("ok again", "zzz"));
        let rt = TestSession::new().build(backend);

        rt.handle.send_message("one").await.unwrap();
        assert_eq!(rt.settle(SETTLE).await.id(), None);

        rt.handle.send_message("two").await.unwrap();
        assert_eq!(rt.settle(SETTLE).await.id(), Some("abc123"));

        rt.handle.send_message("three").await.unwrap();
        let session = rt.settle(SETTLE).await;
        assert_eq!(session.id(), Some("abc123"));
        assert_eq!(session.messages().len(), 6);
    }

    #[tokio::test]
    async fn test_new_chat_discards_in_flight_completion() {
        let backend = DelayedMockBackend::new(Duration::from_millis(100));
        backend.inner.queue_chat(ChatResponse::new("stale answer", "abc123"));
        let rt = TestSession::new().build(backend);

        rt.handle.send_message("question").await.unwrap();
        rt.backend.request_started.notified().await;
        assert_eq!(rt.handle.new_chat().await.unwrap(), BusyState::Idle);

        // Let the orphaned call finish and be discarded
        tokio::time::sleep(Duration::from_millis(300)).await;
        let session = rt.handle.snapshot();
        assert!(session.messages().is_empty());
        assert_eq!(session.id(), None);
        assert!(session.busy().is_idle());
    }

    #[tokio::test]
    async fn test_new_chat_waits_for_orphaned_call_before_next_send() {
        let backend = DelayedMockBackend::new(Duration::from_millis(150));
        backend.inner.queue_chat(ChatResponse::new("stale answer", "old"));
        backend.inner.queue_chat(ChatResponse::new("fresh answer", "new"));
        let rt = TestSession::new().build(backend);

        rt.handle.send_message("one").await.unwrap();
        rt.backend.request_started.notified().await;
        assert_eq!(rt.handle.new_chat().await.unwrap(), BusyState::Idle);

        // The first call still occupies the backend
        let err = rt.handle.send_message("two").await.unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Rejected(TransitionError::Busy(BusyState::Sending))
        ));
        let err = rt.handle.upload_document(pdf("contract.pdf")).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Rejected(TransitionError::Busy(_))));
        assert!(rt.handle.snapshot().messages().is_empty());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(rt.handle.send_message("three").await.unwrap(), BusyState::Sending);
        let session = rt.settle(SETTLE).await;

        assert_eq!(rt.backend.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(rt.backend.inner.call_count(), 2);
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[0].content, "three");
        assert_eq!(session.messages()[1].content, "fresh answer");
        assert_eq!(session.id(), Some("new"));
    }

    #[tokio::test]
    async fn test_panicking_call_still_settles() {
        let rt = TestSession::new().build(PanickingBackend);

        rt.handle.send_message("hello").await.unwrap();
        let session = rt.settle(SETTLE).await;

        assert_eq!(session.messages().len(), 2);
        assert_eq!(
            session.messages()[1].content,
            "❌ Error: Request ended without a result"
        );
    }

    #[tokio::test]
    async fn test_notification_order_for_send() {
        let backend = MockBackend::new();
        backend.queue_chat(ChatResponse::new("42", "abc123"));
        let mut rt = TestSession::new().build(backend);

        rt.handle.send_message("meaning?").await.unwrap();
        let events = rt.events_until_idle(SETTLE).await;

        let summary: Vec<String> = events
            .iter()
            .map(|e| match e {
                SessionEvent::MessageAppended { message } => {
                    format!("{}:{}", message.role.as_str(), message.content)
                }
                SessionEvent::BusyChanged { busy } => format!("busy:{}", busy.as_str()),
                SessionEvent::ConversationBound { id } => format!("bound:{id}"),
                SessionEvent::InputCleared => "input_cleared".to_string(),
                other => format!("{other:?}"),
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                "input_cleared",
                "user:meaning?",
                "busy:sending",
                "assistant:42",
                "bound:abc123",
                "busy:idle",
            ]
        );
    }

    #[tokio::test]
    async fn test_upload_resets_file_picker() {
        let backend = MockBackend::new();
        backend.queue_upload_error(ClientError::server(
            Operation::Upload,
            500,
            r#"{"detail": "Error processing document: encrypted"}"#,
        ));
        let mut rt = TestSession::new().build(backend);

        rt.handle.upload_document(pdf("locked.pdf")).await.unwrap();
        let events = rt.events_until_idle(SETTLE).await;

        assert!(events.iter().any(|e| matches!(e, SessionEvent::FilePickerReset)));
        let session = rt.handle.snapshot();
        assert_eq!(
            session.messages()[0].content,
            "❌ Error uploading document: Error processing document: encrypted"
        );
    }
}
