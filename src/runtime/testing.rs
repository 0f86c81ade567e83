//! Mock implementations for testing
//!
//! These mocks let the session runtime be driven without network I/O.

use super::traits::*;
use super::{SessionEvent, SessionHandle, SessionRuntime, SessionStatus};
use crate::contexts::ContextTable;
use crate::llm::{AspectRatio, HistoryMessage, LlmError};
use crate::locale::Locale;
use crate::state_machine::{ConvState, SessionContext};
use crate::timeline::{Entry, ImageRef, TimelineStore};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch, Notify};

// ============================================================================
// Mock Text Backend
// ============================================================================

/// A recorded `complete_text` call
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub history: Vec<HistoryMessage>,
    pub message: String,
    pub locale: Locale,
}

/// Mock text backend that returns queued replies
pub struct MockTextBackend {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<TextRequest>>,
    /// When set, each call waits for one `release`
    gate: Option<Notify>,
    /// Timeline to snapshot at the moment each call begins
    probe: Mutex<Option<TimelineStore>>,
    observed: Mutex<Vec<Vec<Entry>>>,
}

impl MockTextBackend {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            gate: None,
            probe: Mutex::new(None),
            observed: Mutex::new(Vec::new()),
        }
    }

    /// Calls block until `release` is called once per call
    pub fn gated() -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Self::new()
        }
    }

    pub fn queue_reply(&self, reply: &str) {
        self.replies.lock().unwrap().push_back(Ok(reply.to_string()));
    }

    pub fn queue_error(&self, error: LlmError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    /// Record a snapshot of `timeline` whenever a call begins
    pub fn observe(&self, timeline: TimelineStore) {
        *self.probe.lock().unwrap() = Some(timeline);
    }

    pub fn recorded_requests(&self) -> Vec<TextRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn observed_timelines(&self) -> Vec<Vec<Entry>> {
        self.observed.lock().unwrap().clone()
    }
}

impl Default for MockTextBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextBackend for MockTextBackend {
    async fn complete_text(
        &self,
        history: &[HistoryMessage],
        message: &str,
        locale: Locale,
    ) -> Result<String, LlmError> {
        if let Some(timeline) = self.probe.lock().unwrap().as_ref() {
            self.observed.lock().unwrap().push(timeline.snapshot());
        }
        self.requests.lock().unwrap().push(TextRequest {
            history: history.to_vec(),
            message: message.to_string(),
            locale,
        });

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock reply queued")))
    }

    fn model_id(&self) -> &str {
        "mock-text"
    }
}

// ============================================================================
// Mock Image Backend
// ============================================================================

/// A recorded `generate_image` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
}

/// Mock image backend; unqueued calls produce no image
pub struct MockImageBackend {
    images: Mutex<VecDeque<Option<ImageRef>>>,
    requests: Mutex<Vec<ImageRequest>>,
    gate: Option<Notify>,
}

impl MockImageBackend {
    pub fn new() -> Self {
        Self {
            images: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Calls block until `release` is called once per call
    pub fn gated() -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Self::new()
        }
    }

    pub fn queue_image(&self, image: Option<ImageRef>) {
        self.images.lock().unwrap().push_back(image);
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn recorded_requests(&self) -> Vec<ImageRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn recorded_prompts(&self) -> Vec<String> {
        self.recorded_requests()
            .into_iter()
            .map(|r| r.prompt)
            .collect()
    }
}

impl Default for MockImageBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageBackend for MockImageBackend {
    async fn generate_image(&self, prompt: &str, aspect_ratio: AspectRatio) -> Option<ImageRef> {
        self.requests.lock().unwrap().push(ImageRequest {
            prompt: prompt.to_string(),
            aspect_ratio,
        });

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        self.images.lock().unwrap().pop_front().flatten()
    }

    fn model_id(&self) -> &str {
        "mock-image"
    }
}

// ============================================================================
// Test Session
// ============================================================================

/// A running session wired to mock backends
pub struct TestSession {
    pub handle: SessionHandle,
    pub text: Arc<MockTextBackend>,
    pub image: Arc<MockImageBackend>,
    status_rx: watch::Receiver<SessionStatus>,
    join: tokio::task::JoinHandle<()>,
}

impl TestSession {
    pub fn builder() -> TestSessionBuilder {
        TestSessionBuilder::default()
    }

    pub fn timeline(&self) -> TimelineStore {
        self.handle.timeline.clone()
    }

    /// Drop the handle and return the actor's task
    pub fn into_join_handle(self) -> tokio::task::JoinHandle<()> {
        self.join
    }

    /// Wait until the controller state satisfies `predicate`
    pub async fn wait_for_state(
        &mut self,
        predicate: impl Fn(&ConvState) -> bool,
        timeout: Duration,
    ) -> bool {
        let wait = self.status_rx.wait_for(|status| predicate(&status.state));
        matches!(tokio::time::timeout(timeout, wait).await, Ok(Ok(_)))
    }

    /// Wait until the timeline holds at least `count` entries
    pub async fn wait_for_entries(&mut self, count: usize, timeout: Duration) -> bool {
        self.wait_until(|entries| entries.len() >= count, timeout)
            .await
    }

    /// Poll the timeline until `predicate` holds
    pub async fn wait_until(
        &mut self,
        predicate: impl Fn(&[Entry]) -> bool,
        timeout: Duration,
    ) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if predicate(&self.handle.snapshot()) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        predicate(&self.handle.snapshot())
    }
}

/// Receive events until one satisfies `predicate`
pub async fn wait_for_event(
    rx: &mut broadcast::Receiver<SessionEvent>,
    predicate: impl Fn(&SessionEvent) -> bool,
    timeout: Duration,
) -> Option<SessionEvent> {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        match tokio::time::timeout(Duration::from_millis(50), rx.recv()).await {
            Ok(Ok(event)) if predicate(&event) => return Some(event),
            _ => continue,
        }
    }
    None
}

#[derive(Default)]
pub struct TestSessionBuilder {
    text: Option<Arc<MockTextBackend>>,
    image: Option<Arc<MockImageBackend>>,
    locale: Option<Locale>,
    aspect_ratio: Option<AspectRatio>,
}

impl TestSessionBuilder {
    pub fn text(self, text: MockTextBackend) -> Self {
        self.shared_text(Arc::new(text))
    }

    pub fn shared_text(mut self, text: Arc<MockTextBackend>) -> Self {
        self.text = Some(text);
        self
    }

    pub fn image(mut self, image: MockImageBackend) -> Self {
        self.image = Some(Arc::new(image));
        self
    }

    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }

    pub fn aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = Some(aspect_ratio);
        self
    }

    pub fn build(self) -> TestSession {
        let text = self.text.unwrap_or_default();
        let image = self.image.unwrap_or_default();
        let context = SessionContext::new(
            "test-session",
            self.locale.unwrap_or_default(),
            self.aspect_ratio.unwrap_or_default(),
        );

        let (runtime, handle) = SessionRuntime::new(
            context,
            Arc::new(ContextTable::builtin()),
            text.clone(),
            image.clone(),
        );
        let join = tokio::spawn(runtime.run());

        TestSession {
            status_rx: handle.watch_status(),
            handle,
            text,
            image,
            join,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_text_backend_replays_queue_then_fails() {
        let mock = MockTextBackend::new();
        mock.queue_reply("Hello");

        let reply = mock.complete_text(&[], "hi there", Locale::Zh).await;
        assert_eq!(reply.unwrap(), "Hello");
        assert!(mock.complete_text(&[], "again", Locale::En).await.is_err());

        let requests = mock.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].locale, Locale::Zh);
    }

    #[tokio::test]
    async fn test_gated_image_backend_waits_for_release() {
        let mock = Arc::new(MockImageBackend::gated());
        mock.queue_image(Some(ImageRef::new("data:image/png;base64,AA")));

        let task = {
            let mock = mock.clone();
            tokio::spawn(async move { mock.generate_image("a lighthouse", AspectRatio::Square).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!task.is_finished());

        mock.release();
        let image = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert!(image.is_some());
        assert_eq!(
            mock.recorded_requests(),
            vec![ImageRequest {
                prompt: "a lighthouse".to_string(),
                aspect_ratio: AspectRatio::Square,
            }]
        );
    }
}
