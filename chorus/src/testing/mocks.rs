//! Mock backends for testing.

use crate::backend::{Backend, BackendRoster, GenerationRequest};
use crate::errors::BackendError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// One scripted mock reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this text.
    Text(String),
    /// Fail with this diagnostic.
    Fail(String),
}

/// A mock backend with scripted replies, optional delay, and call recording.
///
/// Clones share state, so a clone kept outside the roster can inspect the
/// calls made through it.
#[derive(Debug, Clone)]
pub struct MockBackend {
    id: String,
    inner: Arc<MockInner>,
}

#[derive(Debug)]
struct MockInner {
    script: Mutex<VecDeque<MockReply>>,
    fallback: MockReply,
    delay: Option<Duration>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockBackend {
    fn build(id: impl Into<String>, fallback: MockReply, delay: Option<Duration>) -> Self {
        Self {
            id: id.into(),
            inner: Arc::new(MockInner {
                script: Mutex::new(VecDeque::new()),
                fallback,
                delay,
                requests: Mutex::new(Vec::new()),
            }),
        }
    }

    /// A backend that always returns the same text.
    #[must_use]
    pub fn always(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::build(id, MockReply::Text(text.into()), None)
    }

    /// A backend that always fails with the given diagnostic.
    #[must_use]
    pub fn failing(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self::build(id, MockReply::Fail(error.into()), None)
    }

    /// A backend that sleeps before answering.
    #[must_use]
    pub fn slow(id: impl Into<String>, text: impl Into<String>, delay: Duration) -> Self {
        Self::build(id, MockReply::Text(text.into()), Some(delay))
    }

    /// A backend that plays back `replies` in order, then repeats the last.
    #[must_use]
    pub fn scripted(id: impl Into<String>, replies: Vec<MockReply>) -> Self {
        let fallback = replies
            .last()
            .cloned()
            .unwrap_or_else(|| MockReply::Fail("script exhausted".to_string()));
        let mock = Self::build(id, fallback, None);
        *mock.inner.script.lock() = replies.into();
        mock
    }

    /// Returns every request this backend has received.
    #[must_use]
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.inner.requests.lock().clone()
    }

    /// Returns how many times the backend was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.inner.requests.lock().len()
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn id(&self) -> &str {
        &self.id
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        self.inner.requests.lock().push(request.clone());

        if let Some(delay) = self.inner.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .inner
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.inner.fallback.clone());

        match reply {
            MockReply::Text(text) => Ok(text),
            MockReply::Fail(error) => Err(BackendError::Unavailable(error)),
        }
    }
}

/// Builds a selector verdict reply in the wire format the selection stage
/// parses.
#[must_use]
pub fn verdict_json(choice_index: i64, confidence: f64, rationale: &str) -> String {
    serde_json::json!({
        "choice_index": choice_index,
        "confidence": confidence,
        "rationale": rationale,
    })
    .to_string()
}

/// Builds a roster from mock backends.
#[must_use]
pub fn roster_of(backends: Vec<MockBackend>) -> BackendRoster {
    let mut roster = BackendRoster::new();
    for backend in backends {
        roster = roster.register(Arc::new(backend));
    }
    roster
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest {
            system_prompt: "sys".to_string(),
            user_prompt: "user".to_string(),
            temperature: 0.5,
            max_tokens: 128,
        }
    }

    #[tokio::test]
    async fn test_always_backend() {
        let backend = MockBackend::always("m", "hello");
        let reply = backend.generate(&request()).await.unwrap();
        assert_eq!(reply, "hello");
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_backend() {
        let backend = MockBackend::failing("m", "down");
        let err = backend.generate(&request()).await.unwrap_err();
        assert!(err.to_string().contains("down"));
    }

    #[tokio::test]
    async fn test_scripted_backend_plays_in_order() {
        let backend = MockBackend::scripted(
            "m",
            vec![
                MockReply::Fail("first fails".to_string()),
                MockReply::Text("second works".to_string()),
            ],
        );

        assert!(backend.generate(&request()).await.is_err());
        assert_eq!(backend.generate(&request()).await.unwrap(), "second works");
        // Script exhausted: repeats the last reply
        assert_eq!(backend.generate(&request()).await.unwrap(), "second works");
    }

    #[tokio::test]
    async fn test_clones_share_recording() {
        let backend = MockBackend::always("m", "hi");
        let observer = backend.clone();

        backend.generate(&request()).await.unwrap();
        assert_eq!(observer.call_count(), 1);
    }

    #[test]
    fn test_verdict_json_parses() {
        let json = verdict_json(2, 0.9, "most compliant");
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["choice_index"], 2);
    }
}
