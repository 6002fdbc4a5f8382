//! The never-throws backend caller.

use super::{BackendRoster, GenerationRequest};
use crate::events::{EventSink, PipelineEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of one backend call.
///
/// Exactly one of `text` / `error` is populated. Failures are data, not
/// errors: a `CallOutcome` is produced for every call, whatever happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallOutcome {
    /// The backend that was called.
    pub backend: String,
    /// Generated text on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Diagnostic message on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock latency of the call.
    pub elapsed_ms: f64,
}

impl CallOutcome {
    /// Creates a success outcome.
    #[must_use]
    pub fn success(backend: impl Into<String>, text: impl Into<String>, elapsed_ms: f64) -> Self {
        Self {
            backend: backend.into(),
            text: Some(text.into()),
            error: None,
            elapsed_ms,
        }
    }

    /// Creates a failure outcome.
    #[must_use]
    pub fn failure(backend: impl Into<String>, error: impl Into<String>, elapsed_ms: f64) -> Self {
        Self {
            backend: backend.into(),
            text: None,
            error: Some(error.into()),
            elapsed_ms,
        }
    }

    /// Returns true if the call produced text.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.text.is_some()
    }
}

/// Invokes backends by id with a hard timeout, never raising.
///
/// Network failures, malformed responses, unknown ids, and elapsed-time
/// overruns are all converted into failure outcomes carrying a diagnostic
/// message. One structured log record and one [`PipelineEvent::BackendCall`]
/// are emitted per call.
#[derive(Clone)]
pub struct BackendCaller {
    roster: Arc<BackendRoster>,
    events: Arc<dyn EventSink>,
}

impl BackendCaller {
    /// Creates a caller over a roster.
    #[must_use]
    pub fn new(roster: Arc<BackendRoster>, events: Arc<dyn EventSink>) -> Self {
        Self { roster, events }
    }

    /// Calls one backend with a hard deadline.
    ///
    /// The temperature is clamped into [0, 1]; a non-positive timeout or a
    /// zero token budget fails the call without invoking the backend.
    pub async fn call(
        &self,
        backend_id: &str,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f64,
        max_tokens: u32,
        timeout: Duration,
    ) -> CallOutcome {
        let start = Instant::now();

        if timeout.is_zero() {
            return self.finish(CallOutcome::failure(
                backend_id,
                "call timeout must be positive",
                0.0,
            ));
        }
        if max_tokens == 0 {
            return self.finish(CallOutcome::failure(
                backend_id,
                "max_tokens must be positive",
                0.0,
            ));
        }

        let Some(backend) = self.roster.get(backend_id) else {
            return self.finish(CallOutcome::failure(
                backend_id,
                format!("unknown backend id: {backend_id}"),
                0.0,
            ));
        };

        let request = GenerationRequest {
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
            temperature: temperature.clamp(0.0, 1.0),
            max_tokens,
        };

        let outcome = match tokio::time::timeout(timeout, backend.generate(&request)).await {
            Ok(Ok(text)) => {
                let elapsed_ms = elapsed_ms(start);
                if text.trim().is_empty() {
                    CallOutcome::failure(backend_id, "backend returned empty text", elapsed_ms)
                } else {
                    CallOutcome::success(backend_id, text, elapsed_ms)
                }
            }
            Ok(Err(err)) => CallOutcome::failure(backend_id, err.to_string(), elapsed_ms(start)),
            Err(_) => {
                let elapsed = elapsed_ms(start);
                CallOutcome::failure(
                    backend_id,
                    format!("timed out after {elapsed:.0}ms"),
                    elapsed,
                )
            }
        };

        self.finish(outcome)
    }

    fn finish(&self, outcome: CallOutcome) -> CallOutcome {
        if outcome.is_success() {
            tracing::info!(
                backend = %outcome.backend,
                elapsed_ms = %outcome.elapsed_ms,
                outcome = "success",
                "backend call"
            );
        } else {
            tracing::warn!(
                backend = %outcome.backend,
                elapsed_ms = %outcome.elapsed_ms,
                outcome = "failure",
                error = ?outcome.error,
                "backend call"
            );
        }
        self.events.try_emit(PipelineEvent::BackendCall {
            backend: outcome.backend.clone(),
            elapsed_ms: outcome.elapsed_ms,
            success: outcome.is_success(),
            error: outcome.error.clone(),
        });
        outcome
    }
}

impl std::fmt::Debug for BackendCaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendCaller")
            .field("roster_size", &self.roster.len())
            .finish()
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{CollectingEventSink, NoOpEventSink};
    use crate::testing::mocks::MockBackend;

    fn caller_with(
        backends: Vec<MockBackend>,
    ) -> (BackendCaller, Arc<CollectingEventSink>) {
        let mut roster = BackendRoster::new();
        for backend in backends {
            roster = roster.register(Arc::new(backend));
        }
        let sink = Arc::new(CollectingEventSink::new());
        (BackendCaller::new(Arc::new(roster), sink.clone()), sink)
    }

    #[tokio::test]
    async fn test_successful_call() {
        let (caller, sink) = caller_with(vec![MockBackend::always("model-a", "hello there")]);

        let outcome = caller
            .call("model-a", "sys", "user", 0.5, 256, Duration::from_secs(1))
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.text.as_deref(), Some("hello there"));
        assert_eq!(sink.backend_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_backend_is_failure_not_panic() {
        let (caller, _sink) = caller_with(vec![]);

        let outcome = caller
            .call("ghost", "sys", "user", 0.5, 256, Duration::from_secs(1))
            .await;

        assert!(!outcome.is_success());
        assert!(outcome.error.as_deref().unwrap().contains("ghost"));
    }

    #[tokio::test]
    async fn test_backend_error_absorbed() {
        let (caller, _sink) = caller_with(vec![MockBackend::failing("bad", "upstream 500")]);

        let outcome = caller
            .call("bad", "sys", "user", 0.5, 256, Duration::from_secs(1))
            .await;

        assert!(!outcome.is_success());
        assert!(outcome.error.as_deref().unwrap().contains("upstream 500"));
    }

    #[tokio::test]
    async fn test_timeout_becomes_failure() {
        let (caller, _sink) = caller_with(vec![MockBackend::slow(
            "slow",
            "late reply",
            Duration::from_millis(200),
        )]);

        let outcome = caller
            .call("slow", "sys", "user", 0.5, 256, Duration::from_millis(20))
            .await;

        assert!(!outcome.is_success());
        assert!(outcome.error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_empty_text_is_failure() {
        let (caller, _sink) = caller_with(vec![MockBackend::always("empty", "   ")]);

        let outcome = caller
            .call("empty", "sys", "user", 0.5, 256, Duration::from_secs(1))
            .await;

        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_temperature_clamped() {
        let backend = MockBackend::always("model-a", "ok");
        let recorder = backend.clone();
        let roster = Arc::new(BackendRoster::new().register(Arc::new(backend)));
        let caller = BackendCaller::new(roster, Arc::new(NoOpEventSink));

        caller
            .call("model-a", "sys", "user", 3.0, 256, Duration::from_secs(1))
            .await;

        let requests = recorder.requests();
        assert_eq!(requests.len(), 1);
        assert!((requests[0].temperature - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_invalid_inputs_fail_locally() {
        let (caller, _sink) = caller_with(vec![MockBackend::always("model-a", "ok")]);

        let outcome = caller
            .call("model-a", "sys", "user", 0.5, 0, Duration::from_secs(1))
            .await;
        assert!(!outcome.is_success());

        let outcome = caller
            .call("model-a", "sys", "user", 0.5, 256, Duration::ZERO)
            .await;
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_event_carries_latency_and_identity() {
        let (caller, sink) = caller_with(vec![MockBackend::always("model-a", "ok")]);

        caller
            .call("model-a", "sys", "user", 0.5, 256, Duration::from_secs(1))
            .await;

        match &sink.backend_calls()[0] {
            PipelineEvent::BackendCall {
                backend, success, ..
            } => {
                assert_eq!(backend, "model-a");
                assert!(success);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
