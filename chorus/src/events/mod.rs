//! Event sink trait and implementations.
//!
//! The pipeline emits one event per backend call plus one at each stage
//! boundary. Sinks are used for observability tooling and analytics; the
//! default sink discards everything.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// A typed event emitted by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// One backend call completed (successfully or not).
    BackendCall {
        /// Backend identity.
        backend: String,
        /// Wall-clock latency of the call.
        elapsed_ms: f64,
        /// Whether the call produced text.
        success: bool,
        /// Diagnostic message on failure.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// A fan-out stage returned (partially or completely).
    StageCompleted {
        /// Stage name ("construction" or "style").
        stage: String,
        /// Number of candidates the stage produced.
        candidates: usize,
        /// Number of calls attempted.
        attempted: usize,
        /// Wall-clock duration of the stage.
        elapsed_ms: f64,
    },
    /// The selection stage picked a winner.
    SelectionCompleted {
        /// Identity of the selector that produced the decision.
        selector: String,
        /// Size of the pool the decision was made over.
        pool_size: usize,
    },
    /// The pipeline assembled its result.
    PipelineCompleted {
        /// Whether the final text differs from the seed.
        improved: bool,
        /// Total wall-clock time.
        elapsed_ms: f64,
        /// Number of degradation notes recorded.
        issues: usize,
    },
}

/// Trait for sinks that receive pipeline events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event asynchronously.
    async fn emit(&self, event: PipelineEvent);

    /// Emits an event without blocking.
    ///
    /// This method must never raise; errors are logged and suppressed.
    fn try_emit(&self, event: PipelineEvent);
}

/// A no-op event sink that discards all events.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: PipelineEvent) {
        // Intentionally empty - discards all events
    }

    fn try_emit(&self, _event: PipelineEvent) {
        // Intentionally empty - discards all events
    }
}

/// An event sink that logs events through the tracing framework.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl TracingEventSink {
    /// Creates a new tracing sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn log_event(event: &PipelineEvent) {
        match event {
            PipelineEvent::BackendCall {
                backend,
                elapsed_ms,
                success,
                error,
            } => {
                if *success {
                    info!(
                        backend = %backend,
                        elapsed_ms = %elapsed_ms,
                        outcome = "success",
                        "backend call completed"
                    );
                } else {
                    warn!(
                        backend = %backend,
                        elapsed_ms = %elapsed_ms,
                        outcome = "failure",
                        error = ?error,
                        "backend call failed"
                    );
                }
            }
            PipelineEvent::StageCompleted {
                stage,
                candidates,
                attempted,
                elapsed_ms,
            } => {
                info!(
                    stage = %stage,
                    candidates = %candidates,
                    attempted = %attempted,
                    elapsed_ms = %elapsed_ms,
                    "stage completed"
                );
            }
            PipelineEvent::SelectionCompleted { selector, pool_size } => {
                info!(
                    selector = %selector,
                    pool_size = %pool_size,
                    "selection completed"
                );
            }
            PipelineEvent::PipelineCompleted {
                improved,
                elapsed_ms,
                issues,
            } => {
                debug!(
                    improved = %improved,
                    elapsed_ms = %elapsed_ms,
                    issues = %issues,
                    "pipeline completed"
                );
            }
        }
    }
}

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: PipelineEvent) {
        Self::log_event(&event);
    }

    fn try_emit(&self, event: PipelineEvent) {
        Self::log_event(&event);
    }
}

/// A collecting event sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<PipelineEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns the collected backend-call events.
    #[must_use]
    pub fn backend_calls(&self) -> Vec<PipelineEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| matches!(e, PipelineEvent::BackendCall { .. }))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: PipelineEvent) {
        self.events.write().push(event);
    }

    fn try_emit(&self, event: PipelineEvent) {
        self.events.write().push(event);
    }
}
