//! The synthesis pipeline orchestrator.
//!
//! Sequences construction → style → selection under one overall deadline
//! and assembles the terminal [`PipelineResult`]. This is the single
//! public entry point; collaborators never call the stages directly.

#[cfg(test)]
mod integration_tests;

use crate::backend::{BackendCaller, BackendRoster};
use crate::candidate::Candidate;
use crate::config::SynthesisConfig;
use crate::context::PipelineContext;
use crate::errors::ConfigError;
use crate::events::{EventSink, NoOpEventSink, PipelineEvent};
use crate::stages::{
    note_backend, ConstructionStage, SelectionStage, StageReport, StyleStage,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// The terminal artifact of one pipeline run.
///
/// Created once per invocation and never mutated after return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// The text to surface to the end user; always populated.
    pub final_text: String,
    /// True iff `final_text` differs from the seed response.
    pub was_improved: bool,
    /// Human-readable notes about degradation during the run.
    pub issues: Vec<String>,
    /// Identity of whichever selector produced the decision.
    pub selector_used: String,
    /// Backends with at least one successful call, deduplicated.
    pub backends_succeeded: Vec<String>,
    /// Backends with at least one failed call, deduplicated.
    pub backends_failed: Vec<String>,
    /// Total wall-clock time of the run.
    pub elapsed_ms: f64,
}

/// Mutable bookkeeping shared between the staged run and the deadline
/// handler.
///
/// Written only at stage barriers, so a pipeline-deadline firing mid-stage
/// observes the last fully-returned pool.
#[derive(Debug, Default)]
struct RunProgress {
    construction: Option<StageReport>,
    style: Option<StageReport>,
    issues: Vec<String>,
    phase: &'static str,
}

/// The response-synthesis pipeline.
pub struct SynthesisPipeline {
    caller: BackendCaller,
    config: SynthesisConfig,
    events: Arc<dyn EventSink>,
}

impl SynthesisPipeline {
    /// Creates a pipeline with the default (discarding) event sink.
    pub fn new(roster: BackendRoster, config: SynthesisConfig) -> Result<Self, ConfigError> {
        Self::with_events(roster, config, Arc::new(NoOpEventSink))
    }

    /// Creates a pipeline with an explicit event sink.
    pub fn with_events(
        roster: BackendRoster,
        config: SynthesisConfig,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            caller: BackendCaller::new(Arc::new(roster), events.clone()),
            config,
            events,
        })
    }

    /// Synthesizes the best available response from the seed.
    ///
    /// Never raises and always returns a populated result: under total
    /// backend failure the final text degrades to the seed response.
    pub async fn synthesize(
        &self,
        seed_response: &str,
        ctx: &PipelineContext,
    ) -> PipelineResult {
        let start = Instant::now();
        let progress = Arc::new(Mutex::new(RunProgress::default()));

        let caller = self.caller.clone();
        let config = self.config.clone();
        let events = self.events.clone();
        let seed = seed_response.to_string();
        let ctx = ctx.clone();
        let task_progress = progress.clone();

        let staged = tokio::spawn(async move {
            run_stages(&caller, &config, &events, &seed, &ctx, &task_progress).await
        });

        let result = match tokio::time::timeout(self.config.pipeline_timeout, staged).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                // Last-resort catch-all: the staged task died.
                warn!(error = %join_error, "synthesis task failed; degrading");
                self.degraded_result(
                    seed_response,
                    &progress,
                    format!("synthesis task failed: {join_error}"),
                    start,
                )
            }
            Err(_) => self.degraded_result(
                seed_response,
                &progress,
                format!(
                    "pipeline deadline reached during {} stage",
                    progress.lock().phase
                ),
                start,
            ),
        };

        self.events.try_emit(PipelineEvent::PipelineCompleted {
            improved: result.was_improved,
            elapsed_ms: result.elapsed_ms,
            issues: result.issues.len(),
        });
        info!(
            improved = result.was_improved,
            selector = %result.selector_used,
            elapsed_ms = result.elapsed_ms,
            "synthesis completed"
        );
        result
    }

    /// Builds a result from whatever the run gathered before it was cut
    /// short.
    fn degraded_result(
        &self,
        seed_response: &str,
        progress: &Arc<Mutex<RunProgress>>,
        final_issue: String,
        start: Instant,
    ) -> PipelineResult {
        let progress = progress.lock();

        let mut issues = progress.issues.clone();
        issues.push(final_issue);

        // Best pool still available: style, then construction, then seed.
        let winner = progress
            .style
            .as_ref()
            .and_then(|r| r.candidates.first())
            .or_else(|| {
                progress
                    .construction
                    .as_ref()
                    .and_then(|r| r.candidates.first())
            })
            .cloned();

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for report in [&progress.construction, &progress.style].into_iter().flatten() {
            for id in &report.backends_succeeded {
                note_backend(&mut succeeded, id);
            }
            for id in &report.backends_failed {
                note_backend(&mut failed, id);
            }
        }

        let final_text = winner.map_or_else(
            || seed_response.to_string(),
            |candidate| candidate.content,
        );

        PipelineResult {
            was_improved: final_text != seed_response,
            final_text,
            issues,
            selector_used: crate::stages::HEURISTIC_SELECTOR.to_string(),
            backends_succeeded: succeeded,
            backends_failed: failed,
            elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
        }
    }
}

impl std::fmt::Debug for SynthesisPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisPipeline")
            .field("config", &self.config)
            .finish()
    }
}

/// Runs the three stages in sequence, publishing each report into the
/// shared progress at its barrier.
async fn run_stages(
    caller: &BackendCaller,
    config: &SynthesisConfig,
    events: &Arc<dyn EventSink>,
    seed_response: &str,
    ctx: &PipelineContext,
    progress: &Arc<Mutex<RunProgress>>,
) -> PipelineResult {
    let start = Instant::now();
    let mut issues = Vec::new();

    // Construction
    progress.lock().phase = "construction";
    let stage_start = Instant::now();
    let construction = ConstructionStage::new(caller, config)
        .run(seed_response, ctx)
        .await;
    events.try_emit(PipelineEvent::StageCompleted {
        stage: "construction".to_string(),
        candidates: construction.candidates.len(),
        attempted: construction.attempted,
        elapsed_ms: stage_start.elapsed().as_secs_f64() * 1000.0,
    });
    if construction.is_starved() {
        issues.push("all construction backends failed".to_string());
    }
    {
        let mut p = progress.lock();
        p.construction = Some(construction.clone());
        p.issues.clone_from(&issues);
    }

    // Style (skipped when there is nothing to refine)
    progress.lock().phase = "style";
    let stage_start = Instant::now();
    let style = StyleStage::new(caller, config)
        .run(&construction.candidates, ctx)
        .await;
    events.try_emit(PipelineEvent::StageCompleted {
        stage: "style".to_string(),
        candidates: style.candidates.len(),
        attempted: style.attempted,
        elapsed_ms: stage_start.elapsed().as_secs_f64() * 1000.0,
    });
    if !construction.is_starved() && style.is_starved() {
        issues.push("style stage produced no candidates".to_string());
    }
    {
        let mut p = progress.lock();
        p.style = Some(style.clone());
        p.issues.clone_from(&issues);
    }

    // Selection over both tiers
    progress.lock().phase = "selection";
    let mut pool: Vec<Candidate> = construction.candidates.clone();
    pool.extend(style.candidates.iter().cloned());
    let selection = SelectionStage::new(caller, config)
        .run(seed_response, ctx, pool)
        .await;
    events.try_emit(PipelineEvent::SelectionCompleted {
        selector: selection.decision.selector.clone(),
        pool_size: selection.pool_size,
    });
    issues.extend(selection.issues.iter().cloned());

    // Aggregate tallies across all three stages
    let mut succeeded = Vec::new();
    let mut failed = Vec::new();
    for report in [&construction, &style] {
        for id in &report.backends_succeeded {
            note_backend(&mut succeeded, id);
        }
        for id in &report.backends_failed {
            note_backend(&mut failed, id);
        }
    }
    for id in &selection.backends_succeeded {
        note_backend(&mut succeeded, id);
    }
    for id in &selection.backends_failed {
        note_backend(&mut failed, id);
    }

    let final_text = selection.decision.winner.content.clone();
    PipelineResult {
        was_improved: final_text != seed_response,
        final_text,
        issues,
        selector_used: selection.decision.selector,
        backends_succeeded: succeeded,
        backends_failed: failed,
        elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
    }
}
