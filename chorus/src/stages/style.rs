//! Style stage: top construction candidates → polished refinements.

use super::{note_backend, StageReport};
use crate::backend::BackendCaller;
use crate::candidate::Candidate;
use crate::config::SynthesisConfig;
use crate::context::PipelineContext;
use crate::fanout::collect_until_deadline;
use crate::prompts;
use tracing::debug;

/// Refines the first `style_top_n` construction candidates with the style
/// roster.
///
/// Fan-out size is `min(N, pool) × S × V`. Every style candidate records
/// the construction candidate it refines as its parent. The stage is
/// skipped entirely when the construction pool is empty.
#[derive(Debug)]
pub struct StyleStage<'a> {
    caller: &'a BackendCaller,
    config: &'a SynthesisConfig,
}

impl<'a> StyleStage<'a> {
    /// Creates the stage.
    #[must_use]
    pub fn new(caller: &'a BackendCaller, config: &'a SynthesisConfig) -> Self {
        Self { caller, config }
    }

    /// Runs the style fan-out over the construction pool.
    pub async fn run(
        &self,
        construction_candidates: &[Candidate],
        ctx: &PipelineContext,
    ) -> StageReport {
        if construction_candidates.is_empty() {
            return StageReport::empty();
        }

        let system = prompts::system_prompt(ctx);
        let top = &construction_candidates
            [..self.config.style_top_n.min(construction_candidates.len())];

        let mut attempted_keys = Vec::new();
        let mut calls = Vec::new();
        for parent in top {
            for backend_id in &self.config.style_backends {
                for variation in 0..self.config.variations_per_backend {
                    attempted_keys.push((backend_id.clone(), parent.id, variation));
                    let caller = self.caller;
                    let system = system.clone();
                    let user = prompts::style_prompt(&parent.content, ctx, variation);
                    let temperature = self.config.temperature_for(variation);
                    let max_tokens = self.config.max_tokens;
                    let timeout = self.config.call_timeout;
                    let backend_id = backend_id.clone();
                    let parent_id = parent.id;
                    calls.push(async move {
                        let outcome = caller
                            .call(&backend_id, &system, &user, temperature, max_tokens, timeout)
                            .await;
                        (backend_id, parent_id, variation, outcome)
                    });
                }
            }
        }

        let attempted = calls.len();
        let fanned = collect_until_deadline(calls, self.config.stage_timeout).await;

        let mut report = StageReport {
            attempted,
            deadline_hit: fanned.deadline_hit,
            ..StageReport::default()
        };

        let mut completed_keys = Vec::with_capacity(fanned.completed.len());
        for (backend_id, parent_id, variation, outcome) in fanned.completed {
            completed_keys.push((backend_id.clone(), parent_id, variation));
            if let Some(text) = outcome.text {
                note_backend(&mut report.backends_succeeded, &backend_id);
                report
                    .candidates
                    .push(Candidate::style(text, backend_id, parent_id, variation));
            } else {
                note_backend(&mut report.backends_failed, &backend_id);
            }
        }

        for (backend_id, parent_id, variation) in &attempted_keys {
            if !completed_keys.contains(&(backend_id.clone(), *parent_id, *variation)) {
                note_backend(&mut report.backends_failed, backend_id);
            }
        }

        debug!(
            candidates = report.candidates.len(),
            attempted = report.attempted,
            abandoned = fanned.abandoned,
            "style stage returned"
        );
        report
    }
}
