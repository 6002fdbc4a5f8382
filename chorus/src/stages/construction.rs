//! Construction stage: seed response → C×V candidate variations.

use super::{note_backend, StageReport};
use crate::backend::BackendCaller;
use crate::candidate::Candidate;
use crate::config::SynthesisConfig;
use crate::context::PipelineContext;
use crate::fanout::collect_until_deadline;
use crate::prompts;
use tracing::debug;

/// Fans the seed response out to the construction roster.
///
/// Every (backend, variation) pair is one concurrent call; the stage
/// returns partial results when its deadline elapses.
#[derive(Debug)]
pub struct ConstructionStage<'a> {
    caller: &'a BackendCaller,
    config: &'a SynthesisConfig,
}

impl<'a> ConstructionStage<'a> {
    /// Creates the stage.
    #[must_use]
    pub fn new(caller: &'a BackendCaller, config: &'a SynthesisConfig) -> Self {
        Self { caller, config }
    }

    /// Runs the construction fan-out.
    pub async fn run(&self, seed_response: &str, ctx: &PipelineContext) -> StageReport {
        let system = prompts::system_prompt(ctx);
        let variations = self.config.variations_per_backend;

        let mut attempted_keys = Vec::new();
        let mut calls = Vec::new();
        for backend_id in &self.config.construction_backends {
            for variation in 0..variations {
                attempted_keys.push((backend_id.clone(), variation));
                let caller = self.caller;
                let system = system.clone();
                let user = prompts::construction_prompt(seed_response, ctx, variation);
                let temperature = self.config.temperature_for(variation);
                let max_tokens = self.config.max_tokens;
                let timeout = self.config.call_timeout;
                let backend_id = backend_id.clone();
                calls.push(async move {
                    let outcome = caller
                        .call(&backend_id, &system, &user, temperature, max_tokens, timeout)
                        .await;
                    (backend_id, variation, outcome)
                });
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
        for (backend_id, variation, outcome) in fanned.completed {
            completed_keys.push((backend_id.clone(), variation));
            if let Some(text) = outcome.text {
                note_backend(&mut report.backends_succeeded, &backend_id);
                report
                    .candidates
                    .push(Candidate::construction(text, backend_id, variation));
            } else {
                note_backend(&mut report.backends_failed, &backend_id);
            }
        }

        // Calls still in flight at the deadline count against their backend.
        for (backend_id, variation) in &attempted_keys {
            if !completed_keys.contains(&(backend_id.clone(), *variation)) {
                note_backend(&mut report.backends_failed, backend_id);
            }
        }

        debug!(
            candidates = report.candidates.len(),
            attempted = report.attempted,
            abandoned = fanned.abandoned,
            "construction stage returned"
        );
        report
    }
}
