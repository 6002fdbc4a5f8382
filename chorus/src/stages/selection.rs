//! Selection stage: pick exactly one winner, whatever happens.

use super::note_backend;
use crate::backend::BackendCaller;
use crate::candidate::{Candidate, CandidateStage};
use crate::config::SynthesisConfig;
use crate::context::PipelineContext;
use crate::prompts;
use serde::Deserialize;
use tracing::{debug, warn};

/// System prompt for the ranking call.
const JUDGE_SYSTEM_PROMPT: &str =
    "You are a strict quality judge for chat replies. You compare candidates \
     and answer only in the requested JSON format.";

/// Selector identity reported when the deterministic fallback decided.
pub const HEURISTIC_SELECTOR: &str = "heuristic";

/// The verdict record a selector is asked to return.
#[derive(Debug, Clone, Deserialize)]
struct SelectorVerdict {
    choice_index: i64,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    rationale: Option<String>,
}

/// The selection stage's decision.
#[derive(Debug, Clone)]
pub struct SelectionDecision {
    /// The winning candidate.
    pub winner: Candidate,
    /// The selector's one-sentence rationale, when one was given.
    pub rationale: Option<String>,
    /// Identity of whichever selector produced the decision (primary,
    /// backup, or [`HEURISTIC_SELECTOR`]).
    pub selector: String,
    /// The selector's confidence, when one was given.
    pub confidence: Option<f64>,
}

/// Full output of the selection stage.
#[derive(Debug)]
pub struct SelectionReport {
    /// The decision; always present.
    pub decision: SelectionDecision,
    /// Backends with at least one successful call, first-seen order.
    pub backends_succeeded: Vec<String>,
    /// Backends with at least one failed call, first-seen order.
    pub backends_failed: Vec<String>,
    /// Degradation notes gathered during selection.
    pub issues: Vec<String>,
    /// Size of the pool the decision was made over.
    pub pool_size: usize,
}

/// Picks one winning candidate from the pool.
///
/// The primary selector first nominates its own candidate (best-effort),
/// then ranks the full pool. On failure every backup selector is tried in
/// priority order, and behind them a deterministic fallback chain
/// guarantees a decision.
#[derive(Debug)]
pub struct SelectionStage<'a> {
    caller: &'a BackendCaller,
    config: &'a SynthesisConfig,
}

impl<'a> SelectionStage<'a> {
    /// Creates the stage.
    #[must_use]
    pub fn new(caller: &'a BackendCaller, config: &'a SynthesisConfig) -> Self {
        Self { caller, config }
    }

    /// Runs selection over `pool`, which may be empty.
    pub async fn run(
        &self,
        seed_response: &str,
        ctx: &PipelineContext,
        mut pool: Vec<Candidate>,
    ) -> SelectionReport {
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        let mut issues = Vec::new();

        // Step 1: the selector competes before it judges.
        let nominated = self.nominate(seed_response, ctx, &mut succeeded, &mut failed).await;
        if let Some(candidate) = &nominated {
            pool.push(candidate.clone());
        }

        if pool.is_empty() {
            issues.push("no candidates generated; falling back to seed response".to_string());
            return SelectionReport {
                decision: SelectionDecision {
                    winner: Candidate::seed(seed_response),
                    rationale: None,
                    selector: HEURISTIC_SELECTOR.to_string(),
                    confidence: None,
                },
                backends_succeeded: succeeded,
                backends_failed: failed,
                issues,
                pool_size: 0,
            };
        }

        // Steps 3-4: primary selector, then backups in priority order.
        let ranking_prompt = prompts::selector_ranking_prompt(&pool, ctx);
        for selector_id in self.config.selectors_in_order() {
            let outcome = self
                .caller
                .call(
                    selector_id,
                    JUDGE_SYSTEM_PROMPT,
                    &ranking_prompt,
                    0.0,
                    self.config.max_tokens,
                    self.config.call_timeout,
                )
                .await;

            let Some(text) = outcome.text else {
                note_backend(&mut failed, selector_id);
                issues.push(format!("selector {selector_id} failed to rank"));
                continue;
            };

            match parse_verdict(&text) {
                Some(verdict) => {
                    note_backend(&mut succeeded, selector_id);
                    let index = clamp_index(verdict.choice_index, pool.len());
                    let in_range = usize::try_from(verdict.choice_index)
                        .is_ok_and(|i| i < pool.len());
                    if !in_range {
                        issues.push(format!(
                            "selector {selector_id} returned out-of-range index {}",
                            verdict.choice_index
                        ));
                    }
                    debug!(
                        selector = %selector_id,
                        index,
                        pool = pool.len(),
                        "selector ranked the pool"
                    );
                    return SelectionReport {
                        decision: SelectionDecision {
                            winner: pool[index].clone(),
                            rationale: verdict.rationale,
                            selector: selector_id.to_string(),
                            confidence: verdict.confidence,
                        },
                        backends_succeeded: succeeded,
                        backends_failed: failed,
                        issues,
                        pool_size: pool.len(),
                    };
                }
                None => {
                    note_backend(&mut failed, selector_id);
                    issues.push(format!(
                        "selector {selector_id} returned an unparseable verdict"
                    ));
                    warn!(selector = %selector_id, "unparseable selector verdict");
                }
            }
        }

        // Step 5: every selector failed; decide deterministically.
        issues.push("all selectors failed; applying heuristic fallback".to_string());
        let winner = nominated
            .or_else(|| {
                pool.iter()
                    .find(|c| c.stage == CandidateStage::Style)
                    .cloned()
            })
            .or_else(|| pool.first().cloned())
            .unwrap_or_else(|| Candidate::seed(seed_response));

        SelectionReport {
            decision: SelectionDecision {
                winner,
                rationale: None,
                selector: HEURISTIC_SELECTOR.to_string(),
                confidence: None,
            },
            backends_succeeded: succeeded,
            backends_failed: failed,
            issues,
            pool_size: pool.len(),
        }
    }

    /// Asks the primary selector for its own competing candidate.
    ///
    /// Best-effort: failure is tolerated and simply omits the candidate.
    async fn nominate(
        &self,
        seed_response: &str,
        ctx: &PipelineContext,
        succeeded: &mut Vec<String>,
        failed: &mut Vec<String>,
    ) -> Option<Candidate> {
        let selector_id = &self.config.primary_selector;
        let outcome = self
            .caller
            .call(
                selector_id,
                &prompts::system_prompt(ctx),
                &prompts::selector_generation_prompt(seed_response, ctx),
                self.config.base_temperature,
                self.config.max_tokens,
                self.config.call_timeout,
            )
            .await;

        match outcome.text {
            Some(text) => {
                note_backend(succeeded, selector_id);
                Some(Candidate::selector(text, selector_id.clone()))
            }
            None => {
                note_backend(failed, selector_id);
                None
            }
        }
    }
}

/// Extracts the first balanced JSON object from `text` and parses it.
fn parse_verdict(text: &str) -> Option<SelectorVerdict> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let object = &text[start..=start + offset];
                    return serde_json::from_str(object).ok();
                }
            }
            _ => {}
        }
    }
    None
}

/// Clamps a selector-supplied index into the pool range.
fn clamp_index(index: i64, pool_len: usize) -> usize {
    let max = pool_len.saturating_sub(1);
    usize::try_from(index).map_or(0, |i| i.min(max))
}
