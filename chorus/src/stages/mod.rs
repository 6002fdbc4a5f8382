//! The three pipeline stages: construction, style, and selection.

mod construction;
mod selection;
mod style;

pub use construction::ConstructionStage;
pub use selection::{SelectionDecision, SelectionReport, SelectionStage, HEURISTIC_SELECTOR};
pub use style::StyleStage;

use crate::candidate::Candidate;
use serde::{Deserialize, Serialize};

/// Outcome of one fan-out stage.
///
/// Zero candidates is a valid, non-error outcome; the orchestrator falls
/// back to the previous pool.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StageReport {
    /// Candidates the stage produced, in completion order.
    pub candidates: Vec<Candidate>,
    /// Backends with at least one successful call, first-seen order.
    pub backends_succeeded: Vec<String>,
    /// Backends with at least one failed or abandoned call, first-seen order.
    pub backends_failed: Vec<String>,
    /// Number of calls the stage attempted.
    pub attempted: usize,
    /// Whether the stage deadline fired before every call completed.
    pub deadline_hit: bool,
}

impl StageReport {
    /// Creates an empty report (used when a stage is skipped).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if the stage produced no candidates.
    #[must_use]
    pub fn is_starved(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Appends `id` to `list` unless already present, preserving order.
pub(crate) fn note_backend(list: &mut Vec<String>, id: &str) {
    if !list.iter().any(|existing| existing == id) {
        list.push(id.to_string());
    }
}
