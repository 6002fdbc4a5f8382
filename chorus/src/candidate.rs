//! Candidate values produced by the pipeline stages.
//!
//! A candidate is immutable once created; stages never mutate existing
//! candidates, only produce new ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which stage produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStage {
    /// Produced by the construction fan-out from the seed response.
    Construction,
    /// Produced by the style fan-out from a construction candidate.
    Style,
    /// Self-nominated by the selector backend.
    Selector,
}

impl std::fmt::Display for CandidateStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Construction => write!(f, "construction"),
            Self::Style => write!(f, "style"),
            Self::Selector => write!(f, "selector"),
        }
    }
}

/// One generated text plus its provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Unique identifier, generated at creation time.
    pub id: Uuid,
    /// The generated text.
    pub content: String,
    /// Identity of the generating backend.
    pub backend: String,
    /// The stage that produced this candidate.
    pub stage: CandidateStage,
    /// The construction candidate a style candidate refines.
    ///
    /// Absent for construction and selector candidates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    /// Distinguishes sibling variations from the same backend and stage.
    pub variation_index: usize,
    /// When the candidate was created.
    pub created_at: DateTime<Utc>,
}

impl Candidate {
    /// Creates a construction-stage candidate.
    #[must_use]
    pub fn construction(
        content: impl Into<String>,
        backend: impl Into<String>,
        variation_index: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            backend: backend.into(),
            stage: CandidateStage::Construction,
            parent_id: None,
            variation_index,
            created_at: Utc::now(),
        }
    }

    /// Creates a style-stage candidate refining `parent`.
    #[must_use]
    pub fn style(
        content: impl Into<String>,
        backend: impl Into<String>,
        parent_id: Uuid,
        variation_index: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            backend: backend.into(),
            stage: CandidateStage::Style,
            parent_id: Some(parent_id),
            variation_index,
            created_at: Utc::now(),
        }
    }

    /// Creates a selector self-nominated candidate.
    #[must_use]
    pub fn selector(content: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            backend: backend.into(),
            stage: CandidateStage::Selector,
            parent_id: None,
            variation_index: 0,
            created_at: Utc::now(),
        }
    }

    /// Wraps the original seed response as a candidate.
    ///
    /// Used as the last resort of the selection fallback chain when the
    /// pool is empty.
    #[must_use]
    pub fn seed(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            backend: "seed".to_string(),
            stage: CandidateStage::Construction,
            parent_id: None,
            variation_index: 0,
            created_at: Utc::now(),
        }
    }
}
