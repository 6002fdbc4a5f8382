//! Backend abstraction and the never-throws caller.
//!
//! A backend is an external text-generation service identified by name.
//! Rosters of backends are injected configuration; the pipeline never
//! instantiates backends itself.

mod caller;
#[cfg(feature = "http")]
mod http;
mod roster;

pub use caller::{BackendCaller, CallOutcome};
#[cfg(feature = "http")]
pub use http::HttpBackend;
pub use roster::BackendRoster;

use crate::errors::BackendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// One generation request to a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// System prompt establishing persona, rules, and grounding.
    pub system_prompt: String,
    /// User prompt carrying the task instruction.
    pub user_prompt: String,
    /// Sampling temperature in [0, 1].
    pub temperature: f64,
    /// Token budget for the reply.
    pub max_tokens: u32,
}

/// Trait for external text-generation backends.
///
/// Implementations may fail however they like; the [`BackendCaller`]
/// absorbs every failure into a tagged outcome.
#[async_trait]
pub trait Backend: Send + Sync + Debug {
    /// Returns the backend identity.
    fn id(&self) -> &str;

    /// Generates text for the request.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError>;
}
