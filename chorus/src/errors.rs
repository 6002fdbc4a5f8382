//! Error types for the chorus pipeline.
//!
//! The synthesis pipeline itself is infallible by signature: backend
//! failures are absorbed into tagged outcomes at the caller boundary and
//! surfaced as diagnostics, never as errors. The enums here cover the two
//! places where `Result` is the right shape: backend implementations and
//! configuration validation.

use thiserror::Error;

/// Failure of a single backend invocation.
///
/// Produced by [`crate::backend::Backend`] implementations and converted
/// into a [`crate::backend::CallOutcome`] by the caller. A `BackendError`
/// never crosses a stage boundary.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The call exceeded its deadline.
    #[error("backend timed out after {elapsed_ms:.0}ms")]
    Timeout {
        /// Elapsed wall-clock time when the deadline fired.
        elapsed_ms: f64,
    },

    /// A transport-level failure (connect, TLS, request body).
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered but the payload could not be interpreted.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The backend rejected the request (auth, quota, server error).
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No primary selector backend was configured.
    #[error("primary selector id must not be empty")]
    MissingSelector,

    /// Variations per backend must be at least one.
    #[error("variations_per_backend must be at least 1")]
    ZeroVariations,

    /// The style stage top-N must be at least one.
    #[error("style_top_n must be at least 1")]
    ZeroTopN,

    /// A timeout budget was zero or the ceilings are not nested.
    #[error("invalid timeout budgets: {0}")]
    InvalidTimeouts(String),

    /// The token budget must be positive.
    #[error("max_tokens must be at least 1")]
    ZeroTokenBudget,

    /// The base temperature is outside [0, 1].
    #[error("base_temperature must be within [0, 1], got {0}")]
    TemperatureOutOfRange(f64),
}
