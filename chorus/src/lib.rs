//! # Chorus
//!
//! A multi-backend response synthesis pipeline for chat automation.
//!
//! Chorus takes a seed chat response and improves it by fanning out to
//! rosters of external text-generation backends in three bounded stages:
//!
//! - **Construction**: every construction backend produces several
//!   stylistic variations of the seed, fully in parallel
//! - **Style**: the top construction candidates are polished by a second
//!   roster of style backends
//! - **Selection**: a selector backend nominates its own candidate, then
//!   ranks the full pool and picks a winner, with backup selectors and a
//!   deterministic fallback chain behind it
//!
//! Every stage is bounded by a deadline, every backend call by its own
//! timeout, and the whole run by a pipeline ceiling. The documented
//! guarantee is that [`pipeline::SynthesisPipeline::synthesize`] always
//! returns a populated result, degrading to the seed response when every
//! backend fails.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chorus::prelude::*;
//!
//! let roster = BackendRoster::new()
//!     .register(my_backend_a)
//!     .register(my_backend_b);
//!
//! let pipeline = SynthesisPipeline::new(roster, SynthesisConfig::default())?;
//! let result = pipeline.synthesize("Sure, I can help with that!", &context).await;
//! println!("{}", result.final_text);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod backend;
pub mod candidate;
pub mod config;
pub mod context;
pub mod errors;
pub mod events;
pub mod fanout;
pub mod pipeline;
pub mod prompts;
pub mod stages;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::backend::{
        Backend, BackendCaller, BackendRoster, CallOutcome, GenerationRequest,
    };
    pub use crate::candidate::{Candidate, CandidateStage};
    pub use crate::config::SynthesisConfig;
    pub use crate::context::{PipelineContext, Turn};
    pub use crate::errors::{BackendError, ConfigError};
    pub use crate::events::{
        CollectingEventSink, EventSink, NoOpEventSink, PipelineEvent, TracingEventSink,
    };
    pub use crate::pipeline::{PipelineResult, SynthesisPipeline};
    pub use crate::stages::{SelectionDecision, StageReport};
}
