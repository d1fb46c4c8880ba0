//! # Stagegraph
//!
//! Validated CI build-stage graphs with failure propagation.
//!
//! Stagegraph models a CI pipeline as a directed acyclic graph of stages and
//! decides, for one run, which stages may start and which must be canceled:
//!
//! - **Validated construction**: stages and dependencies are checked as they
//!   are added; cycles, duplicates, and dangling references are rejected
//! - **Immutable graphs**: a built graph carries a deterministic topological order
//! - **Per-edge failure policy**: each dependency decides whether an upstream
//!   failure or cancellation cancels the dependent
//! - **Run state**: statuses, transition history, and event emission for one run
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stagegraph::prelude::*;
//! use std::sync::Arc;
//!
//! let graph = PipelineGraphBuilder::new("plugin")
//!     .stage(Stage::new("Quick Feedback", ActionDescriptor::new("gradle")))?
//!     .stage(Stage::new("Verify all", ActionDescriptor::new("noop")))?
//!     .dependency("Quick Feedback", "Verify all", DependencyPolicy::cancel_downstream())?
//!     .build()?;
//!
//! let mut run = RunState::new(Arc::new(graph));
//! run.start("Quick Feedback")?;
//! let completion = run.complete("Quick Feedback", StageStatus::Failed)?;
//! assert_eq!(run.status("Verify all"), Some(StageStatus::Canceled));
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

pub mod core;
pub mod errors;
pub mod events;
pub mod pipeline;
pub mod propagation;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        DependencyPolicy, FailureAction, StageStatus, StatusTransition, TransitionCause,
    };
    pub use crate::errors::{
        ConfigError, CycleError, GraphError, StagegraphError, TransitionError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::pipeline::{
        ActionDescriptor, Parameters, PipelineDefinition, PipelineGraph, PipelineGraphBuilder,
        Stage, StageId, Trigger,
    };
    pub use crate::propagation::{Completion, RunState, RunSummary, SharedRunState};
}
