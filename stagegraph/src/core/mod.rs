//! Core domain model types for stagegraph.
//!
//! This module contains the fundamental types shared by the builder,
//! the graph, and the failure propagation evaluator:
//! - Stage status enum
//! - Failure actions and dependency policies
//! - Recorded status transitions

mod policy;
mod status;
mod transition;

pub use policy::{DependencyPolicy, FailureAction};
pub use status::StageStatus;
pub use transition::{StatusTransition, TransitionCause};
