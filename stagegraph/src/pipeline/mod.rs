//! Pipeline graph construction.
//!
//! This module provides:
//! - Stage and dependency specifications
//! - The two-phase graph builder with validation
//! - The immutable, topologically ordered graph
//! - Declarative pipeline definitions

mod builder;
mod definition;
mod graph;
mod spec;

pub use builder::PipelineGraphBuilder;
pub use definition::{DependencyDefinition, PipelineDefinition, StageDefinition};
pub use graph::PipelineGraph;
pub use spec::{ActionDescriptor, DependencyEdge, Parameters, Stage, StageId, Trigger};
