//! Testing utilities for stagegraph pipelines.
//!
//! This module provides:
//! - The four-stage snapshot pipeline fixture
//! - Generated pipeline shapes
//! - Assertions over run states

mod assertions;
mod fixtures;

pub use assertions::{assert_canceled, assert_finished, assert_ready, assert_status};
pub use fixtures::{
    snapshot_pipeline, snapshot_pipeline_definition, TestPipeline, CROSS_VERSION_TEST,
    PUBLISH_SNAPSHOT, QUICK_FEEDBACK, VERIFY_ALL,
};
