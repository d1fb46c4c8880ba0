//! Event sink system for observability.
//!
//! Run-state transitions are reported through an [`EventSink`] passed in
//! explicitly when the run state is created.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Event emitted when a stage starts running.
pub const STAGE_STARTED: &str = "stage.started";
/// Event emitted when a stage's own completion is reported.
pub const STAGE_COMPLETED: &str = "stage.completed";
/// Event emitted when a stage is canceled by an upstream stage.
pub const STAGE_CANCELED: &str = "stage.canceled";
/// Event emitted once every stage has reached a terminal status.
pub const RUN_FINISHED: &str = "run.finished";
