//! Test assertions for run states.

use crate::core::StageStatus;
use crate::propagation::RunState;

/// Asserts that `stage` has the expected status.
pub fn assert_status(run: &RunState, stage: &str, expected: StageStatus) {
    let actual = run.status(stage);
    assert_eq!(
        actual,
        Some(expected),
        "Expected stage '{stage}' to be {expected}, got {actual:?}"
    );
}

/// Asserts that every listed stage was canceled.
pub fn assert_canceled(run: &RunState, stages: &[&str]) {
    for stage in stages {
        assert_status(run, stage, StageStatus::Canceled);
    }
}

/// Asserts that exactly the listed stages are ready, in topological order.
pub fn assert_ready(run: &RunState, expected: &[&str]) {
    let ready = run.ready_stages();
    assert_eq!(
        ready, expected,
        "Expected ready stages {expected:?}, got {ready:?}"
    );
}

/// Asserts that every stage reached a terminal status.
pub fn assert_finished(run: &RunState) {
    let summary = run.summary();
    assert!(
        run.is_finished(),
        "Expected run to be finished, {} pending and {} running",
        summary.pending,
        summary.running
    );
}
