//! Failure propagation.
//!
//! [`propagate`] and [`ready_stages`] are pure functions over a graph and a
//! status table. [`RunState`] owns the status table of one CI run and applies
//! them as each stage completes; [`SharedRunState`] shares it across threads.

mod evaluator;
mod run_state;

pub use evaluator::{
    is_eligible, propagate, ready_stages, Cancellation, Propagation, StatusTable,
};
pub use run_state::{Completion, RunState, RunSummary, SharedRunState};
