//! Failure propagation evaluator.
//!
//! Pure functions over an immutable [`PipelineGraph`] and a [`StatusTable`].
//! Nothing here holds state between calls; callers apply the result.

use crate::core::StageStatus;
use crate::pipeline::{PipelineGraph, StageId};
use std::collections::VecDeque;

/// Status of every stage in one run, indexed by [`StageId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTable {
    statuses: Vec<StageStatus>,
}

impl StatusTable {
    /// Creates a table with every stage of `graph` pending.
    #[must_use]
    pub fn new(graph: &PipelineGraph) -> Self {
        Self {
            statuses: vec![StageStatus::Pending; graph.stage_count()],
        }
    }

    /// Returns the status of a stage.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to the graph the table was created for.
    #[must_use]
    pub fn get(&self, id: StageId) -> StageStatus {
        self.statuses[id.index()]
    }

    /// Sets the status of a stage.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to the graph the table was created for.
    pub fn set(&mut self, id: StageId, status: StageStatus) {
        self.statuses[id.index()] = status;
    }

    /// Iterates over all stages and their statuses.
    pub fn iter(&self) -> impl Iterator<Item = (StageId, StageStatus)> + '_ {
        self.statuses
            .iter()
            .enumerate()
            .map(|(i, &s)| (StageId(i), s))
    }

    /// Returns the number of stages with `status`.
    #[must_use]
    pub fn count(&self, status: StageStatus) -> usize {
        self.statuses.iter().filter(|&&s| s == status).count()
    }

    /// Returns true if every stage is terminal.
    #[must_use]
    pub fn all_terminal(&self) -> bool {
        self.statuses.iter().all(StageStatus::is_terminal)
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    /// Returns true if the table has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

/// A dependent canceled because of an upstream stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancellation {
    /// The canceled stage.
    pub stage: StageId,
    /// The status the stage had before it was canceled.
    pub previous: StageStatus,
    /// The upstream stage whose edge triggered the cancellation.
    pub upstream: StageId,
    /// The upstream's terminal status.
    pub upstream_status: StageStatus,
}

/// Result of evaluating one finished stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Propagation {
    /// The statuses after propagation.
    pub statuses: StatusTable,
    /// Cancellations in the order they were applied.
    pub cancellations: Vec<Cancellation>,
}

/// Applies the failure policies of every edge leaving `finished`, transitively.
///
/// A failed upstream applies `on_upstream_failure`, a canceled one applies
/// `on_upstream_cancel`, and a successful one never propagates. Each
/// cancellation is evaluated again for the canceled stage's own dependents.
/// Stages that are already terminal are never changed, so every stage is
/// canceled at most once and the walk ends because the graph is acyclic.
///
/// # Panics
///
/// `statuses` must be a table created for `graph`. Debug builds check the
/// table size; release builds may panic on an out-of-range index.
#[must_use]
pub fn propagate(graph: &PipelineGraph, statuses: &StatusTable, finished: StageId) -> Propagation {
    debug_assert_eq!(statuses.len(), graph.stage_count(), "status table belongs to another graph");
    let mut next = statuses.clone();
    let mut cancellations = Vec::new();
    let mut worklist = VecDeque::from([finished]);

    while let Some(upstream) = worklist.pop_front() {
        let upstream_status = next.get(upstream);
        for edge in graph.downstream_edges(upstream) {
            let previous = next.get(edge.to);
            if previous.is_terminal() || !edge.policy.cancels_on(upstream_status) {
                continue;
            }
            next.set(edge.to, StageStatus::Canceled);
            cancellations.push(Cancellation {
                stage: edge.to,
                previous,
                upstream,
                upstream_status,
            });
            worklist.push_back(edge.to);
        }
    }

    Propagation {
        statuses: next,
        cancellations,
    }
}

/// Returns true if `id` is pending and may start now.
///
/// Every upstream must be terminal, and no edge may map its upstream's status
/// to a cancellation.
#[must_use]
pub fn is_eligible(graph: &PipelineGraph, statuses: &StatusTable, id: StageId) -> bool {
    statuses.get(id) == StageStatus::Pending
        && graph.upstream_edges(id).all(|edge| {
            let upstream = statuses.get(edge.from);
            upstream.is_terminal() && !edge.policy.cancels_on(upstream)
        })
}

/// All stages that may start now, in topological order.
///
/// # Panics
///
/// Same precondition as [`propagate`]: `statuses` must belong to `graph`.
#[must_use]
pub fn ready_stages(graph: &PipelineGraph, statuses: &StatusTable) -> Vec<StageId> {
    debug_assert_eq!(statuses.len(), graph.stage_count(), "status table belongs to another graph");
    graph
        .topological_order()
        .iter()
        .copied()
        .filter(|&id| is_eligible(graph, statuses, id))
        .collect()
}
