//! Mutable run state for one CI run.

use super::evaluator::{is_eligible, propagate, ready_stages, Cancellation, StatusTable};
use crate::core::{StageStatus, StatusTransition, TransitionCause};
use crate::errors::TransitionError;
use crate::events::{self, EventSink, NoOpEventSink};
use crate::pipeline::{PipelineGraph, StageId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Counts of stage statuses in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// The run id.
    pub run_id: Uuid,
    /// The pipeline name.
    pub pipeline: String,
    /// Total number of stages.
    pub total: usize,
    /// Stages not started yet.
    pub pending: usize,
    /// Stages currently running.
    pub running: usize,
    /// Stages that succeeded.
    pub succeeded: usize,
    /// Stages that failed.
    pub failed: usize,
    /// Stages that were canceled.
    pub canceled: usize,
}

impl RunSummary {
    /// Returns true if every stage succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.succeeded == self.total
    }

    /// Returns true if no stage is pending or running.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.pending == 0 && self.running == 0
    }
}

/// Outcome of reporting one stage's completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// The reported transition.
    pub transition: StatusTransition,
    /// Dependents canceled as a consequence, in propagation order.
    pub canceled: Vec<StatusTransition>,
    /// Stages that became eligible to start because of this completion.
    pub newly_ready: Vec<String>,
}

/// Statuses and transition history of one run over an immutable graph.
///
/// Only a stage's own completion may move it to a terminal status; all other
/// terminal transitions are cancellations derived by the evaluator.
pub struct RunState {
    run_id: Uuid,
    graph: Arc<PipelineGraph>,
    statuses: StatusTable,
    history: Vec<StatusTransition>,
    sink: Arc<dyn EventSink>,
}

impl fmt::Debug for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunState")
            .field("run_id", &self.run_id)
            .field("pipeline", &self.graph.name())
            .field("statuses", &self.statuses)
            .field("history", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl RunState {
    /// Creates a run with every stage pending and a fresh time-ordered run id.
    #[must_use]
    pub fn new(graph: Arc<PipelineGraph>) -> Self {
        let statuses = StatusTable::new(&graph);
        Self {
            run_id: Uuid::now_v7(),
            graph,
            statuses,
            history: Vec::new(),
            sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the run id.
    #[must_use]
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the run id.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the graph.
    #[must_use]
    pub fn graph(&self) -> &PipelineGraph {
        &self.graph
    }

    /// Returns the status of a stage.
    #[must_use]
    pub fn status(&self, stage: &str) -> Option<StageStatus> {
        self.graph.stage_id(stage).map(|id| self.statuses.get(id))
    }

    /// Returns the full status table.
    #[must_use]
    pub const fn statuses(&self) -> &StatusTable {
        &self.statuses
    }

    /// Returns every recorded transition in order.
    #[must_use]
    pub fn history(&self) -> &[StatusTransition] {
        &self.history
    }

    /// Names of the stages that may start now, in topological order.
    #[must_use]
    pub fn ready_stages(&self) -> Vec<&str> {
        ready_stages(&self.graph, &self.statuses)
            .into_iter()
            .map(|id| self.name(id))
            .collect()
    }

    /// Returns true if every stage is terminal.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.statuses.all_terminal()
    }

    /// Returns status counts for the run.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            pipeline: self.graph.name().to_string(),
            total: self.statuses.len(),
            pending: self.statuses.count(StageStatus::Pending),
            running: self.statuses.count(StageStatus::Running),
            succeeded: self.statuses.count(StageStatus::Succeeded),
            failed: self.statuses.count(StageStatus::Failed),
            canceled: self.statuses.count(StageStatus::Canceled),
        }
    }

    /// Marks an eligible stage as running.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::UnknownStage`] for unknown names,
    /// [`TransitionError::AlreadyTerminal`] if the stage finished, and
    /// [`TransitionError::NotReady`] if it is running or its upstreams are not done.
    pub fn start(&mut self, stage: &str) -> Result<(), TransitionError> {
        let id = self.resolve(stage)?;
        let current = self.current_non_terminal(id)?;
        if !is_eligible(&self.graph, &self.statuses, id) {
            return Err(TransitionError::NotReady {
                stage: stage.to_string(),
                status: current,
            });
        }

        self.statuses.set(id, StageStatus::Running);
        self.history.push(StatusTransition::now(
            stage,
            current,
            StageStatus::Running,
            TransitionCause::Started,
        ));
        debug!(run_id = %self.run_id, stage, "Stage started");
        self.sink.emit(
            events::STAGE_STARTED,
            Some(serde_json::json!({ "run_id": self.run_id, "stage": stage })),
        );
        Ok(())
    }

    /// Records a stage's own terminal status and propagates it to dependents.
    ///
    /// The stage may be running, or pending and eligible; orchestrators that
    /// do not report starts can complete eligible stages directly. A pending
    /// stage that is not eligible yet may only be reported canceled.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::UnknownStage`] for unknown names,
    /// [`TransitionError::NotTerminal`] if `status` is not terminal,
    /// [`TransitionError::AlreadyTerminal`] if the stage already finished or
    /// was canceled by an upstream, and [`TransitionError::NotReady`] if a
    /// pending stage reports success or failure before its upstreams allow it
    /// to start.
    pub fn complete(
        &mut self,
        stage: &str,
        status: StageStatus,
    ) -> Result<Completion, TransitionError> {
        let id = self.resolve(stage)?;
        if !status.is_terminal() {
            return Err(TransitionError::NotTerminal {
                stage: stage.to_string(),
                status,
            });
        }
        let current = self.current_non_terminal(id)?;
        if current == StageStatus::Pending
            && status != StageStatus::Canceled
            && !is_eligible(&self.graph, &self.statuses, id)
        {
            warn!(
                run_id = %self.run_id,
                stage,
                %status,
                "Rejected completion of a blocked stage"
            );
            return Err(TransitionError::NotReady {
                stage: stage.to_string(),
                status: current,
            });
        }

        self.statuses.set(id, status);
        let transition = StatusTransition::now(stage, current, status, TransitionCause::Reported);
        self.history.push(transition.clone());
        info!(run_id = %self.run_id, stage, %status, "Stage completed");
        self.sink.emit(
            events::STAGE_COMPLETED,
            Some(serde_json::json!({ "run_id": self.run_id, "stage": stage, "status": status })),
        );

        let propagation = propagate(&self.graph, &self.statuses, id);
        self.statuses = propagation.statuses;
        let canceled: Vec<StatusTransition> = propagation
            .cancellations
            .iter()
            .map(|c| self.record_cancellation(c))
            .collect();

        let newly_ready = self.newly_ready(id, &propagation.cancellations);

        if self.is_finished() {
            let summary = self.summary();
            info!(
                run_id = %self.run_id,
                pipeline = %summary.pipeline,
                succeeded = summary.succeeded,
                failed = summary.failed,
                canceled = summary.canceled,
                "Run finished"
            );
            self.sink
                .emit(events::RUN_FINISHED, serde_json::to_value(&summary).ok());
        }

        Ok(Completion {
            transition,
            canceled,
            newly_ready,
        })
    }

    fn record_cancellation(&mut self, cancellation: &Cancellation) -> StatusTransition {
        let stage = self.name(cancellation.stage).to_string();
        let upstream = self.name(cancellation.upstream).to_string();
        info!(
            run_id = %self.run_id,
            stage = %stage,
            upstream = %upstream,
            upstream_status = %cancellation.upstream_status,
            "Stage canceled by upstream"
        );
        self.sink.emit(
            events::STAGE_CANCELED,
            Some(serde_json::json!({
                "run_id": self.run_id,
                "stage": &stage,
                "upstream": &upstream,
                "upstream_status": cancellation.upstream_status,
            })),
        );

        let transition = StatusTransition::now(
            stage,
            cancellation.previous,
            StageStatus::Canceled,
            TransitionCause::from_upstream(upstream, cancellation.upstream_status),
        );
        self.history.push(transition.clone());
        transition
    }

    /// Only direct dependents of the finished stage or of a canceled stage
    /// can change eligibility.
    fn newly_ready(&self, finished: StageId, cancellations: &[Cancellation]) -> Vec<String> {
        let mut ready: Vec<String> = Vec::new();
        let sources = std::iter::once(finished).chain(cancellations.iter().map(|c| c.stage));
        for source in sources {
            for edge in self.graph.downstream_edges(source) {
                let name = self.name(edge.to);
                if is_eligible(&self.graph, &self.statuses, edge.to)
                    && !ready.iter().any(|r| r == name)
                {
                    ready.push(name.to_string());
                }
            }
        }
        ready
    }

    fn resolve(&self, stage: &str) -> Result<StageId, TransitionError> {
        self.graph
            .stage_id(stage)
            .ok_or_else(|| TransitionError::UnknownStage {
                name: stage.to_string(),
            })
    }

    fn current_non_terminal(&self, id: StageId) -> Result<StageStatus, TransitionError> {
        let current = self.statuses.get(id);
        if current.is_terminal() {
            return Err(TransitionError::AlreadyTerminal {
                stage: self.name(id).to_string(),
                status: current,
            });
        }
        Ok(current)
    }

    fn name(&self, id: StageId) -> &str {
        &self.graph.stage(id).name
    }
}

/// A cloneable handle sharing one [`RunState`] behind a single lock.
///
/// A completion and all of the cancellations it causes are applied while the
/// write lock is held, so readers never observe a half-propagated state.
#[derive(Debug, Clone)]
pub struct SharedRunState {
    inner: Arc<RwLock<RunState>>,
}

impl SharedRunState {
    /// Wraps a run state.
    #[must_use]
    pub fn new(state: RunState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// See [`RunState::start`].
    ///
    /// # Errors
    ///
    /// See [`RunState::start`].
    pub fn start(&self, stage: &str) -> Result<(), TransitionError> {
        self.inner.write().start(stage)
    }

    /// See [`RunState::complete`].
    ///
    /// # Errors
    ///
    /// See [`RunState::complete`].
    pub fn complete(
        &self,
        stage: &str,
        status: StageStatus,
    ) -> Result<Completion, TransitionError> {
        self.inner.write().complete(stage, status)
    }

    /// Returns the status of a stage.
    #[must_use]
    pub fn status(&self, stage: &str) -> Option<StageStatus> {
        self.inner.read().status(stage)
    }

    /// Names of the stages that may start now.
    #[must_use]
    pub fn ready_stages(&self) -> Vec<String> {
        self.inner
            .read()
            .ready_stages()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Returns true if every stage is terminal.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.read().is_finished()
    }

    /// Returns status counts for the run.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        self.inner.read().summary()
    }

    /// Runs `f` with shared access to the state.
    pub fn with_state<R>(&self, f: impl FnOnce(&RunState) -> R) -> R {
        f(&self.inner.read())
    }
}
