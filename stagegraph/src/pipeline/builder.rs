//! Two-phase pipeline graph builder with validation.

use super::{DependencyEdge, PipelineGraph, Stage, StageId};
use crate::core::DependencyPolicy;
use crate::errors::{
    CycleError, DuplicateDependencyError, DuplicateStageError, EmptyGraphError, GraphError,
    NameKind, UnknownStageError,
};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

/// Builder for creating validated pipeline graphs.
///
/// Every mutation is validated eagerly. A rejected call leaves the builder
/// exactly as it was before the call.
#[derive(Debug, Clone)]
pub struct PipelineGraphBuilder {
    /// The pipeline name.
    name: String,
    /// Stages in insertion order, indexed by `StageId`.
    stages: Vec<Stage>,
    /// Name lookup.
    index: HashMap<String, StageId>,
    /// Edges in declaration order.
    edges: Vec<DependencyEdge>,
    /// Outgoing edge indices per stage.
    downstream: Vec<Vec<usize>>,
}

impl PipelineGraphBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            downstream: Vec::new(),
        }
    }

    /// Adds a stage and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateStage`] if the name is taken and
    /// [`GraphError::InvalidName`] if the name or a parameter key is malformed.
    pub fn add_stage(&mut self, stage: Stage) -> Result<StageId, GraphError> {
        stage.validate()?;
        if self.index.contains_key(&stage.name) {
            warn!(pipeline = %self.name, stage = %stage.name, "Rejected duplicate stage");
            return Err(DuplicateStageError::new(&stage.name).into());
        }

        let id = StageId(self.stages.len());
        debug!(
            pipeline = %self.name,
            stage = %stage.name,
            runner = %stage.action.runner,
            triggers = stage.triggers.len(),
            "Added stage"
        );
        self.index.insert(stage.name.clone(), id);
        self.stages.push(stage);
        self.downstream.push(Vec::new());
        Ok(id)
    }

    /// Declares that `to` depends on `from`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownStage`] if either endpoint was not added,
    /// [`GraphError::DuplicateDependency`] if the edge already exists, and
    /// [`GraphError::Cycle`] if `from` is reachable from `to`.
    pub fn add_dependency(
        &mut self,
        from: &str,
        to: &str,
        policy: DependencyPolicy,
    ) -> Result<(), GraphError> {
        let upstream = self.resolve(from, from, to)?;
        let downstream = self.resolve(to, from, to)?;

        if self.downstream[upstream.0]
            .iter()
            .any(|&e| self.edges[e].to == downstream)
        {
            return Err(DuplicateDependencyError::new(from, to).into());
        }

        if let Some(path) = self.path_between(downstream, upstream) {
            let mut cycle_path = Vec::with_capacity(path.len() + 1);
            cycle_path.push(from.to_string());
            cycle_path.extend(path.into_iter().map(|id| self.stages[id.0].name.clone()));
            warn!(
                pipeline = %self.name,
                cycle = %cycle_path.join(" -> "),
                "Rejected cyclic dependency"
            );
            return Err(CycleError::new(cycle_path).into());
        }

        debug!(
            pipeline = %self.name,
            from,
            to,
            on_failure = %policy.on_upstream_failure,
            on_cancel = %policy.on_upstream_cancel,
            "Added dependency"
        );
        self.downstream[upstream.0].push(self.edges.len());
        self.edges.push(DependencyEdge {
            from: upstream,
            to: downstream,
            policy,
        });
        Ok(())
    }

    /// Fluent form of [`add_stage`](Self::add_stage).
    ///
    /// # Errors
    ///
    /// See [`add_stage`](Self::add_stage).
    pub fn stage(mut self, stage: Stage) -> Result<Self, GraphError> {
        self.add_stage(stage)?;
        Ok(self)
    }

    /// Fluent form of [`add_dependency`](Self::add_dependency).
    ///
    /// # Errors
    ///
    /// See [`add_dependency`](Self::add_dependency).
    pub fn dependency(
        mut self,
        from: &str,
        to: &str,
        policy: DependencyPolicy,
    ) -> Result<Self, GraphError> {
        self.add_dependency(from, to, policy)?;
        Ok(self)
    }

    /// Builds the immutable graph.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EmptyGraph`] if no stages were added and
    /// [`GraphError::InvalidName`] if the pipeline name is empty.
    pub fn build(self) -> Result<PipelineGraph, GraphError> {
        super::spec::validate_name(&self.name, NameKind::Pipeline)?;
        if self.stages.is_empty() {
            return Err(EmptyGraphError::new(&self.name).into());
        }

        debug!(
            pipeline = %self.name,
            stages = self.stages.len(),
            dependencies = self.edges.len(),
            "Built pipeline graph"
        );
        Ok(PipelineGraph::new(self.name, self.stages, self.index, self.edges))
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Returns the number of dependency edges.
    #[must_use]
    pub fn dependency_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns the id of a stage if it was added.
    #[must_use]
    pub fn stage_id(&self, name: &str) -> Option<StageId> {
        self.index.get(name).copied()
    }

    fn resolve(&self, name: &str, from: &str, to: &str) -> Result<StageId, UnknownStageError> {
        self.stage_id(name)
            .ok_or_else(|| UnknownStageError::new(name, from, to))
    }

    /// Breadth-first search along downstream edges; returns `start ..= target`.
    fn path_between(&self, start: StageId, target: StageId) -> Option<Vec<StageId>> {
        let mut parent: Vec<Option<StageId>> = vec![None; self.stages.len()];
        let mut seen = vec![false; self.stages.len()];
        let mut queue = VecDeque::from([start]);
        seen[start.0] = true;

        while let Some(node) = queue.pop_front() {
            if node == target {
                let mut path = vec![node];
                let mut cursor = node;
                while let Some(prev) = parent[cursor.0] {
                    path.push(prev);
                    cursor = prev;
                }
                path.reverse();
                return Some(path);
            }
            for &edge in &self.downstream[node.0] {
                let next = self.edges[edge].to;
                if !seen[next.0] {
                    seen[next.0] = true;
                    parent[next.0] = Some(node);
                    queue.push_back(next);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FailureAction;
    use crate::pipeline::ActionDescriptor;
    use pretty_assertions::assert_eq;

    fn stage(name: &str) -> Stage {
        Stage::new(name, ActionDescriptor::new("gradle"))
    }

    fn chain(names: &[&str]) -> PipelineGraphBuilder {
        let mut builder = PipelineGraphBuilder::new("test");
        for name in names {
            builder.add_stage(stage(name)).unwrap();
        }
        for pair in names.windows(2) {
            builder
                .add_dependency(pair[0], pair[1], DependencyPolicy::cancel_downstream())
                .unwrap();
        }
        builder
    }

    #[test]
    fn test_builder_creation() {
        let builder = PipelineGraphBuilder::new("test");
        assert_eq!(builder.name(), "test");
        assert_eq!(builder.stage_count(), 0);
        assert_eq!(builder.dependency_count(), 0);
    }

    #[test]
    fn test_add_stage_returns_sequential_ids() {
        let mut builder = PipelineGraphBuilder::new("test");
        let a = builder.add_stage(stage("a")).unwrap();
        let b = builder.add_stage(stage("b")).unwrap();

        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(builder.stage_id("b"), Some(b));
    }

    #[test]
    fn test_duplicate_stage_rejected() {
        let mut builder = PipelineGraphBuilder::new("test");
        builder.add_stage(stage("quick")).unwrap();

        let err = builder.add_stage(stage("quick")).unwrap_err();
        assert_eq!(err, GraphError::DuplicateStage(DuplicateStageError::new("quick")));
        assert_eq!(builder.stage_count(), 1);
    }

    #[test]
    fn test_invalid_stage_name_rejected() {
        let mut builder = PipelineGraphBuilder::new("test");
        let err = builder.add_stage(stage("  ")).unwrap_err();

        assert!(matches!(err, GraphError::InvalidName(_)));
        assert_eq!(builder.stage_count(), 0);
    }

    #[test]
    fn test_unknown_stage_rejected() {
        let mut builder = PipelineGraphBuilder::new("test");
        builder.add_stage(stage("a")).unwrap();

        let err = builder
            .add_dependency("a", "missing", DependencyPolicy::default())
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownStage(UnknownStageError::new("missing", "a", "missing"))
        );

        let err = builder
            .add_dependency("ghost", "a", DependencyPolicy::default())
            .unwrap_err();
        assert_eq!(err.info().code, "GRAPH-002-UNKNOWN_STAGE");
        assert_eq!(builder.dependency_count(), 0);
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let mut builder = PipelineGraphBuilder::new("test");
        builder.add_stage(stage("a")).unwrap();

        let err = builder
            .add_dependency("a", "a", DependencyPolicy::default())
            .unwrap_err();
        assert_eq!(err, GraphError::Cycle(CycleError::new(vec!["a".into(), "a".into()])));
    }

    #[test]
    fn test_cycle_rejected_and_builder_unchanged() {
        let mut builder = chain(&["a", "b", "c"]);

        let err = builder
            .add_dependency("c", "a", DependencyPolicy::cancel_downstream())
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::Cycle(CycleError::new(vec![
                "c".into(),
                "a".into(),
                "b".into(),
                "c".into(),
            ]))
        );
        assert_eq!(builder.dependency_count(), 2);

        let graph = builder.build().unwrap();
        assert_eq!(graph.edges().len(), 2);
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let mut builder = chain(&["a", "b", "d"]);
        builder.add_stage(stage("c")).unwrap();
        builder.add_dependency("a", "c", DependencyPolicy::default()).unwrap();
        builder.add_dependency("c", "d", DependencyPolicy::default()).unwrap();

        assert_eq!(builder.dependency_count(), 4);
    }

    #[test]
    fn test_duplicate_dependency_rejected() {
        let mut builder = chain(&["a", "b"]);
        let policy = DependencyPolicy::new(FailureAction::Ignore, FailureAction::Ignore);

        let err = builder.add_dependency("a", "b", policy).unwrap_err();
        assert_eq!(
            err,
            GraphError::DuplicateDependency(DuplicateDependencyError::new("a", "b"))
        );
    }

    #[test]
    fn test_empty_build() {
        let err = PipelineGraphBuilder::new("test").build().unwrap_err();
        assert_eq!(err, GraphError::EmptyGraph(EmptyGraphError::new("test")));
        assert_eq!(err.info().code, "GRAPH-004-EMPTY");
    }

    #[test]
    fn test_empty_pipeline_name_rejected() {
        let err = PipelineGraphBuilder::new(" ")
            .stage(stage("a"))
            .unwrap()
            .build()
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidName(_)));
    }

    #[test]
    fn test_fluent_build_success() {
        let graph = PipelineGraphBuilder::new("test")
            .stage(stage("stage1"))
            .unwrap()
            .stage(stage("stage2"))
            .unwrap()
            .dependency("stage1", "stage2", DependencyPolicy::cancel_downstream())
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(graph.name(), "test");
        assert_eq!(graph.stage_count(), 2);
    }
}
