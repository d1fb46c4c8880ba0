//! Immutable, validated pipeline graph.
//!
//! A graph is produced by [`PipelineGraphBuilder::build`](super::PipelineGraphBuilder::build)
//! and never changes afterwards. The orchestrator reads it to decide which
//! stages may run and how failures propagate.

use super::definition::{DependencyDefinition, PipelineDefinition, StageDefinition};
use super::{DependencyEdge, Parameters, Stage, StageId};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// A directed acyclic graph of build stages.
#[derive(Debug, Clone)]
pub struct PipelineGraph {
    /// The pipeline name.
    name: String,
    /// Stages in insertion order.
    stages: Vec<Stage>,
    /// Name lookup.
    index: HashMap<String, StageId>,
    /// All edges in declaration order.
    edges: Vec<DependencyEdge>,
    /// Outgoing edge indices per stage.
    downstream: Vec<Vec<usize>>,
    /// Incoming edge indices per stage.
    upstream: Vec<Vec<usize>>,
    /// Topologically sorted stage ids.
    topological_order: Vec<StageId>,
}

impl PipelineGraph {
    pub(crate) fn new(
        name: String,
        stages: Vec<Stage>,
        index: HashMap<String, StageId>,
        edges: Vec<DependencyEdge>,
    ) -> Self {
        let mut downstream = vec![Vec::new(); stages.len()];
        let mut upstream = vec![Vec::new(); stages.len()];
        for (i, edge) in edges.iter().enumerate() {
            downstream[edge.from.0].push(i);
            upstream[edge.to.0].push(i);
        }

        let topological_order = topological_sort(&edges, &downstream, &upstream);

        Self {
            name,
            stages,
            index,
            edges,
            downstream,
            upstream,
            topological_order,
        }
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

    /// Returns the stage for an id issued by this graph's builder.
    ///
    /// # Panics
    ///
    /// Panics if the id belongs to a different graph and is out of range.
    #[must_use]
    pub fn stage(&self, id: StageId) -> &Stage {
        &self.stages[id.0]
    }

    /// Looks up a stage id by name.
    #[must_use]
    pub fn stage_id(&self, name: &str) -> Option<StageId> {
        self.index.get(name).copied()
    }

    /// Looks up a stage by name.
    #[must_use]
    pub fn stage_by_name(&self, name: &str) -> Option<&Stage> {
        self.stage_id(name).map(|id| self.stage(id))
    }

    /// Iterates over stages in insertion order.
    pub fn stages(&self) -> impl Iterator<Item = (StageId, &Stage)> {
        self.stages.iter().enumerate().map(|(i, s)| (StageId(i), s))
    }

    /// Returns all edges in declaration order.
    #[must_use]
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Edges leaving `id`, i.e. towards its dependents.
    pub fn downstream_edges(&self, id: StageId) -> impl Iterator<Item = &DependencyEdge> {
        self.downstream[id.0].iter().map(|&e| &self.edges[e])
    }

    /// Edges entering `id`, i.e. from its dependencies.
    pub fn upstream_edges(&self, id: StageId) -> impl Iterator<Item = &DependencyEdge> {
        self.upstream[id.0].iter().map(|&e| &self.edges[e])
    }

    /// Names of the stages `name` depends on directly.
    #[must_use]
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.stage_id(name)
            .map(|id| {
                self.upstream_edges(id)
                    .map(|e| self.stages[e.from.0].name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Names of the stages that depend on `name` directly.
    #[must_use]
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.stage_id(name)
            .map(|id| {
                self.downstream_edges(id)
                    .map(|e| self.stages[e.to.0].name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Stages in an order where every stage follows all of its dependencies.
    ///
    /// Stages with no ordering constraint between them keep insertion order.
    #[must_use]
    pub fn topological_order(&self) -> &[StageId] {
        &self.topological_order
    }

    /// Stage names in topological order.
    #[must_use]
    pub fn topological_names(&self) -> Vec<&str> {
        self.topological_order
            .iter()
            .map(|id| self.stages[id.0].name.as_str())
            .collect()
    }

    /// Stages with no upstream dependency.
    #[must_use]
    pub fn roots(&self) -> Vec<StageId> {
        (0..self.stages.len())
            .filter(|&i| self.upstream[i].is_empty())
            .map(StageId)
            .collect()
    }

    /// Stages that declare at least one external trigger.
    #[must_use]
    pub fn triggered_stages(&self) -> Vec<StageId> {
        self.stages()
            .filter(|(_, s)| !s.triggers.is_empty())
            .map(|(id, _)| id)
            .collect()
    }

    /// Exports the graph as a declarative definition.
    ///
    /// Parameters are already merged per stage, so the export carries no
    /// shared parameters.
    #[must_use]
    pub fn to_definition(&self) -> PipelineDefinition {
        let stages = self
            .stages()
            .map(|(id, stage)| StageDefinition {
                name: stage.name.clone(),
                description: stage.description.clone(),
                action: stage.action.clone(),
                parameters: stage.parameters.clone(),
                triggers: stage.triggers.clone(),
                dependencies: self
                    .upstream_edges(id)
                    .map(|edge| DependencyDefinition {
                        stage: self.stages[edge.from.0].name.clone(),
                        on_failure: edge.policy.on_upstream_failure,
                        on_cancel: edge.policy.on_upstream_cancel,
                    })
                    .collect(),
            })
            .collect();

        PipelineDefinition {
            name: self.name.clone(),
            shared_parameters: Parameters::new(),
            stages,
        }
    }
}

/// Kahn's algorithm; among ready stages the earliest inserted goes first.
fn topological_sort(
    edges: &[DependencyEdge],
    downstream: &[Vec<usize>],
    upstream: &[Vec<usize>],
) -> Vec<StageId> {
    let mut in_degree: Vec<usize> = upstream.iter().map(Vec::len).collect();
    let mut ready: BinaryHeap<Reverse<usize>> = (0..in_degree.len())
        .filter(|&i| in_degree[i] == 0)
        .map(Reverse)
        .collect();
    let mut order = Vec::with_capacity(in_degree.len());

    while let Some(Reverse(node)) = ready.pop() {
        order.push(StageId(node));
        for &edge in &downstream[node] {
            let child = edges[edge].to.0;
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                ready.push(Reverse(child));
            }
        }
    }

    debug_assert_eq!(order.len(), in_degree.len(), "builder admitted a cycle");
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DependencyPolicy;
    use crate::pipeline::{ActionDescriptor, PipelineGraphBuilder, Trigger};
    use pretty_assertions::assert_eq;

    fn stage(name: &str) -> Stage {
        Stage::new(name, ActionDescriptor::new("gradle"))
    }

    fn build_diamond() -> PipelineGraph {
        PipelineGraphBuilder::new("diamond")
            .stage(stage("d"))
            .unwrap()
            .stage(stage("b"))
            .unwrap()
            .stage(stage("c"))
            .unwrap()
            .stage(stage("a").with_trigger(Trigger::vcs()))
            .unwrap()
            .dependency("a", "b", DependencyPolicy::cancel_downstream())
            .unwrap()
            .dependency("a", "c", DependencyPolicy::ignore())
            .unwrap()
            .dependency("b", "d", DependencyPolicy::cancel_downstream())
            .unwrap()
            .dependency("c", "d", DependencyPolicy::cancel_downstream())
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_graph_creation() {
        let graph = build_diamond();
        assert_eq!(graph.name(), "diamond");
        assert_eq!(graph.stage_count(), 4);
        assert_eq!(graph.edges().len(), 4);
    }

    #[test]
    fn test_topological_order() {
        let graph = build_diamond();
        assert_eq!(graph.topological_names(), vec!["a", "b", "c", "d"]);

        let position = |name: &str| {
            graph
                .topological_order()
                .iter()
                .position(|&id| graph.stage(id).name == name)
                .unwrap()
        };
        for edge in graph.edges() {
            assert!(position(&graph.stage(edge.from).name) < position(&graph.stage(edge.to).name));
        }
    }

    #[test]
    fn test_independent_stages_keep_insertion_order() {
        let graph = PipelineGraphBuilder::new("flat")
            .stage(stage("z"))
            .unwrap()
            .stage(stage("y"))
            .unwrap()
            .stage(stage("x"))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(graph.topological_names(), vec!["z", "y", "x"]);
        assert_eq!(graph.roots().len(), 3);
    }

    #[test]
    fn test_ties_follow_insertion_order_not_discovery() {
        let graph = PipelineGraphBuilder::new("ci")
            .stage(stage("build"))
            .unwrap()
            .stage(stage("test"))
            .unwrap()
            .stage(stage("lint"))
            .unwrap()
            .dependency("build", "test", DependencyPolicy::cancel_downstream())
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(graph.topological_names(), vec!["build", "test", "lint"]);
    }

    #[test]
    fn test_neighbours() {
        let graph = build_diamond();
        assert_eq!(graph.dependencies_of("d"), vec!["b", "c"]);
        assert_eq!(graph.dependents_of("a"), vec!["b", "c"]);
        assert!(graph.dependencies_of("a").is_empty());
        assert!(graph.dependents_of("missing").is_empty());
    }

    #[test]
    fn test_roots_and_triggers() {
        let graph = build_diamond();
        let a = graph.stage_id("a").unwrap();

        assert_eq!(graph.roots(), vec![a]);
        assert_eq!(graph.triggered_stages(), vec![a]);
        assert!(graph.stage_by_name("b").is_some());
        assert!(graph.stage_by_name("nope").is_none());
    }

    #[test]
    fn test_to_definition_preserves_edges() {
        let graph = build_diamond();
        let definition = graph.to_definition();

        let d = definition.stages.iter().find(|s| s.name == "d").unwrap();
        let upstream: Vec<&str> = d.dependencies.iter().map(|dep| dep.stage.as_str()).collect();
        assert_eq!(upstream, vec!["b", "c"]);
        assert_eq!(definition.stages.len(), 4);
    }
}
