//! Test fixtures for pipeline graphs.

use crate::core::DependencyPolicy;
use crate::errors::GraphError;
use crate::pipeline::{
    ActionDescriptor, DependencyDefinition, Parameters, PipelineDefinition, PipelineGraph,
    PipelineGraphBuilder, Stage, StageDefinition, Trigger,
};
use std::collections::BTreeSet;

/// Quick feedback build stage name.
pub const QUICK_FEEDBACK: &str = "Quick Feedback";
/// Cross-version test stage name.
pub const CROSS_VERSION_TEST: &str = "CrossVersionTest Linux - Java 1.8";
/// Aggregate verification gate stage name.
pub const VERIFY_ALL: &str = "Verify all";
/// Snapshot publishing stage name.
pub const PUBLISH_SNAPSHOT: &str = "Publish Snapshot";

const ARTIFACTORY_MODULE_VERSION: &str =
    "org.jfrog.artifactory.selectedDeployableServer.defaultModuleVersionConfiguration";

fn gradle(tasks: &str) -> ActionDescriptor {
    ActionDescriptor::new("gradle")
        .with_tasks(tasks)
        .with_build_file("")
}

fn cancel_on(stage: &str) -> DependencyDefinition {
    let policy = DependencyPolicy::cancel_downstream();
    DependencyDefinition {
        stage: stage.to_string(),
        on_failure: policy.on_upstream_failure,
        on_cancel: policy.on_upstream_cancel,
    }
}

/// The four-stage snapshot pipeline: quick feedback, cross-version test,
/// verification gate, and snapshot publish, all chained with cancel policies.
#[must_use]
pub fn snapshot_pipeline_definition() -> PipelineDefinition {
    let quick = StageDefinition {
        name: QUICK_FEEDBACK.to_string(),
        description: None,
        action: gradle("clean build"),
        parameters: Parameters::new(),
        triggers: BTreeSet::new(),
        dependencies: Vec::new(),
    };

    let cross_version = StageDefinition {
        name: CROSS_VERSION_TEST.to_string(),
        description: None,
        action: gradle("clean testAll")
            .with_argument("-s")
            .with_property(ARTIFACTORY_MODULE_VERSION, "GLOBAL"),
        parameters: Parameters::new(),
        triggers: BTreeSet::new(),
        dependencies: vec![cancel_on(QUICK_FEEDBACK)],
    };

    let verify_all = StageDefinition {
        name: VERIFY_ALL.to_string(),
        description: None,
        action: ActionDescriptor::new("noop"),
        parameters: Parameters::new(),
        triggers: BTreeSet::from([Trigger::vcs()]),
        dependencies: vec![cancel_on(QUICK_FEEDBACK), cancel_on(CROSS_VERSION_TEST)],
    };

    let publish = StageDefinition {
        name: PUBLISH_SNAPSHOT.to_string(),
        description: Some(
            "Publish Gradle Test Retry Plugin snapshot to Gradle's Artifactory repository"
                .to_string(),
        ),
        action: gradle(
            "clean devSnapshot publishPluginMavenPublicationToGradleBuildInternalRepository",
        )
        .with_argument("-PartifactoryUsername=%ARTIFACTORY_USERNAME%")
        .with_argument("-PartifactoryPassword=%ARTIFACTORY_PASSWORD%")
        .with_property(ARTIFACTORY_MODULE_VERSION, "GLOBAL"),
        parameters: Parameters::new()
            .with("ARTIFACTORY_USERNAME", "bot-build-tool")
            .with_secret(
                "ARTIFACTORY_PASSWORD",
                "credentialsJSON:2b7529cd-77cd-49f4-9416-9461f6ac9018",
            )
            .with("systemProp.org.gradle.internal.publish.checksums.insecure", "true"),
        triggers: BTreeSet::new(),
        dependencies: vec![cancel_on(VERIFY_ALL)],
    };

    PipelineDefinition {
        name: "gradle-test-retry-plugin".to_string(),
        shared_parameters: Parameters::new(),
        stages: vec![quick, cross_version, verify_all, publish],
    }
}

/// Builds [`snapshot_pipeline_definition`] into a graph.
///
/// # Errors
///
/// Never fails for the fixture as shipped; the `Result` mirrors
/// [`PipelineDefinition::build`].
pub fn snapshot_pipeline() -> Result<PipelineGraph, GraphError> {
    snapshot_pipeline_definition().build()
}

/// A generated pipeline shape for tests and benchmarks.
#[derive(Debug, Clone)]
pub struct TestPipeline {
    /// Pipeline name.
    pub name: String,
    /// Stage names in order.
    pub stages: Vec<String>,
    /// Edges as `(from, to)` indices into `stages`.
    pub edges: Vec<(usize, usize)>,
    /// Policy applied to every edge.
    pub policy: DependencyPolicy,
}

impl TestPipeline {
    /// Creates an empty test pipeline.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            edges: Vec::new(),
            policy: DependencyPolicy::cancel_downstream(),
        }
    }

    /// Creates a chain `stage_0 -> stage_1 -> ... -> stage_{count-1}`.
    #[must_use]
    pub fn linear(name: impl Into<String>, count: usize) -> Self {
        let mut pipeline = Self::new(name);
        pipeline.stages = (0..count).map(|i| format!("stage_{i}")).collect();
        pipeline.edges = (1..count).map(|i| (i - 1, i)).collect();
        pipeline
    }

    /// Creates one root fanning out to `width` independent stages.
    #[must_use]
    pub fn fan_out(name: impl Into<String>, width: usize) -> Self {
        let mut pipeline = Self::new(name);
        pipeline.stages.push("root".to_string());
        pipeline
            .stages
            .extend((0..width).map(|i| format!("leaf_{i}")));
        pipeline.edges = (1..=width).map(|i| (0, i)).collect();
        pipeline
    }

    /// Sets the policy applied to every edge.
    #[must_use]
    pub fn with_policy(mut self, policy: DependencyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the stage names.
    #[must_use]
    pub fn stage_names(&self) -> &[String] {
        &self.stages
    }

    /// Builds the graph.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] if the shape is invalid, e.g. empty or cyclic.
    pub fn build(&self) -> Result<PipelineGraph, GraphError> {
        let mut builder = PipelineGraphBuilder::new(&self.name);
        for name in &self.stages {
            builder.add_stage(Stage::new(name, ActionDescriptor::new("noop")))?;
        }
        for &(from, to) in &self.edges {
            builder.add_dependency(&self.stages[from], &self.stages[to], self.policy)?;
        }
        builder.build()
    }
}
