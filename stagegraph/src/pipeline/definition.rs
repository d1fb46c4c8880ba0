//! Declarative pipeline definitions.
//!
//! A [`PipelineDefinition`] is the serialized input contract: stages, their
//! actions and parameters, trigger conditions, and dependency edges tagged with
//! failure actions. It is plain data; [`PipelineDefinition::build`] turns it
//! into a validated [`PipelineGraph`].
//!
//! ```json
//! {
//!   "name": "test-retry",
//!   "stages": [
//!     { "name": "Quick Feedback", "action": { "runner": "gradle", "tasks": ["clean", "build"] } },
//!     {
//!       "name": "Verify all",
//!       "action": { "runner": "noop" },
//!       "triggers": [{ "type": "vcs" }],
//!       "dependencies": [
//!         { "stage": "Quick Feedback", "on_failure": "CANCEL", "on_cancel": "CANCEL" }
//!       ]
//!     }
//!   ]
//! }
//! ```

use super::{ActionDescriptor, Parameters, PipelineGraph, PipelineGraphBuilder, Stage, Trigger};
use crate::core::{DependencyPolicy, FailureAction};
use crate::errors::{ConfigError, GraphError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

/// Serialized description of a whole pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineDefinition {
    /// The pipeline name.
    pub name: String,
    /// Parameters passed into every stage; stage-level values win.
    #[serde(default, skip_serializing_if = "Parameters::is_empty")]
    pub shared_parameters: Parameters,
    /// Stages in declaration order.
    pub stages: Vec<StageDefinition>,
}

/// Serialized description of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageDefinition {
    /// Unique stage name.
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Opaque action.
    pub action: ActionDescriptor,
    /// Stage parameters.
    #[serde(default, skip_serializing_if = "Parameters::is_empty")]
    pub parameters: Parameters,
    /// External trigger conditions.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub triggers: BTreeSet<Trigger>,
    /// Upstream stages this stage waits for.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyDefinition>,
}

/// Serialized dependency on an upstream stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencyDefinition {
    /// The upstream stage name.
    pub stage: String,
    /// Applied when the upstream fails.
    #[serde(default)]
    pub on_failure: FailureAction,
    /// Applied when the upstream is canceled.
    #[serde(default)]
    pub on_cancel: FailureAction,
}

impl DependencyDefinition {
    /// Returns the edge policy.
    #[must_use]
    pub const fn policy(&self) -> DependencyPolicy {
        DependencyPolicy::new(self.on_failure, self.on_cancel)
    }
}

impl PipelineDefinition {
    /// Parses a definition from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if the text does not match the schema.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON definition file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Json`] if it does not match the schema.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = text.len(), "Loaded pipeline definition");
        Self::from_json(&text)
    }

    /// Reads a JSON definition file and builds it into a graph.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Json`] if the file cannot
    /// be loaded and [`ConfigError::Graph`] if it describes an invalid graph.
    pub fn load(path: impl AsRef<Path>) -> Result<PipelineGraph, ConfigError> {
        let path = path.as_ref();
        let graph = Self::from_path(path)?.build()?;
        debug!(
            path = %path.display(),
            pipeline = %graph.name(),
            stages = graph.stage_count(),
            "Loaded pipeline graph"
        );
        Ok(graph)
    }

    /// Serializes the definition as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builds a validated graph.
    ///
    /// All stages are added first so dependencies may reference stages
    /// declared later; dependencies are then added in declaration order.
    ///
    /// # Errors
    ///
    /// Returns the first [`GraphError`] encountered.
    pub fn build(&self) -> Result<PipelineGraph, GraphError> {
        self.shared_parameters.validate()?;

        let mut builder = PipelineGraphBuilder::new(&self.name);
        for def in &self.stages {
            let mut stage = Stage::new(&def.name, def.action.clone())
                .with_parameters(def.parameters.layered_over(&self.shared_parameters));
            stage.description.clone_from(&def.description);
            stage.triggers.clone_from(&def.triggers);
            builder.add_stage(stage)?;
        }

        for def in &self.stages {
            for dep in &def.dependencies {
                builder.add_dependency(&dep.stage, &def.name, dep.policy())?;
            }
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{CycleError, UnknownStageError};
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const FORWARD_REFERENCE: &str = r#"{
        "name": "forward",
        "stages": [
            {
                "name": "publish",
                "action": { "runner": "gradle" },
                "dependencies": [{ "stage": "build", "on_failure": "CANCEL" }]
            },
            { "name": "build", "action": { "runner": "gradle", "tasks": ["build"] } }
        ]
    }"#;

    #[test]
    fn test_parse_and_build_forward_reference() {
        let definition = PipelineDefinition::from_json(FORWARD_REFERENCE).unwrap();
        let graph = definition.build().unwrap();

        assert_eq!(graph.topological_names(), vec!["build", "publish"]);
        let edge = graph.edges()[0];
        assert_eq!(edge.policy.on_upstream_failure, FailureAction::CancelDownstream);
        assert_eq!(edge.policy.on_upstream_cancel, FailureAction::Ignore);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = PipelineDefinition::from_json(r#"{"name": "x", "stages": [], "extra": 1}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_unknown_dependency_fails() {
        let json = r#"{
            "name": "broken",
            "stages": [{
                "name": "a",
                "action": { "runner": "gradle" },
                "dependencies": [{ "stage": "ghost" }]
            }]
        }"#;
        let err = PipelineDefinition::from_json(json).unwrap().build().unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownStage(UnknownStageError::new("ghost", "ghost", "a"))
        );
    }

    #[test]
    fn test_cyclic_definition_fails() {
        let json = r#"{
            "name": "loop",
            "stages": [
                { "name": "a", "action": { "runner": "x" }, "dependencies": [{ "stage": "b" }] },
                { "name": "b", "action": { "runner": "x" }, "dependencies": [{ "stage": "a" }] }
            ]
        }"#;
        let err = PipelineDefinition::from_json(json).unwrap().build().unwrap_err();
        assert_eq!(
            err,
            GraphError::Cycle(CycleError::new(vec!["a".into(), "b".into(), "a".into()]))
        );
    }

    #[test]
    fn test_empty_definition_fails() {
        let err = PipelineDefinition::from_json(r#"{"name": "none", "stages": []}"#)
            .unwrap()
            .build()
            .unwrap_err();
        assert!(matches!(err, GraphError::EmptyGraph(_)));
    }

    #[test]
    fn test_shared_parameters_are_merged_into_stages() {
        let json = r#"{
            "name": "params",
            "shared_parameters": {
                "values": {
                    "ARTIFACTORY_USERNAME": "bot-build-tool",
                    "ARTIFACTORY_PASSWORD": "credentialsJSON:1"
                },
                "secret": ["ARTIFACTORY_PASSWORD"]
            },
            "stages": [
                { "name": "a", "action": { "runner": "x" } },
                {
                    "name": "b",
                    "action": { "runner": "x" },
                    "parameters": {
                        "values": { "ARTIFACTORY_USERNAME": "override" }
                    }
                }
            ]
        }"#;
        let graph = PipelineDefinition::from_json(json).unwrap().build().unwrap();

        let a = &graph.stage_by_name("a").unwrap().parameters;
        let b = &graph.stage_by_name("b").unwrap().parameters;
        assert_eq!(a.get("ARTIFACTORY_USERNAME"), Some("bot-build-tool"));
        assert!(a.is_secret("ARTIFACTORY_PASSWORD"));
        assert_eq!(b.get("ARTIFACTORY_USERNAME"), Some("override"));
        assert_eq!(b.get("ARTIFACTORY_PASSWORD"), Some("credentialsJSON:1"));
    }

    #[test]
    fn test_round_trip_through_graph() {
        let definition = PipelineDefinition::from_json(FORWARD_REFERENCE).unwrap();
        let exported = definition.build().unwrap().to_definition();

        let reparsed = PipelineDefinition::from_json(&exported.to_json_pretty().unwrap()).unwrap();
        assert_eq!(reparsed, exported);
        assert_eq!(reparsed.build().unwrap().to_definition(), exported);
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FORWARD_REFERENCE.as_bytes()).unwrap();

        let definition = PipelineDefinition::from_path(file.path()).unwrap();
        assert_eq!(definition.name, "forward");
    }

    #[test]
    fn test_load_builds_graph() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FORWARD_REFERENCE.as_bytes()).unwrap();

        let graph = PipelineDefinition::load(file.path()).unwrap();
        assert_eq!(graph.dependencies_of("publish"), vec!["build"]);
    }

    #[test]
    fn test_load_reports_invalid_graph() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"name": "none", "stages": []}"#).unwrap();

        let err = PipelineDefinition::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Graph(GraphError::EmptyGraph(_))));
        assert_eq!(err.to_string(), "Pipeline 'none' has no stages");
    }

    #[test]
    fn test_from_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineDefinition::from_path(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
