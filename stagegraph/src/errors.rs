//! Error types for stagegraph.
//!
//! Graph construction errors are raised synchronously by the builder and
//! surfaced to the caller immediately; no partially built graph is ever
//! returned. Stage failures during a run are status values, not errors.

use crate::core::StageStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for stagegraph operations.
#[derive(Debug, Error)]
pub enum StagegraphError {
    /// The graph could not be built.
    #[error("{0}")]
    Graph(#[from] GraphError),

    /// A pipeline definition could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A run-state transition was rejected.
    #[error("{0}")]
    Transition(#[from] TransitionError),
}

/// Diagnostic metadata attached to graph errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ErrorInfo {
    /// Error code (e.g., "GRAPH-003-CYCLE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ErrorInfo {
    /// Creates a new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Raised when a stage name is already present in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Stage '{name}' already exists in the pipeline")]
pub struct DuplicateStageError {
    /// The duplicated name.
    pub name: String,
}

impl DuplicateStageError {
    /// Creates a new duplicate stage error.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Raised when a dependency references a stage that was never added.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Dependency {from} -> {to} references unknown stage '{name}'")]
pub struct UnknownStageError {
    /// The missing stage.
    pub name: String,
    /// Upstream end of the rejected edge.
    pub from: String,
    /// Downstream end of the rejected edge.
    pub to: String,
}

impl UnknownStageError {
    /// Creates a new unknown stage error.
    #[must_use]
    pub fn new(name: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Raised when adding an edge would close a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cycle detected in pipeline: {}", cycle_path.join(" -> "))]
pub struct CycleError {
    /// The stages forming the cycle, starting and ending with the same stage.
    pub cycle_path: Vec<String>,
}

impl CycleError {
    /// Creates a new cycle error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        Self { cycle_path }
    }
}

/// Raised when building a graph with no stages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Pipeline '{pipeline}' has no stages")]
pub struct EmptyGraphError {
    /// The pipeline name.
    pub pipeline: String,
}

impl EmptyGraphError {
    /// Creates a new empty graph error.
    #[must_use]
    pub fn new(pipeline: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
        }
    }
}

/// Raised when an edge between the same two stages is declared twice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Stage '{to}' already depends on '{from}'")]
pub struct DuplicateDependencyError {
    /// Upstream stage.
    pub from: String,
    /// Downstream stage.
    pub to: String,
}

impl DuplicateDependencyError {
    /// Creates a new duplicate dependency error.
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// What kind of identifier failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    /// A pipeline name.
    Pipeline,
    /// A stage name.
    Stage,
    /// A parameter key.
    Parameter,
}

impl std::fmt::Display for NameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pipeline => write!(f, "pipeline"),
            Self::Stage => write!(f, "stage"),
            Self::Parameter => write!(f, "parameter"),
        }
    }
}

/// Raised when a pipeline, stage, or parameter name is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {kind} name '{name}': {reason}")]
pub struct InvalidNameError {
    /// The rejected name.
    pub name: String,
    /// What the name identifies.
    pub kind: NameKind,
    /// Why it was rejected.
    pub reason: String,
}

impl InvalidNameError {
    /// Creates a new invalid name error.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: NameKind, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            reason: reason.into(),
        }
    }
}

/// Errors raised while assembling a pipeline graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Duplicate stage name.
    #[error(transparent)]
    DuplicateStage(#[from] DuplicateStageError),

    /// Edge endpoint not found.
    #[error(transparent)]
    UnknownStage(#[from] UnknownStageError),

    /// Edge would create a cycle.
    #[error(transparent)]
    Cycle(#[from] CycleError),

    /// No stages were added.
    #[error(transparent)]
    EmptyGraph(#[from] EmptyGraphError),

    /// Edge declared twice.
    #[error(transparent)]
    DuplicateDependency(#[from] DuplicateDependencyError),

    /// Malformed identifier.
    #[error(transparent)]
    InvalidName(#[from] InvalidNameError),
}

impl GraphError {
    /// Returns the stages involved in the error.
    #[must_use]
    pub fn stages(&self) -> Vec<String> {
        match self {
            Self::DuplicateStage(e) => vec![e.name.clone()],
            Self::UnknownStage(e) => vec![e.from.clone(), e.to.clone()],
            Self::Cycle(e) => e.cycle_path.clone(),
            Self::EmptyGraph(_) => Vec::new(),
            Self::DuplicateDependency(e) => vec![e.from.clone(), e.to.clone()],
            Self::InvalidName(e) if e.kind == NameKind::Stage => vec![e.name.clone()],
            Self::InvalidName(_) => Vec::new(),
        }
    }

    /// Returns diagnostic metadata for the error.
    #[must_use]
    pub fn info(&self) -> ErrorInfo {
        match self {
            Self::DuplicateStage(e) => ErrorInfo::new("GRAPH-001-DUPLICATE", self.to_string())
                .with_context_entry("stage", &e.name)
                .with_fix_hint("Give every stage a unique name."),
            Self::UnknownStage(e) => ErrorInfo::new("GRAPH-002-UNKNOWN_STAGE", self.to_string())
                .with_context_entry("stage", &e.name)
                .with_fix_hint("Add both stages before declaring the dependency between them."),
            Self::Cycle(e) => ErrorInfo::new("GRAPH-003-CYCLE", self.to_string())
                .with_context_entry("cycle", e.cycle_path.join(" -> "))
                .with_fix_hint("Remove one of the dependencies in the cycle to break it."),
            Self::EmptyGraph(e) => ErrorInfo::new("GRAPH-004-EMPTY", self.to_string())
                .with_context_entry("pipeline", &e.pipeline)
                .with_fix_hint("Add at least one stage to the pipeline before building."),
            Self::DuplicateDependency(e) => {
                ErrorInfo::new("GRAPH-005-DUPLICATE_DEP", self.to_string())
                    .with_context_entry("from", &e.from)
                    .with_context_entry("to", &e.to)
                    .with_fix_hint("Declare each dependency once with the policy you need.")
            }
            Self::InvalidName(e) => {
                let hint = match e.kind {
                    NameKind::Parameter => "Use a non-empty parameter key without any whitespace.",
                    NameKind::Pipeline | NameKind::Stage => {
                        "Use a non-empty name without surrounding whitespace."
                    }
                };
                ErrorInfo::new("GRAPH-006-INVALID_NAME", self.to_string())
                    .with_context_entry("kind", e.kind.to_string())
                    .with_fix_hint(hint)
            }
        }
    }
}

/// Errors raised while loading a pipeline definition.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The definition file could not be read.
    #[error("Failed to read pipeline definition {}: {source}", path.display())]
    Io {
        /// The file path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The definition is not valid JSON for the expected schema.
    #[error("Invalid pipeline definition: {0}")]
    Json(#[from] serde_json::Error),

    /// The definition describes an invalid graph.
    #[error("{0}")]
    Graph(#[from] GraphError),
}

/// Errors raised when a run-state transition is not allowed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The stage is not part of the graph.
    #[error("Unknown stage '{name}'")]
    UnknownStage {
        /// The stage name.
        name: String,
    },

    /// The stage already reached a terminal status.
    #[error("Stage '{stage}' already finished with status {status}")]
    AlreadyTerminal {
        /// The stage name.
        stage: String,
        /// Its terminal status.
        status: StageStatus,
    },

    /// A completion was reported with a non-terminal status.
    #[error("Stage '{stage}' cannot complete with non-terminal status {status}")]
    NotTerminal {
        /// The stage name.
        stage: String,
        /// The reported status.
        status: StageStatus,
    },

    /// The stage cannot start yet.
    #[error("Stage '{stage}' is not eligible to start (status {status})")]
    NotReady {
        /// The stage name.
        stage: String,
        /// Its current status.
        status: StageStatus,
    },
}
