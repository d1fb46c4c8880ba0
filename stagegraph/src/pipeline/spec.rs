//! Stage and dependency specifications.

use crate::core::DependencyPolicy;
use crate::errors::{InvalidNameError, NameKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Stable handle to a stage inside one builder or graph.
///
/// Ids are assigned in insertion order and are only meaningful for the
/// builder that issued them and the graph it builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId(pub(crate) usize);

impl StageId {
    /// Returns the insertion index of the stage.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque description of the work a stage performs.
///
/// Nothing in this crate interprets these fields; they are carried through to
/// the external executor unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionDescriptor {
    /// The executor kind, e.g. `gradle`.
    pub runner: String,
    /// Tasks or targets to invoke.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<String>,
    /// Extra command-line arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
    /// Build file to use, if not the default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_file: Option<String>,
    /// Runner-specific properties.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl ActionDescriptor {
    /// Creates a descriptor for the given runner.
    #[must_use]
    pub fn new(runner: impl Into<String>) -> Self {
        Self {
            runner: runner.into(),
            ..Default::default()
        }
    }

    /// Sets the tasks, split on whitespace.
    #[must_use]
    pub fn with_tasks(mut self, tasks: &str) -> Self {
        self.tasks = tasks.split_whitespace().map(str::to_string).collect();
        self
    }

    /// Adds a command-line argument.
    #[must_use]
    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    /// Sets the build file.
    #[must_use]
    pub fn with_build_file(mut self, build_file: impl Into<String>) -> Self {
        self.build_file = Some(build_file.into());
        self
    }

    /// Adds a runner property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// An external condition that can start a stage with no upstream involvement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum Trigger {
    /// A version-control change, optionally limited to matching branches.
    Vcs {
        /// Branch filter expression.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branch_filter: Option<String>,
    },
    /// A cron schedule.
    Schedule {
        /// Cron expression.
        cron: String,
    },
    /// Started by hand.
    Manual,
}

impl Trigger {
    /// A trigger on any version-control change.
    #[must_use]
    pub const fn vcs() -> Self {
        Self::Vcs { branch_filter: None }
    }
}

/// String parameters configuring a stage's action.
///
/// Keys flagged secret keep their value but are redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Parameters {
    #[serde(default)]
    values: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    secret: BTreeSet<String>,
}

impl Parameters {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plain text parameter.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds a secret parameter.
    #[must_use]
    pub fn with_secret(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_secret(key, value);
        self
    }

    /// Inserts a plain text parameter, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.secret.remove(&key);
        self.values.insert(key, value.into());
    }

    /// Inserts a secret parameter, replacing any previous value.
    pub fn insert_secret(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.values.insert(key.clone(), value.into());
        self.secret.insert(key);
    }

    /// Returns the value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Returns true if `key` holds a secret.
    #[must_use]
    pub fn is_secret(&self, key: &str) -> bool {
        self.secret.contains(key)
    }

    /// Iterates over keys and values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns `self` layered over `base`: keys present in both keep `self`'s value.
    #[must_use]
    pub fn layered_over(&self, base: &Self) -> Self {
        let mut merged = base.clone();
        for (key, value) in &self.values {
            if self.secret.contains(key) {
                merged.insert_secret(key.clone(), value.clone());
            } else {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }

    /// Checks every key: non-empty and free of whitespace.
    ///
    /// Secret keys without a value are rejected as well.
    pub fn validate(&self) -> Result<(), InvalidNameError> {
        for key in self.values.keys() {
            if key.is_empty() {
                return Err(InvalidNameError::new(key, NameKind::Parameter, "name is empty"));
            }
            if key.chars().any(char::is_whitespace) {
                return Err(InvalidNameError::new(
                    key,
                    NameKind::Parameter,
                    "name contains whitespace",
                ));
            }
        }
        if let Some(orphan) = self.secret.iter().find(|k| !self.values.contains_key(*k)) {
            return Err(InvalidNameError::new(
                orphan,
                NameKind::Parameter,
                "secret key has no value",
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.values.iter().map(|(k, v)| {
                let shown = if self.secret.contains(k) { "***" } else { v.as_str() };
                (k, shown)
            }))
            .finish()
    }
}

/// A named unit of work in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// The unique name of the stage.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// What the external executor should run.
    pub action: ActionDescriptor,
    /// Parameters for the action.
    pub parameters: Parameters,
    /// Conditions that start the stage without an upstream.
    pub triggers: BTreeSet<Trigger>,
}

impl Stage {
    /// Creates a new stage.
    #[must_use]
    pub fn new(name: impl Into<String>, action: ActionDescriptor) -> Self {
        Self {
            name: name.into(),
            description: None,
            action,
            parameters: Parameters::new(),
            triggers: BTreeSet::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the parameters.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Adds a trigger.
    #[must_use]
    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.insert(trigger);
        self
    }

    /// Validates the stage name and parameter keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or padded with whitespace, or a
    /// parameter key is malformed.
    pub fn validate(&self) -> Result<(), InvalidNameError> {
        validate_name(&self.name, NameKind::Stage)?;
        self.parameters.validate()
    }
}

/// Validates a pipeline or stage name.
pub(crate) fn validate_name(name: &str, kind: NameKind) -> Result<(), InvalidNameError> {
    if name.trim().is_empty() {
        return Err(InvalidNameError::new(name, kind, "name is empty or whitespace-only"));
    }
    if name.trim() != name {
        return Err(InvalidNameError::new(
            name,
            kind,
            "name has leading or trailing whitespace",
        ));
    }
    Ok(())
}

/// A directed edge: `to` requires `from` to reach a terminal status first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DependencyEdge {
    /// The upstream stage.
    pub from: StageId,
    /// The downstream, dependent stage.
    pub to: StageId,
    /// What happens to `to` when `from` fails or is canceled.
    pub policy: DependencyPolicy,
}
