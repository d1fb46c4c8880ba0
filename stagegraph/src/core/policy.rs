//! Failure actions and dependency policies.

use super::StageStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happens to a dependent stage when its upstream does not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureAction {
    /// The dependent stays eligible to run.
    #[default]
    #[serde(alias = "IGNORE")]
    Ignore,
    /// The dependent is canceled, and so are its own dependents per their policies.
    #[serde(alias = "cancel", alias = "CANCEL")]
    CancelDownstream,
}

impl fmt::Display for FailureAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ignore => write!(f, "ignore"),
            Self::CancelDownstream => write!(f, "cancel_downstream"),
        }
    }
}

/// The pair of failure actions attached to a dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DependencyPolicy {
    /// Applied when the upstream stage fails.
    #[serde(default)]
    pub on_upstream_failure: FailureAction,
    /// Applied when the upstream stage is canceled.
    #[serde(default)]
    pub on_upstream_cancel: FailureAction,
}

impl DependencyPolicy {
    /// Creates a policy from explicit actions.
    #[must_use]
    pub const fn new(
        on_upstream_failure: FailureAction,
        on_upstream_cancel: FailureAction,
    ) -> Self {
        Self {
            on_upstream_failure,
            on_upstream_cancel,
        }
    }

    /// Cancels the dependent on both upstream failure and upstream cancellation.
    #[must_use]
    pub const fn cancel_downstream() -> Self {
        Self::new(FailureAction::CancelDownstream, FailureAction::CancelDownstream)
    }

    /// Never cancels the dependent.
    #[must_use]
    pub const fn ignore() -> Self {
        Self::new(FailureAction::Ignore, FailureAction::Ignore)
    }

    /// Returns the action triggered by an upstream reaching `status`.
    ///
    /// `None` means the status does not propagate at all (success or not yet terminal).
    #[must_use]
    pub const fn action_for(&self, status: StageStatus) -> Option<FailureAction> {
        match status {
            StageStatus::Failed => Some(self.on_upstream_failure),
            StageStatus::Canceled => Some(self.on_upstream_cancel),
            StageStatus::Pending | StageStatus::Running | StageStatus::Succeeded => None,
        }
    }

    /// Returns true if an upstream reaching `status` cancels the dependent.
    #[must_use]
    pub const fn cancels_on(&self, status: StageStatus) -> bool {
        matches!(self.action_for(status), Some(FailureAction::CancelDownstream))
    }
}
