//! Recorded status transitions.

use super::StageStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a stage changed status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionCause {
    /// The orchestrator started the stage.
    Started,
    /// The stage's own completion was reported.
    Reported,
    /// An upstream stage failed and the edge policy cancels dependents.
    UpstreamFailed {
        /// The failed upstream stage.
        upstream: String,
    },
    /// An upstream stage was canceled and the edge policy cancels dependents.
    UpstreamCanceled {
        /// The canceled upstream stage.
        upstream: String,
    },
}

impl TransitionCause {
    /// Builds the cause for a cancellation propagated from `upstream`.
    #[must_use]
    pub fn from_upstream(upstream: impl Into<String>, upstream_status: StageStatus) -> Self {
        let upstream = upstream.into();
        if upstream_status == StageStatus::Failed {
            Self::UpstreamFailed { upstream }
        } else {
            Self::UpstreamCanceled { upstream }
        }
    }

    /// Returns the upstream stage if this transition was propagated.
    #[must_use]
    pub fn upstream(&self) -> Option<&str> {
        match self {
            Self::UpstreamFailed { upstream } | Self::UpstreamCanceled { upstream } => {
                Some(upstream)
            }
            Self::Started | Self::Reported => None,
        }
    }
}

/// A single status change of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    /// The stage name.
    pub stage: String,
    /// The status before the change.
    pub from: StageStatus,
    /// The status after the change.
    pub to: StageStatus,
    /// What caused the change.
    pub cause: TransitionCause,
    /// When the change was recorded.
    pub at: DateTime<Utc>,
}

impl StatusTransition {
    /// Creates a transition stamped with the current time.
    #[must_use]
    pub fn now(
        stage: impl Into<String>,
        from: StageStatus,
        to: StageStatus,
        cause: TransitionCause,
    ) -> Self {
        Self {
            stage: stage.into(),
            from,
            to,
            cause,
            at: Utc::now(),
        }
    }

    /// Returns true if the transition was caused by an upstream stage.
    #[must_use]
    pub fn is_propagated(&self) -> bool {
        self.cause.upstream().is_some()
    }
}
