//! Stage status enum.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The status of a stage within a single CI run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage has not started yet.
    #[default]
    Pending,
    /// Stage is currently running on the external executor.
    Running,
    /// Stage finished successfully.
    Succeeded,
    /// Stage finished with a failure.
    Failed,
    /// Stage was canceled, either externally or by an upstream stage.
    Canceled,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    /// Returns true if the status indicates success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Returns true if the status indicates failure or cancellation.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Canceled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_status_display() {
        assert_eq!(StageStatus::Pending.to_string(), "pending");
        assert_eq!(StageStatus::Succeeded.to_string(), "succeeded");
        assert_eq!(StageStatus::Canceled.to_string(), "canceled");
    }

    #[test]
    fn test_stage_status_is_terminal() {
        assert!(StageStatus::Succeeded.is_terminal());
        assert!(StageStatus::Failed.is_terminal());
        assert!(StageStatus::Canceled.is_terminal());
        assert!(!StageStatus::Pending.is_terminal());
        assert!(!StageStatus::Running.is_terminal());
    }

    #[test]
    fn test_stage_status_success_and_failure() {
        assert!(StageStatus::Succeeded.is_success());
        assert!(!StageStatus::Failed.is_success());
        assert!(StageStatus::Failed.is_failure());
        assert!(StageStatus::Canceled.is_failure());
        assert!(!StageStatus::Running.is_failure());
    }

    #[test]
    fn test_stage_status_serialize() {
        let json = serde_json::to_string(&StageStatus::Canceled).unwrap();
        assert_eq!(json, r#""canceled""#);

        let deserialized: StageStatus = serde_json::from_str(r#""running""#).unwrap();
        assert_eq!(deserialized, StageStatus::Running);
    }

    #[test]
    fn test_stage_status_default() {
        assert_eq!(StageStatus::default(), StageStatus::Pending);
    }
}
