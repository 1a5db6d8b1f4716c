//! Job backend events and their state mapping
//!
//! Two streams reach a cell: launch phases on the cell channel
//! (`run-status`) and job status pushes on the job's own channel
//! (`job-status`). Both map onto an [`AppState`] through pure functions; a
//! value outside the known enumeration is a schema violation.

use crate::app_state::AppState;
use crate::error::{AppCellError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Launch phase reported while submitting a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchPhase {
    /// Checking the app and its parameters
    ValidatingApp,
    /// Check passed
    ValidatedApp,
    /// Submitting
    LaunchingJob,
    /// Submitted; the job id is known
    LaunchedJob,
    /// Submission failed
    Error,
}

impl FromStr for LaunchPhase {
    type Err = AppCellError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "validating_app" => Ok(Self::ValidatingApp),
            "validated_app" => Ok(Self::ValidatedApp),
            "launching_job" => Ok(Self::LaunchingJob),
            "launched_job" => Ok(Self::LaunchedJob),
            "error" => Ok(Self::Error),
            other => Err(AppCellError::invalid_external("launch", other)),
        }
    }
}

impl LaunchPhase {
    /// State entered on this phase
    #[must_use]
    pub fn target(self) -> AppState {
        use crate::app_state::Stage;
        match self {
            Self::ValidatingApp | Self::ValidatedApp | Self::LaunchingJob | Self::LaunchedJob => {
                AppState::Processing(Stage::Launching)
            }
            Self::Error => AppState::Error(Some(Stage::Launching)),
        }
    }
}

/// Status of a submitted job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Waiting for a worker
    Queued,
    /// Picked up by a worker
    JobStarted,
    /// Executing
    InProgress,
    /// Finished
    Completed,
    /// Cancelled by the user
    Cancelled,
    /// Stopped by the backend
    Suspend,
    /// Failed
    Error,
}

impl FromStr for JobStatus {
    type Err = AppCellError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "queued" => Ok(Self::Queued),
            "job_started" => Ok(Self::JobStarted),
            "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "suspend" => Ok(Self::Suspend),
            "error" => Ok(Self::Error),
            other => Err(AppCellError::invalid_external("job", other)),
        }
    }
}

impl JobStatus {
    /// Whether no further status follows
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Cancelled | Self::Suspend | Self::Error
        )
    }

    /// State entered on this status; failures keep the stage of `current`
    #[must_use]
    pub fn target(self, current: &AppState) -> AppState {
        use crate::app_state::Stage;
        match self {
            Self::Queued => AppState::Processing(Stage::Queued),
            Self::JobStarted | Self::InProgress => AppState::Processing(Stage::Running),
            Self::Completed | Self::Cancelled => AppState::Success,
            Self::Suspend | Self::Error => AppState::Error(current.stage()),
        }
    }
}

/// Payload of a `run-status` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchEvent {
    /// Launch phase name
    pub event: String,
    /// Job id, once launched
    #[serde(default, alias = "jobId", skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Run id assigned by the cell
    #[serde(default, alias = "runId", skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

impl LaunchEvent {
    /// Parsed phase
    ///
    /// # Errors
    ///
    /// [`AppCellError::InvalidExternalState`] for an unknown phase.
    pub fn phase(&self) -> Result<LaunchPhase> {
        self.event.parse()
    }
}

/// Payload of a `job-status` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusMessage {
    /// Job state snapshot as reported by the backend
    pub job_state: Value,
    /// Widget used to display the job output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_widget_info: Option<Value>,
}

impl JobStatusMessage {
    /// The `job_state` field of the snapshot
    #[must_use]
    pub fn status_name(&self) -> &str {
        self.job_state
            .get("job_state")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Parsed status
    ///
    /// # Errors
    ///
    /// [`AppCellError::InvalidExternalState`] for an unknown status.
    pub fn status(&self) -> Result<JobStatus> {
        self.status_name().parse()
    }

    /// Job id of the snapshot
    #[must_use]
    pub fn job_id(&self) -> Option<&str> {
        self.job_state.get("job_id").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::{ParamsStatus, Stage};
    use serde_json::json;

    #[test]
    fn launch_phases_map_to_launching() {
        for phase in ["validating_app", "validated_app", "launching_job", "launched_job"] {
            let phase: LaunchPhase = phase.parse().unwrap();
            assert_eq!(phase.target(), AppState::Processing(Stage::Launching));
        }
        assert_eq!(
            LaunchPhase::Error.target(),
            AppState::Error(Some(Stage::Launching))
        );
    }

    #[test]
    fn unknown_launch_phase_is_invalid() {
        let err = "teleported".parse::<LaunchPhase>().unwrap_err();
        assert!(matches!(
            err,
            AppCellError::InvalidExternalState { source_kind: "launch", .. }
        ));
    }

    #[test]
    fn job_statuses() {
        let running = AppState::Processing(Stage::Running);
        assert_eq!(JobStatus::Queued.target(&running), AppState::Processing(Stage::Queued));
        assert_eq!(JobStatus::InProgress.target(&running), running);
        assert_eq!(JobStatus::Cancelled.target(&running), AppState::Success);
        assert_eq!(
            JobStatus::Suspend.target(&running),
            AppState::Error(Some(Stage::Running))
        );
        assert_eq!(
            JobStatus::Error.target(&AppState::Editing(ParamsStatus::Complete)),
            AppState::Error(None)
        );
        assert!(JobStatus::Completed.is_terminal());
        assert!(!JobStatus::JobStarted.is_terminal());
    }

    #[test]
    fn unknown_job_status_is_invalid() {
        let message: JobStatusMessage = serde_json::from_value(json!({
            "jobState": {"job_id": "j1", "job_state": "exploded"}
        }))
        .unwrap();
        assert_eq!(message.job_id(), Some("j1"));
        assert!(message.status().is_err());
    }

    #[test]
    fn launch_event_accepts_both_spellings() {
        let a: LaunchEvent =
            serde_json::from_value(json!({"event": "launched_job", "job_id": "j1"})).unwrap();
        let b: LaunchEvent =
            serde_json::from_value(json!({"event": "launched_job", "jobId": "j1"})).unwrap();
        assert_eq!(a, b);
    }
}
