//! Error types for app cells
//!
//! Provides error handling for:
//! - State table defects (unknown states, illegal transitions)
//! - Job backend values outside the known enumerations
//! - Missing required parameters
//! - Catalog and workspace failures
//! - Failures while composing the cell

use appcell_bus::BusError;
use appcell_fsm::StateMachineError;
use serde::{Deserialize, Serialize};

/// Main app cell error type
#[derive(Debug, thiserror::Error)]
pub enum AppCellError {
    /// The state table rejected a state or a transition
    #[error("state machine error: {0}")]
    StateMachine(#[from] StateMachineError),

    /// An external status value outside the known enumeration
    #[error("invalid {source_kind} state: {value}")]
    InvalidExternalState {
        /// Which stream produced the value
        source_kind: &'static str,
        /// The unrecognised value
        value: String,
    },

    /// Required parameters are missing
    #[error("{} parameter issue(s)", .0.len())]
    Validation(Vec<ValidationIssue>),

    /// A remote service call failed
    #[error("remote service error: {0}")]
    RemoteService(#[from] RemoteServiceError),

    /// The cell could not be composed
    #[error("error loading main widgets: {0}")]
    FatalLoad(String),

    /// The app reference is unusable
    #[error("invalid app: {0}")]
    InvalidApp(String),

    /// A bus request failed
    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    /// The cell was halted by an earlier fatal error
    #[error("cell halted after a fatal error")]
    Halted,

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

impl AppCellError {
    /// Whether the error leaves the cell in `fatal-error`
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::StateMachine(_)
                | Self::InvalidExternalState { .. }
                | Self::FatalLoad(_)
                | Self::InvalidApp(_)
                | Self::Halted
        )
    }

    /// Whether the error is meant for the user rather than a developer
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::RemoteService(_) | Self::FatalLoad(_)
        )
    }

    /// Build an [`AppCellError::InvalidExternalState`]
    pub fn invalid_external(source_kind: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidExternalState {
            source_kind,
            value: value.into(),
        }
    }
}

/// Remote catalog or workspace failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteServiceError {
    /// The service could not be reached
    #[error("transport failure: {0}")]
    Transport(String),

    /// The requested item does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The service answered with an error
    #[error("service error: {0}")]
    Service(String),
}

/// Why a parameter failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Diagnosis {
    /// A required parameter has no value
    RequiredMissing,
}

/// One failed parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    /// Parameter id
    pub parameter: String,
    /// Failure kind
    pub diagnosis: Diagnosis,
    /// Message shown to the user
    pub error_message: String,
}

/// Result type for app cell operations
pub type Result<T> = std::result::Result<T, AppCellError>;

#[cfg(test)]
mod tests {
    use super::*;
    use appcell_fsm::StateTag;

    #[test]
    fn classification() {
        let illegal = AppCellError::from(StateMachineError::IllegalTransition {
            from: StateTag::mode("success"),
            to: StateTag::mode("new"),
        });
        assert!(illegal.is_fatal());
        assert!(!illegal.is_user_facing());

        let remote = AppCellError::from(RemoteServiceError::NotFound("app".into()));
        assert!(!remote.is_fatal());
        assert!(remote.is_user_facing());

        assert!(AppCellError::Validation(Vec::new()).is_user_facing());
    }

    #[test]
    fn display() {
        let err = AppCellError::invalid_external("job", "exploded");
        assert_eq!(err.to_string(), "invalid job state: exploded");
    }
}
