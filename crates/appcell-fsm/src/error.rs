//! Error types for the state machine

use crate::tag::StateTag;

/// State machine error type
///
/// Every variant is a defect in the state table or in the caller; none of
/// them is worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    /// No definition exists for the state
    #[error("unknown state {tag}")]
    UnknownState {
        /// Tag of the state that was looked up
        tag: StateTag,
    },

    /// The state is defined but not a declared successor of the current one
    #[error("illegal transition from {from} to {to}")]
    IllegalTransition {
        /// Current state
        from: StateTag,
        /// Rejected candidate
        to: StateTag,
    },

    /// A definition lists a successor that has no definition
    #[error("state {state} lists undefined successor {successor}")]
    UndefinedSuccessor {
        /// Definition holding the bad entry
        state: StateTag,
        /// The undefined successor
        successor: StateTag,
    },

    /// Two definitions share one state
    #[error("state {tag} is defined more than once")]
    DuplicateState {
        /// The duplicated tag
        tag: StateTag,
    },

    /// The machine has not been started
    #[error("state machine not started")]
    NotStarted,
}
