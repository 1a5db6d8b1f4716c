//! # App Cell State Machine
//!
//! Declarative finite state machine:
//! - a closed state type implementing [`StateKey`]
//! - one [`StateDefinition`] per state with its UI configuration, enter and
//!   resume messages, and explicit successor list
//! - [`StateMachine`] validating every transition against that table

pub mod definition;
pub mod error;
pub mod machine;
pub mod tag;

pub use definition::{
    ButtonStates, ElementVisibility, StateDefinition, StateKey, StateMessage, Triggers, UiConfig,
};
pub use error::StateMachineError;
pub use machine::{PersistFn, StartMode, StateMachine};
pub use tag::StateTag;
