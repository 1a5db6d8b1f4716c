//! Lifecycle states of an app cell and their table
//!
//! ```text
//! new ──▶ editing/incomplete ◀──▶ editing/complete ──▶ processing/{launching,queued,running}
//!  │                                     ▲                 │
//!  ▼                                     └── re-run ── success | error/{stage}
//! fatal-error
//! ```

use appcell_fsm::{StateDefinition, StateKey, StateMessage, StateTag};
use appcell_bus::MessageKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Control names
pub mod buttons {
    /// Launch the app
    pub const RUN_APP: &str = "run-app";
    /// Reset to edit mode
    pub const RE_RUN_APP: &str = "re-run-app";
    /// Cancel the job
    pub const CANCEL: &str = "cancel";
}

/// Panel names
pub mod elements {
    /// Fatal error panel
    pub const FATAL_ERROR: &str = "fatal-error";
    /// Parameter input panel
    pub const PARAMETERS_GROUP: &str = "parameters-group";
    /// Output panel
    pub const OUTPUT_GROUP: &str = "output-group";
    /// Read-only parameter panel
    pub const PARAMETERS_DISPLAY_GROUP: &str = "parameters-display-group";
    /// Execution status panel
    pub const EXEC_GROUP: &str = "exec-group";
}

/// Whether every required parameter has a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParamsStatus {
    /// Something required is missing
    Incomplete,
    /// Parameters valid and code built
    Complete,
}

/// Phase of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Submitted, not yet accepted by the backend
    Launching,
    /// Waiting for a worker
    Queued,
    /// Executing
    Running,
}

impl Stage {
    /// Tag value
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Launching => "launching",
            Self::Queued => "queued",
            Self::Running => "running",
        }
    }
}

/// Lifecycle state of an app cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppState {
    /// Freshly inserted, nothing loaded
    New,
    /// Terminal; the cell can no longer be trusted
    FatalError,
    /// User editing parameters
    Editing(ParamsStatus),
    /// Job in flight
    Processing(Stage),
    /// Job finished
    Success,
    /// Job failed, in the stage it failed in when known
    Error(Option<Stage>),
}

impl AppState {
    /// The `mode` dimension
    #[must_use]
    pub fn mode(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::FatalError => "fatal-error",
            Self::Editing(_) => "editing",
            Self::Processing(_) => "processing",
            Self::Success => "success",
            Self::Error(_) => "error",
        }
    }

    /// The `stage` dimension
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Processing(stage) => Some(*stage),
            Self::Error(stage) => *stage,
            _ => None,
        }
    }

    /// Whether the user is editing
    #[must_use]
    pub fn is_editing(&self) -> bool {
        matches!(self, Self::Editing(_))
    }
}

impl StateKey for AppState {
    fn tag(&self) -> StateTag {
        let tag = StateTag::mode(self.mode());
        match self {
            Self::Editing(ParamsStatus::Incomplete) => tag.with("params", "incomplete"),
            Self::Editing(ParamsStatus::Complete) => {
                tag.with("params", "complete").with("code", "built")
            }
            Self::Processing(stage) | Self::Error(Some(stage)) => tag.with("stage", stage.as_str()),
            Self::New | Self::FatalError | Self::Success | Self::Error(None) => tag,
        }
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Every state, in table order
pub const ALL_STATES: [AppState; 12] = [
    AppState::New,
    AppState::FatalError,
    AppState::Editing(ParamsStatus::Incomplete),
    AppState::Editing(ParamsStatus::Complete),
    AppState::Processing(Stage::Launching),
    AppState::Processing(Stage::Queued),
    AppState::Processing(Stage::Running),
    AppState::Success,
    AppState::Error(Some(Stage::Launching)),
    AppState::Error(Some(Stage::Queued)),
    AppState::Error(Some(Stage::Running)),
    AppState::Error(None),
];

const EDIT_COMPLETE: AppState = AppState::Editing(ParamsStatus::Complete);
const EDIT_INCOMPLETE: AppState = AppState::Editing(ParamsStatus::Incomplete);

fn job_view(state: AppState, enabled: &str, hidden: [&str; 2]) -> StateDefinition<AppState> {
    use elements::{EXEC_GROUP, OUTPUT_GROUP, PARAMETERS_DISPLAY_GROUP, PARAMETERS_GROUP};
    StateDefinition::new(state)
        .enable([enabled])
        .disable(Vec::<String>::new())
        .hide_buttons(hidden)
        .show([PARAMETERS_DISPLAY_GROUP, EXEC_GROUP, OUTPUT_GROUP])
        .hide([PARAMETERS_GROUP])
}

fn edit_view(state: AppState, run_enabled: bool) -> StateDefinition<AppState> {
    use buttons::{CANCEL, RE_RUN_APP, RUN_APP};
    use elements::{EXEC_GROUP, FATAL_ERROR, OUTPUT_GROUP, PARAMETERS_DISPLAY_GROUP, PARAMETERS_GROUP};
    let definition = if run_enabled {
        StateDefinition::new(state).enable([RUN_APP])
    } else {
        StateDefinition::new(state).disable([RUN_APP])
    };
    definition
        .hide_buttons([RE_RUN_APP, CANCEL])
        .show([PARAMETERS_GROUP, OUTPUT_GROUP])
        .hide([FATAL_ERROR, PARAMETERS_DISPLAY_GROUP, EXEC_GROUP])
}

/// The app cell state table
#[must_use]
pub fn app_states() -> Vec<StateDefinition<AppState>> {
    use buttons::{CANCEL, RE_RUN_APP, RUN_APP};
    use elements::{EXEC_GROUP, FATAL_ERROR, OUTPUT_GROUP, PARAMETERS_DISPLAY_GROUP, PARAMETERS_GROUP};
    use AppState::{Error, FatalError, New, Processing, Success};
    use Stage::{Launching, Queued, Running};

    let processing = |stage| job_view(Processing(stage), CANCEL, [RUN_APP, RE_RUN_APP]);
    let finished = |state| job_view(state, RE_RUN_APP, [RUN_APP, CANCEL]);

    vec![
        StateDefinition::new(New)
            .disable([RUN_APP])
            .hide_buttons([RE_RUN_APP, CANCEL])
            .hide([FATAL_ERROR, PARAMETERS_GROUP, OUTPUT_GROUP, PARAMETERS_DISPLAY_GROUP, EXEC_GROUP])
            .next([FatalError, EDIT_INCOMPLETE]),
        StateDefinition::new(FatalError)
            .disable([RUN_APP])
            .hide_buttons([RE_RUN_APP, CANCEL])
            .show([FATAL_ERROR])
            .hide([PARAMETERS_GROUP, OUTPUT_GROUP, PARAMETERS_DISPLAY_GROUP, EXEC_GROUP]),
        edit_view(EDIT_INCOMPLETE, false).next([EDIT_COMPLETE, EDIT_INCOMPLETE]),
        edit_view(EDIT_COMPLETE, true).next([
            EDIT_INCOMPLETE,
            EDIT_COMPLETE,
            Processing(Launching),
            Processing(Queued),
            Processing(Running),
            Success,
            Error(Some(Launching)),
            Error(Some(Queued)),
            Error(Some(Running)),
            Error(None),
        ]),
        processing(Launching)
            .on_enter(StateMessage::emit(MessageKind::SyncAllDisplayParameters))
            .on_resume(StateMessage::emit(MessageKind::SyncAllDisplayParameters))
            .next([
                Processing(Launching),
                Processing(Queued),
                Processing(Running),
                Success,
                Error(Some(Launching)),
                EDIT_COMPLETE,
            ]),
        processing(Queued).next([
            Processing(Running),
            Processing(Queued),
            Success,
            Error(Some(Queued)),
            EDIT_COMPLETE,
        ]),
        processing(Running).next([
            Processing(Running),
            Success,
            Error(Some(Running)),
            EDIT_COMPLETE,
        ]),
        finished(Success)
            .on_enter(StateMessage::emit(MessageKind::OnSuccess))
            .next([Success, EDIT_COMPLETE]),
        finished(Error(Some(Launching))).next([Error(Some(Launching)), EDIT_COMPLETE]),
        finished(Error(Some(Queued))).next([Error(Some(Queued)), EDIT_COMPLETE]),
        finished(Error(Some(Running))).next([Error(Some(Running)), EDIT_COMPLETE]),
        finished(Error(None)).next([Error(None), EDIT_COMPLETE]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn complete_editing_tag() {
        assert_eq!(
            EDIT_COMPLETE.tag(),
            StateTag::mode("editing")
                .with("params", "complete")
                .with("code", "built")
        );
        assert_eq!(AppState::Error(None).tag(), StateTag::mode("error"));
    }

    #[test]
    fn table_covers_every_state_once() {
        let table = app_states();
        assert_eq!(table.len(), ALL_STATES.len());
        for (definition, state) in table.iter().zip(ALL_STATES) {
            assert_eq!(definition.state, state);
        }
    }

    #[test]
    fn fatal_error_is_terminal() {
        let table = app_states();
        let fatal = table.iter().find(|d| d.state == AppState::FatalError).unwrap();
        assert!(fatal.next.is_empty());
        assert!(fatal.ui.shows(elements::FATAL_ERROR));
    }

    #[test]
    fn run_control_follows_params() {
        let table = app_states();
        let ui = |s: AppState| table.iter().find(|d| d.state == s).unwrap().ui.clone();
        assert!(ui(EDIT_COMPLETE).is_enabled(buttons::RUN_APP));
        assert!(!ui(EDIT_INCOMPLETE).is_enabled(buttons::RUN_APP));
        assert!(ui(AppState::Processing(Stage::Queued)).is_enabled(buttons::CANCEL));
        assert!(ui(AppState::Success).is_hidden(buttons::RUN_APP));
    }
}
