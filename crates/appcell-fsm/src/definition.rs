//! State definitions
//!
//! A definition binds one state to the UI configuration shown while the
//! machine is in it, the messages emitted when it is entered or resumed,
//! and the explicit list of legal successors.

use crate::tag::StateTag;
use appcell_bus::MessageKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// A closed set of states that can be persisted as a [`StateTag`]
pub trait StateKey: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Persisted identity of the state
    fn tag(&self) -> StateTag;
}

/// Enabled, disabled and hidden controls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonStates {
    /// Controls the user can press
    pub enabled: Vec<String>,
    /// Controls shown but inert
    pub disabled: Vec<String>,
    /// Controls not shown at all
    pub hidden: Vec<String>,
}

/// Shown and hidden panels
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementVisibility {
    /// Panels made visible
    pub show: Vec<String>,
    /// Panels hidden
    pub hide: Vec<String>,
}

/// Declarative UI of a state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiConfig {
    /// Control states
    pub buttons: ButtonStates,
    /// Panel visibility
    pub elements: ElementVisibility,
}

impl UiConfig {
    /// Whether a control is enabled
    #[must_use]
    pub fn is_enabled(&self, button: &str) -> bool {
        self.buttons.enabled.iter().any(|b| b == button)
    }

    /// Whether a control is hidden
    #[must_use]
    pub fn is_hidden(&self, button: &str) -> bool {
        self.buttons.hidden.iter().any(|b| b == button)
    }

    /// Whether a panel is shown
    #[must_use]
    pub fn shows(&self, element: &str) -> bool {
        self.elements.show.iter().any(|e| e == element)
    }
}

/// Message emitted when a state is entered or resumed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMessage {
    /// Kind of the emitted message
    pub kind: MessageKind,
    /// Widget the message is addressed to
    pub widget: Option<String>,
}

impl StateMessage {
    /// Broadcast message
    pub fn emit(kind: impl Into<MessageKind>) -> Self {
        Self {
            kind: kind.into(),
            widget: None,
        }
    }

    /// Message addressed to one widget
    pub fn to_widget(kind: impl Into<MessageKind>, widget: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            widget: Some(widget.into()),
        }
    }
}

/// Enter and resume side effects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triggers {
    /// Emitted on a fresh start
    pub enter: Vec<StateMessage>,
    /// Emitted when re-attaching to a cell already in this state
    pub resume: Vec<StateMessage>,
}

/// One row of the state table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDefinition<S> {
    /// The state
    pub state: S,
    /// UI shown in the state
    pub ui: UiConfig,
    /// Side effects
    pub on: Triggers,
    /// Legal successors
    pub next: Vec<S>,
}

impl<S: StateKey> StateDefinition<S> {
    /// Definition with an empty UI and no successor
    pub fn new(state: S) -> Self {
        Self {
            state,
            ui: UiConfig::default(),
            on: Triggers::default(),
            next: Vec::new(),
        }
    }

    /// Set enabled controls
    #[must_use]
    pub fn enable<I, T>(mut self, buttons: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.ui.buttons.enabled = buttons.into_iter().map(Into::into).collect();
        self
    }

    /// Set disabled controls
    #[must_use]
    pub fn disable<I, T>(mut self, buttons: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.ui.buttons.disabled = buttons.into_iter().map(Into::into).collect();
        self
    }

    /// Set hidden controls
    #[must_use]
    pub fn hide_buttons<I, T>(mut self, buttons: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.ui.buttons.hidden = buttons.into_iter().map(Into::into).collect();
        self
    }

    /// Set shown panels
    #[must_use]
    pub fn show<I, T>(mut self, elements: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.ui.elements.show = elements.into_iter().map(Into::into).collect();
        self
    }

    /// Set hidden panels
    #[must_use]
    pub fn hide<I, T>(mut self, elements: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.ui.elements.hide = elements.into_iter().map(Into::into).collect();
        self
    }

    /// Add an enter message
    #[must_use]
    pub fn on_enter(mut self, message: StateMessage) -> Self {
        self.on.enter.push(message);
        self
    }

    /// Add a resume message
    #[must_use]
    pub fn on_resume(mut self, message: StateMessage) -> Self {
        self.on.resume.push(message);
        self
    }

    /// Set the legal successors
    #[must_use]
    pub fn next(mut self, next: impl IntoIterator<Item = S>) -> Self {
        self.next = next.into_iter().collect();
        self
    }

    /// Whether `candidate` is a declared successor
    #[must_use]
    pub fn allows(&self, candidate: &S) -> bool {
        self.next.contains(candidate)
    }
}
