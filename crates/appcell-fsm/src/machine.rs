//! The state machine
//!
//! Transitions are only accepted when the candidate is listed in the current
//! definition's `next`. Enter and resume messages are emitted by `start`;
//! `new_state` never emits anything, the caller decides what follows a
//! transition.

use crate::definition::{StateDefinition, StateKey, StateMessage};
use crate::error::StateMachineError;
use crate::tag::StateTag;
use appcell_bus::{ChannelBus, Key};
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::fmt;

/// Whether a start is fresh or re-attaches to a cell already in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Emit the state's `on.enter` messages
    Fresh,
    /// Emit the state's `on.resume` messages
    Resume,
}

/// Callback invoked with every accepted state
pub type PersistFn<S> = Box<dyn Fn(&S) + Send + Sync>;

/// Finite state machine over a closed state type
pub struct StateMachine<S: StateKey> {
    definitions: IndexMap<S, StateDefinition<S>>,
    initial: S,
    current: Option<S>,
    bus: ChannelBus,
    on_new_state: Option<PersistFn<S>>,
}

impl<S: StateKey> fmt::Debug for StateMachine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("states", &self.definitions.len())
            .field("initial", &self.initial)
            .field("current", &self.current)
            .field("channel", self.bus.channel())
            .finish_non_exhaustive()
    }
}

impl<S: StateKey> StateMachine<S> {
    /// Build a machine from its table
    ///
    /// # Errors
    ///
    /// - [`StateMachineError::DuplicateState`] when two definitions share a
    ///   state or a tag
    /// - [`StateMachineError::UndefinedSuccessor`] when a `next` entry has no
    ///   definition
    /// - [`StateMachineError::UnknownState`] when `initial` has no definition
    pub fn new(
        definitions: impl IntoIterator<Item = StateDefinition<S>>,
        initial: S,
        bus: ChannelBus,
    ) -> Result<Self, StateMachineError> {
        let mut table: IndexMap<S, StateDefinition<S>> = IndexMap::new();
        for definition in definitions {
            let tag = definition.state.tag();
            if table.keys().any(|s| s.tag() == tag) {
                return Err(StateMachineError::DuplicateState { tag });
            }
            table.insert(definition.state.clone(), definition);
        }

        for definition in table.values() {
            if let Some(successor) = definition.next.iter().find(|s| !table.contains_key(*s)) {
                return Err(StateMachineError::UndefinedSuccessor {
                    state: definition.state.tag(),
                    successor: successor.tag(),
                });
            }
        }

        if !table.contains_key(&initial) {
            return Err(StateMachineError::UnknownState { tag: initial.tag() });
        }

        Ok(Self {
            definitions: table,
            initial,
            current: None,
            bus,
            on_new_state: None,
        })
    }

    /// Install the persistence callback
    #[must_use]
    pub fn with_persistence<F>(mut self, callback: F) -> Self
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        self.on_new_state = Some(Box::new(callback));
        self
    }

    /// Enter `state` and emit its enter or resume messages
    ///
    /// # Errors
    ///
    /// [`StateMachineError::UnknownState`] when `state` has no definition.
    pub fn start(
        &mut self,
        state: S,
        mode: StartMode,
    ) -> Result<&StateDefinition<S>, StateMachineError> {
        let definition = self
            .definitions
            .get(&state)
            .ok_or_else(|| StateMachineError::UnknownState { tag: state.tag() })?;

        tracing::debug!(state = %state.tag(), ?mode, "state machine started");
        emit(&self.bus, definition, mode);

        self.current = Some(state);
        Ok(definition)
    }

    /// Emit the enter or resume messages of the current state again
    ///
    /// Lets a caller announce a state reached through [`StateMachine::new_state`].
    ///
    /// # Errors
    ///
    /// [`StateMachineError::NotStarted`] before `start`.
    pub fn announce(&self, mode: StartMode) -> Result<(), StateMachineError> {
        let definition = self.current_definition()?;
        emit(&self.bus, definition, mode);
        Ok(())
    }

    /// Start in the initial state
    ///
    /// # Errors
    ///
    /// Never fails for a machine built by [`StateMachine::new`].
    pub fn start_initial(&mut self) -> Result<&StateDefinition<S>, StateMachineError> {
        self.start(self.initial.clone(), StartMode::Fresh)
    }

    /// Start in the state identified by a persisted tag
    ///
    /// # Errors
    ///
    /// [`StateMachineError::UnknownState`] when no definition carries `tag`.
    pub fn start_from_tag(
        &mut self,
        tag: &StateTag,
        mode: StartMode,
    ) -> Result<&StateDefinition<S>, StateMachineError> {
        let state = self.resolve(tag)?;
        self.start(state, mode)
    }

    /// State whose tag equals `tag` exactly
    ///
    /// # Errors
    ///
    /// [`StateMachineError::UnknownState`] when no definition carries `tag`.
    pub fn resolve(&self, tag: &StateTag) -> Result<S, StateMachineError> {
        self.definitions
            .keys()
            .find(|s| s.tag() == *tag)
            .cloned()
            .ok_or_else(|| StateMachineError::UnknownState { tag: tag.clone() })
    }

    /// Current state
    ///
    /// # Errors
    ///
    /// [`StateMachineError::NotStarted`] before `start`.
    pub fn current_state(&self) -> Result<&S, StateMachineError> {
        self.current.as_ref().ok_or(StateMachineError::NotStarted)
    }

    /// Definition of the current state
    ///
    /// # Errors
    ///
    /// [`StateMachineError::NotStarted`] before `start`.
    pub fn current_definition(&self) -> Result<&StateDefinition<S>, StateMachineError> {
        let current = self.current_state()?;
        self.definitions
            .get(current)
            .ok_or_else(|| StateMachineError::UnknownState { tag: current.tag() })
    }

    /// Definition of any state
    #[must_use]
    pub fn definition(&self, state: &S) -> Option<&StateDefinition<S>> {
        self.definitions.get(state)
    }

    /// Every definition in table order
    pub fn definitions(&self) -> impl Iterator<Item = &StateDefinition<S>> {
        self.definitions.values()
    }

    /// Whether `new_state(candidate)` would succeed
    #[must_use]
    pub fn can_transition(&self, candidate: &S) -> bool {
        self.definitions.contains_key(candidate)
            && self
                .current_definition()
                .is_ok_and(|current| current.allows(candidate))
    }

    /// Move to `candidate`
    ///
    /// On success the persistence callback has been invoked and the new
    /// definition is returned. On failure the current state is unchanged.
    ///
    /// # Errors
    ///
    /// - [`StateMachineError::NotStarted`] before `start`
    /// - [`StateMachineError::UnknownState`] when `candidate` has no definition
    /// - [`StateMachineError::IllegalTransition`] when `candidate` is not a
    ///   declared successor of the current state
    pub fn new_state(&mut self, candidate: S) -> Result<&StateDefinition<S>, StateMachineError> {
        let current = self.current_definition()?;
        if !self.definitions.contains_key(&candidate) {
            return Err(StateMachineError::UnknownState {
                tag: candidate.tag(),
            });
        }
        if !current.allows(&candidate) {
            return Err(StateMachineError::IllegalTransition {
                from: current.state.tag(),
                to: candidate.tag(),
            });
        }

        tracing::debug!(from = %current.state.tag(), to = %candidate.tag(), "state transition");
        if let Some(persist) = &self.on_new_state {
            persist(&candidate);
        }
        let definition = self
            .definitions
            .get(&candidate)
            .ok_or_else(|| StateMachineError::UnknownState {
                tag: candidate.tag(),
            })?;
        self.current = Some(candidate);
        Ok(definition)
    }

    /// Bus carrying enter and resume messages
    #[must_use]
    pub fn bus(&self) -> &ChannelBus {
        &self.bus
    }
}

fn emit<S: StateKey>(bus: &ChannelBus, definition: &StateDefinition<S>, mode: StartMode) {
    let messages = match mode {
        StartMode::Fresh => &definition.on.enter,
        StartMode::Resume => &definition.on.resume,
    };
    for message in messages {
        bus.send(payload(message), Key::kind(message.kind.clone()));
    }
}

fn payload(message: &StateMessage) -> Value {
    match &message.widget {
        Some(widget) => json!({ "widget": widget }),
        None => json!({}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appcell_bus::MessageBus;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    enum Light {
        Off,
        On,
        Broken,
    }

    impl StateKey for Light {
        fn tag(&self) -> StateTag {
            match self {
                Self::Off => StateTag::mode("off"),
                Self::On => StateTag::mode("on"),
                Self::Broken => StateTag::mode("broken"),
            }
        }
    }

    fn table() -> Vec<StateDefinition<Light>> {
        vec![
            StateDefinition::new(Light::Off)
                .disable(["switch-off"])
                .next([Light::On, Light::Broken]),
            StateDefinition::new(Light::On)
                .enable(["switch-off"])
                .on_enter(StateMessage::emit("lit"))
                .on_resume(StateMessage::to_widget("relit", "lamp"))
                .next([Light::Off]),
            StateDefinition::new(Light::Broken),
        ]
    }

    fn machine() -> (StateMachine<Light>, MessageBus) {
        let bus = MessageBus::new();
        let fsm = StateMachine::new(table(), Light::Off, bus.make_channel_bus(None, "lamp"))
            .unwrap();
        (fsm, bus)
    }

    #[test]
    fn legal_transition_is_persisted() {
        let saved = Arc::new(Mutex::new(Vec::new()));
        let (fsm, _bus) = machine();
        let sink = Arc::clone(&saved);
        let mut fsm = fsm.with_persistence(move |s| sink.lock().push(s.clone()));
        fsm.start_initial().unwrap();

        let definition = fsm.new_state(Light::On).unwrap();
        assert!(definition.ui.is_enabled("switch-off"));
        assert_eq!(fsm.current_state().unwrap(), &Light::On);
        assert_eq!(*saved.lock(), vec![Light::On]);
    }

    #[test]
    fn illegal_transition_leaves_state_unchanged() {
        let (mut fsm, _bus) = machine();
        fsm.start(Light::On, StartMode::Fresh).unwrap();

        let err = fsm.new_state(Light::Broken).unwrap_err();
        assert_eq!(
            err,
            StateMachineError::IllegalTransition {
                from: StateTag::mode("on"),
                to: StateTag::mode("broken"),
            }
        );
        assert_eq!(fsm.current_state().unwrap(), &Light::On);
    }

    #[test]
    fn no_implicit_self_loop() {
        let (mut fsm, _bus) = machine();
        fsm.start_initial().unwrap();
        assert!(!fsm.can_transition(&Light::Off));
        assert!(fsm.new_state(Light::Off).is_err());
    }

    #[test]
    fn not_started() {
        let (mut fsm, _bus) = machine();
        assert_eq!(fsm.current_state(), Err(StateMachineError::NotStarted));
        assert_eq!(fsm.new_state(Light::On).unwrap_err(), StateMachineError::NotStarted);
    }

    #[test]
    fn start_emits_enter_messages_and_new_state_does_not() {
        let (mut fsm, bus) = machine();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            fsm.bus().on("lit", move |m| seen.lock().push(m.clone()));
        }

        fsm.start_initial().unwrap();
        fsm.new_state(Light::On).unwrap();
        assert!(seen.lock().is_empty());

        fsm.start(Light::On, StartMode::Fresh).unwrap();
        assert_eq!(*seen.lock(), vec![json!({})]);
        drop(bus);
    }

    #[test]
    fn announce_emits_the_current_enter_messages() {
        let (mut fsm, _bus) = machine();
        let hits = Arc::new(Mutex::new(0));
        {
            let hits = Arc::clone(&hits);
            fsm.bus().on("lit", move |_| *hits.lock() += 1);
        }
        fsm.start_initial().unwrap();
        fsm.new_state(Light::On).unwrap();

        fsm.announce(StartMode::Fresh).unwrap();

        assert_eq!(*hits.lock(), 1);
    }

    #[test]
    fn resume_emits_resume_messages_with_widget_address() {
        let (mut fsm, _bus) = machine();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            fsm.bus().on("relit", move |m| seen.lock().push(m.clone()));
        }

        fsm.start_from_tag(&StateTag::mode("on"), StartMode::Resume).unwrap();

        assert_eq!(*seen.lock(), vec![json!({"widget": "lamp"})]);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let (mut fsm, _bus) = machine();
        let tag = StateTag::mode("on").with("brightness", "full");
        assert_eq!(
            fsm.start_from_tag(&tag, StartMode::Fresh).unwrap_err(),
            StateMachineError::UnknownState { tag }
        );
    }

    #[test]
    fn undefined_successor_is_rejected() {
        let bus = MessageBus::new();
        let err = StateMachine::new(
            vec![StateDefinition::new(Light::Off).next([Light::On])],
            Light::Off,
            bus.make_channel_bus(None, "lamp"),
        )
        .unwrap_err();
        assert_eq!(
            err,
            StateMachineError::UndefinedSuccessor {
                state: StateTag::mode("off"),
                successor: StateTag::mode("on"),
            }
        );
    }

    #[test]
    fn duplicate_definition_is_rejected() {
        let bus = MessageBus::new();
        let err = StateMachine::new(
            vec![StateDefinition::new(Light::Off), StateDefinition::new(Light::Off)],
            Light::Off,
            bus.make_channel_bus(None, "lamp"),
        )
        .unwrap_err();
        assert_eq!(err, StateMachineError::DuplicateState { tag: StateTag::mode("off") });
    }

    fn light() -> impl Strategy<Value = Light> {
        prop_oneof![Just(Light::Off), Just(Light::On), Just(Light::Broken)]
    }

    proptest! {
        #[test]
        fn transitions_follow_the_next_lists(path in prop::collection::vec(light(), 0..12)) {
            let (mut fsm, _bus) = machine();
            fsm.start_initial().unwrap();
            for candidate in path {
                let current = fsm.current_state().unwrap().clone();
                let listed = fsm.definition(&current).unwrap().allows(&candidate);
                prop_assert_eq!(fsm.can_transition(&candidate), listed);

                let moved = fsm.new_state(candidate.clone()).is_ok();
                prop_assert_eq!(moved, listed);
                let expected = if listed { candidate } else { current };
                prop_assert_eq!(fsm.current_state().unwrap(), &expected);
            }
        }
    }
}
