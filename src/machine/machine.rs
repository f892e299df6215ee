//! State machine that dispatches named events on entities.

use crate::core::{Entity, State, StateTransition};
use crate::machine::error::MachineError;
use crate::machine::transition::{Fired, Transition};
use crate::BoxError;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Suffix that marks the strict, invocable form of an event.
pub const BANG: char = '!';

/// Callback run after a transition into a given state.
pub type AfterTransition<E> = Arc<dyn Fn(&E) -> Result<(), BoxError> + Send + Sync>;

/// Named action run instead of a transition.
pub type Helper<E> = Arc<dyn Fn(&mut E) -> Result<(), BoxError> + Send + Sync>;

/// Event table for one entity type.
///
/// The machine holds only definitions; it is shared by every instance of
/// the entity type. State lives on the entity itself.
pub struct StateMachine<E: Entity> {
    events: BTreeMap<String, Vec<Transition<E>>>,
    helpers: BTreeMap<String, Helper<E>>,
    after: Vec<(E::State, AfterTransition<E>)>,
}

impl<E: Entity> StateMachine<E> {
    /// Create an empty machine.
    pub fn new() -> Self {
        Self {
            events: BTreeMap::new(),
            helpers: BTreeMap::new(),
            after: Vec::new(),
        }
    }

    /// Append transitions to a named event.
    ///
    /// Transitions are tried in declaration order; the first one that can
    /// fire wins. Declaring the same event again extends its list.
    pub fn event<I>(&mut self, name: impl Into<String>, transitions: I) -> &mut Self
    where
        I: IntoIterator<Item = Transition<E>>,
    {
        self.events
            .entry(name.into())
            .or_default()
            .extend(transitions);
        self
    }

    /// Register a callback fired after every transition whose target is
    /// `state`, loopbacks included.
    pub fn after_transition_to<F>(&mut self, state: E::State, callback: F) -> &mut Self
    where
        F: Fn(&E) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.after.push((state, Arc::new(callback)));
        self
    }

    /// Register a named action invoked by method name instead of a transition.
    pub fn helper<F>(&mut self, method: impl Into<String>, action: F) -> &mut Self
    where
        F: Fn(&mut E) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.helpers.insert(method.into(), Arc::new(action));
        self
    }

    /// Names of all declared events, sorted.
    pub fn events(&self) -> Vec<&str> {
        self.events.keys().map(String::as_str).collect()
    }

    /// Names of all registered helpers, sorted.
    pub fn helpers(&self) -> Vec<&str> {
        self.helpers.keys().map(String::as_str).collect()
    }

    /// Whether `event` has a transition that can fire for the entity (pure).
    pub fn can_fire(&self, entity: &E, event: &str) -> bool {
        self.events
            .get(event)
            .is_some_and(|transitions| transitions.iter().any(|t| t.can_fire(entity)))
    }

    /// Fire an event, applying the first transition that can fire.
    ///
    /// Returns `Fired::Declined` when no transition matches. Callbacks for
    /// the target state run after the new state is set. All of them run
    /// even when one fails; the first failure is reported and the state
    /// change stays applied.
    pub fn fire(&self, entity: &mut E, event: &str) -> Result<Fired<E::State>, MachineError> {
        let transitions = self
            .events
            .get(event)
            .ok_or_else(|| MachineError::UnknownEvent {
                event: event.to_string(),
            })?;

        let Some(transition) = transitions.iter().find(|t| t.can_fire(entity)) else {
            debug!(
                event,
                state = entity.state().name(),
                "no transition matched"
            );
            return Ok(Fired::Declined);
        };

        let record = StateTransition {
            event: event.to_string(),
            from: entity.state().clone(),
            to: transition.to.clone(),
            timestamp: Utc::now(),
        };
        entity.set_state(record.to.clone());
        debug!(
            event,
            from = record.from.name(),
            to = record.to.name(),
            changed = record.changed_state(),
            "transition applied"
        );

        // Every callback for the target runs; the first failure is reported.
        let mut first_failure = None;
        for (target, callback) in &self.after {
            if *target != record.to {
                continue;
            }
            if let Err(source) = callback(entity) {
                warn!(
                    event,
                    state = record.to.name(),
                    error = %source,
                    "after-transition callback failed"
                );
                if first_failure.is_none() {
                    first_failure = Some(source);
                }
            }
        }

        match first_failure {
            Some(source) => Err(MachineError::Callback {
                event: event.to_string(),
                state: record.to.name().to_string(),
                source,
            }),
            None => Ok(Fired::Transitioned(record)),
        }
    }

    /// Fire an event that must transition.
    pub fn fire_strict(
        &self,
        entity: &mut E,
        event: &str,
    ) -> Result<Fired<E::State>, MachineError> {
        match self.fire(entity, event)? {
            Fired::Declined => Err(MachineError::InvalidTransition {
                event: event.to_string(),
                state: entity.state().name().to_string(),
            }),
            fired => Ok(fired),
        }
    }

    /// Invoke a helper or event by method name.
    ///
    /// Helpers are looked up first. Otherwise a trailing `!` fires the event
    /// strictly and a bare name fires it leniently.
    pub fn invoke(&self, entity: &mut E, method: &str) -> Result<Fired<E::State>, MachineError> {
        if let Some(helper) = self.helpers.get(method) {
            helper(entity).map_err(|source| MachineError::Helper {
                method: method.to_string(),
                source,
            })?;
            return Ok(Fired::Helper);
        }

        match method.strip_suffix(BANG) {
            Some(event) => self.fire_strict(entity, event),
            None => self.fire(entity, method),
        }
    }
}

impl<E: Entity> Default for StateMachine<E> {
    fn default() -> Self {
        Self::new()
    }
}
