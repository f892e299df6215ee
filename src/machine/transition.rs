//! Event transitions and dispatch outcomes.

use crate::core::{Entity, Guard, State, StateTransition};

/// Source side of a transition.
#[derive(Clone, Debug, PartialEq)]
pub enum Source<S> {
    /// Matches every state.
    Any,
    /// Matches exactly this state.
    State(S),
}

impl<S: PartialEq> Source<S> {
    /// Whether an entity in `state` may leave through this source (pure).
    pub fn matches(&self, state: &S) -> bool {
        match self {
            Source::Any => true,
            Source::State(expected) => expected == state,
        }
    }
}

/// A single transition of a named event.
pub struct Transition<E: Entity> {
    pub from: Source<E::State>,
    pub to: E::State,
    pub guard: Option<Guard<E>>,
}

impl<E: Entity> Transition<E> {
    /// Transition from an exact state.
    pub fn new(from: E::State, to: E::State) -> Self {
        Self {
            from: Source::State(from),
            to,
            guard: None,
        }
    }

    /// Transition from any state.
    pub fn from_any(to: E::State) -> Self {
        Self {
            from: Source::Any,
            to,
            guard: None,
        }
    }

    /// Attach an optional guard. `None` keeps the transition unguarded.
    pub fn guarded(mut self, guard: Option<Guard<E>>) -> Self {
        self.guard = guard;
        self
    }

    /// Check if this transition can fire for the entity (pure).
    pub fn can_fire(&self, entity: &E) -> bool {
        if !self.from.matches(entity.state()) {
            return false;
        }

        self.guard.as_ref().map_or(true, |g| g.check(entity))
    }
}

impl<E: Entity> Clone for Transition<E> {
    fn clone(&self) -> Self {
        Self {
            from: self.from.clone(),
            to: self.to.clone(),
            guard: self.guard.clone(),
        }
    }
}

/// Outcome of dispatching an event or helper on an entity.
#[derive(Clone, Debug)]
pub enum Fired<S: State> {
    /// A transition was applied.
    Transitioned(StateTransition<S>),

    /// A helper ran instead of a transition.
    Helper,

    /// No transition of the event matched the entity's state and guards.
    Declined,
}

impl<S: State> Fired<S> {
    /// The applied transition, if any.
    pub fn transition(&self) -> Option<&StateTransition<S>> {
        match self {
            Fired::Transitioned(record) => Some(record),
            _ => None,
        }
    }
}
