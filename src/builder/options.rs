//! Result declarations: options as written, rules as registered.

use crate::builder::error::OptionConflict;
use crate::core::{Entity, Guard};
use crate::job::JobResult;
use std::time::Duration;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Options of one `result` declaration.
///
/// Exactly one of `state` or `retry_after` decides what the result does.
/// `when` and `retry_if_state` refine a state transition and cannot be
/// combined with `retry_after`.
pub struct ResultOptions<E: Entity> {
    pub(crate) state: Option<E::State>,
    pub(crate) guard: Option<Guard<E>>,
    pub(crate) retry_if_state: Option<E::State>,
    pub(crate) retry_after: Option<Duration>,
}

impl<E: Entity> ResultOptions<E> {
    pub fn new() -> Self {
        Self {
            state: None,
            guard: None,
            retry_if_state: None,
            retry_after: None,
        }
    }

    /// Transition to `state` from any state when the result arrives.
    pub fn state(mut self, state: E::State) -> Self {
        self.state = Some(state);
        self
    }

    /// Only transition when the predicate holds.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Guard::new(predicate));
        self
    }

    /// Only transition when the guard holds.
    pub fn guard(mut self, guard: Guard<E>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Go back to the on_enter state instead if the entity is in `state`
    /// when the result arrives.
    pub fn retry_if_state(mut self, state: E::State) -> Self {
        self.retry_if_state = Some(state);
        self
    }

    /// Re-enqueue the job after `delay` instead of transitioning.
    pub fn retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    /// Check the options for contradictions, collecting all of them.
    pub fn validate(&self) -> Validation<(), NonEmptyVec<OptionConflict>> {
        let mut checks: Vec<Validation<(), NonEmptyVec<OptionConflict>>> = Vec::new();
        let retries_later = self.retry_after.is_some();

        let check = if self.retry_if_state.is_some() && retries_later {
            Validation::fail(OptionConflict::RetryIfStateWithRetryAfter)
        } else {
            Validation::success(())
        };
        checks.push(check);

        let check = if self.guard.is_some() && retries_later {
            Validation::fail(OptionConflict::GuardWithRetryAfter)
        } else {
            Validation::success(())
        };
        checks.push(check);

        let check = if self.state.is_none() && !retries_later {
            Validation::fail(OptionConflict::MissingTarget)
        } else {
            Validation::success(())
        };
        checks.push(check);

        Validation::all_vec(checks).map(|_| ())
    }
}

impl<E: Entity> Default for ResultOptions<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Return-to-enter-state transition attached to a result.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryIfState<S> {
    /// State that triggers the retry
    pub from: S,
    /// The binding's on_enter state when the result was declared
    pub back_to: S,
}

/// A validated result declaration.
pub enum ResultRule<E: Entity> {
    /// Move to `state` when the guard holds, preferring the retry
    /// transition when the entity is in its `from` state.
    Transition {
        result: JobResult,
        state: E::State,
        guard: Option<Guard<E>>,
        retry_if_state: Option<RetryIfState<E::State>>,
    },

    /// Leave the state alone and enqueue the job again after `delay`.
    RetryAfter { result: JobResult, delay: Duration },
}

impl<E: Entity> ResultRule<E> {
    pub fn result(&self) -> &JobResult {
        match self {
            ResultRule::Transition { result, .. } | ResultRule::RetryAfter { result, .. } => result,
        }
    }
}
