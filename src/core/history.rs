//! Records of applied state transitions.

use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record of a single applied state transition.
///
/// Returned by the state machine whenever an event moves an entity,
/// including loopback transitions that leave the state unchanged.
///
/// # Example
///
/// ```rust
/// use statejob::core::{State, StateTransition};
/// use serde::{Deserialize, Serialize};
/// use chrono::Utc;
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum Phase {
///     Running,
///     Done,
/// }
///
/// impl State for Phase {
///     fn name(&self) -> &str {
///         match self {
///             Self::Running => "running",
///             Self::Done => "done",
///         }
///     }
/// }
///
/// let record = StateTransition {
///     event: "import_job_ok".to_string(),
///     from: Phase::Running,
///     to: Phase::Done,
///     timestamp: Utc::now(),
/// };
/// assert!(record.changed_state());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateTransition<S: State> {
    /// Name of the event that caused the transition
    pub event: String,
    /// The state being transitioned from
    pub from: S,
    /// The state being transitioned to
    pub to: S,
    /// When the transition was applied
    pub timestamp: DateTime<Utc>,
}

impl<S: State> StateTransition<S> {
    /// Whether the transition moved the entity to a different state.
    pub fn changed_state(&self) -> bool {
        self.from != self.to
    }
}
