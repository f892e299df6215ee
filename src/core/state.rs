//! State and entity traits.
//!
//! A `State` is one value of an entity's fixed, enumerated state set. An
//! `Entity` is the persisted record that carries a state and is driven
//! through transitions by jobs.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// Trait for state machine states.
///
/// All methods are pure. States are plain values describing where an
/// entity currently is in its lifecycle.
///
/// # Example
///
/// ```rust
/// use statejob::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum ImportState {
///     Idle,
///     Running,
///     Done,
///     Failed,
/// }
///
/// impl State for ImportState {
///     fn name(&self) -> &str {
///         match self {
///             Self::Idle => "idle",
///             Self::Running => "running",
///             Self::Done => "done",
///             Self::Failed => "failed",
///         }
///     }
///
///     fn is_final(&self) -> bool {
///         matches!(self, Self::Done | Self::Failed)
///     }
///
///     fn is_error(&self) -> bool {
///         matches!(self, Self::Failed)
///     }
/// }
/// ```
pub trait State:
    Clone + PartialEq + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync
{
    /// Get the state's name for display/logging.
    fn name(&self) -> &str;

    /// Check if this is a final (terminal) state.
    ///
    /// Default implementation returns `false`.
    fn is_final(&self) -> bool {
        false
    }

    /// Check if this is an error state.
    ///
    /// Default implementation returns `false`.
    fn is_error(&self) -> bool {
        false
    }
}

/// Identifier of a persisted entity.
///
/// Crosses the queue boundary, so it serializes as a bare integer or string.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(id) => write!(f, "{id}"),
            EntityId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        EntityId::Int(id)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        EntityId::Text(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        EntityId::Text(id)
    }
}

/// A stateful record driven through its states by background jobs.
///
/// The entity is owned by the surrounding application. Jobs only read its
/// attributes (to build payloads) and change its state through events.
pub trait Entity: Send + Sync + 'static {
    /// The entity's state type.
    type State: State + 'static;

    /// Type name sent across the queue and used to resolve the entity again.
    const TYPE_NAME: &'static str;

    /// Unique identifier of this record.
    fn id(&self) -> EntityId;

    /// Current state.
    fn state(&self) -> &Self::State;

    /// Overwrite the current state. Called by the state machine only.
    fn set_state(&mut self, state: Self::State);

    /// Whether the in-memory attributes would pass validation.
    ///
    /// Default implementation returns `true`.
    fn is_valid(&self) -> bool {
        true
    }

    /// Discard uncommitted attribute changes.
    ///
    /// Called after a failed job left the entity invalid, so the following
    /// state write is not blocked by stale data. Default is a no-op.
    fn restore_attributes(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
    enum TestState {
        Idle,
        Running,
        Done,
        Failed,
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::Idle => "idle",
                Self::Running => "running",
                Self::Done => "done",
                Self::Failed => "failed",
            }
        }

        fn is_final(&self) -> bool {
            matches!(self, Self::Done | Self::Failed)
        }

        fn is_error(&self) -> bool {
            matches!(self, Self::Failed)
        }
    }

    struct Upload {
        id: i64,
        state: TestState,
    }

    impl Entity for Upload {
        type State = TestState;
        const TYPE_NAME: &'static str = "Upload";

        fn id(&self) -> EntityId {
            EntityId::Int(self.id)
        }

        fn state(&self) -> &TestState {
            &self.state
        }

        fn set_state(&mut self, state: TestState) {
            self.state = state;
        }
    }

    #[test]
    fn state_flags_follow_definition() {
        assert!(!TestState::Idle.is_final());
        assert!(!TestState::Running.is_error());
        assert!(TestState::Done.is_final());
        assert!(!TestState::Done.is_error());
        assert!(TestState::Failed.is_final());
        assert!(TestState::Failed.is_error());
    }

    #[test]
    fn entity_defaults_are_valid_and_restore_is_noop() {
        let mut upload = Upload {
            id: 7,
            state: TestState::Running,
        };

        assert!(upload.is_valid());
        upload.restore_attributes();
        assert_eq!(upload.state(), &TestState::Running);
        assert_eq!(upload.id(), EntityId::Int(7));
        assert_eq!(Upload::TYPE_NAME, "Upload");
    }

    #[test]
    fn entity_id_serializes_untagged() {
        assert_eq!(serde_json::to_string(&EntityId::Int(43)).unwrap(), "43");
        assert_eq!(
            serde_json::to_string(&EntityId::from("abc")).unwrap(),
            "\"abc\""
        );

        let parsed: EntityId = serde_json::from_str("43").unwrap();
        assert_eq!(parsed, EntityId::Int(43));
        let parsed: EntityId = serde_json::from_str("\"u-1\"").unwrap();
        assert_eq!(parsed, EntityId::Text("u-1".to_string()));
    }

    #[test]
    fn entity_id_displays_raw_value() {
        assert_eq!(EntityId::from(12).to_string(), "12");
        assert_eq!(EntityId::from("x-9".to_string()).to_string(), "x-9");
    }
}
