//! Core types shared by the state machine, the binder and the job runner.
//!
//! - States and entities via the `State` and `Entity` traits
//! - Guard predicates over entities
//! - Records of applied transitions

mod guard;
mod history;
mod state;

pub use guard::Guard;
pub use history::StateTransition;
pub use state::{Entity, EntityId, State};
