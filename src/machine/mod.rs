//! In-process state machine engine.
//!
//! Entities carry their own state; a `StateMachine` holds the event table
//! for one entity type and applies transitions on request.
//!
//! # Key Concepts
//!
//! - **Events**: named, ordered lists of transitions; first match wins
//! - **Callbacks**: run after any transition into a given state
//! - **Helpers**: named actions invoked like events but running custom code
//! - **Bang convention**: `name!` fires strictly, `name` fires leniently

mod error;
#[allow(clippy::module_inception)]
mod machine;
mod transition;

pub use error::MachineError;
pub use machine::{AfterTransition, Helper, StateMachine, BANG};
pub use transition::{Fired, Source, Transition};
