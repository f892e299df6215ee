//! Declarative job bindings for state machines.
//!
//! A binding ties one job to one entity type: entering a state enqueues
//! the job, and every result the job can report becomes an event (or a
//! delayed retry) on the entity's state machine.
//!
//! # Example
//!
//! ```rust
//! use statejob::builder::{bind, ResultOptions};
//! use statejob::core::{Entity, EntityId, State};
//! use statejob::job::{MemoryQueue, Payload};
//! use statejob::machine::{StateMachine, Transition};
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
//! enum Phase { Idle, Running, Done, Failed }
//!
//! impl State for Phase {
//!     fn name(&self) -> &str {
//!         match self {
//!             Self::Idle => "idle",
//!             Self::Running => "running",
//!             Self::Done => "done",
//!             Self::Failed => "failed",
//!         }
//!     }
//! }
//!
//! struct Import { id: i64, state: Phase, rows: u64 }
//!
//! impl Entity for Import {
//!     type State = Phase;
//!     const TYPE_NAME: &'static str = "Import";
//!     fn id(&self) -> EntityId { EntityId::Int(self.id) }
//!     fn state(&self) -> &Phase { &self.state }
//!     fn set_state(&mut self, state: Phase) { self.state = state; }
//! }
//!
//! let queue = Arc::new(MemoryQueue::new());
//! let mut machine = StateMachine::new();
//! machine.event("run", [Transition::new(Phase::Idle, Phase::Running)]);
//!
//! bind(&mut machine, "ImportJob", queue.clone(), |job| {
//!     job.on_enter(Phase::Running)?
//!         .payload(|import: &Import| {
//!             let mut payload = Payload::new();
//!             payload.insert("rows".to_string(), json!(import.rows));
//!             payload
//!         })
//!         .result("ok", ResultOptions::new().state(Phase::Done))?
//!         .result_to("error", Phase::Failed)
//! })?;
//!
//! let mut import = Import { id: 1, state: Phase::Idle, rows: 10 };
//! machine.fire(&mut import, "run")?;
//! assert_eq!(queue.len(), 1);
//!
//! machine.invoke(&mut import, "import_job_ok!")?;
//! assert_eq!(import.state, Phase::Done);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod binding;
mod config;
mod error;
mod options;

pub use binding::{bind, JobBinding, JobBindingBuilder, PayloadFn};
pub use config::{BindingConfig, DEFAULT_QUEUE};
pub use error::{BindError, OptionConflict};
pub use options::{ResultOptions, ResultRule, RetryIfState};
