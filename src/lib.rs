//! Statejob: background jobs driven by state machine transitions.
//!
//! Entering a state enqueues a job carrying a snapshot of the entity; the
//! job's outcome comes back as a result event that drives the next
//! transition.
//!
//! # Core Concepts
//!
//! - **Entity**: a persisted record with an id and a current `State`
//! - **State machine**: named events, after-transition callbacks and helpers
//! - **Binding**: declares which state enqueues a job and what each job
//!   result does (transition, guarded transition, retry-if-state, retry-after)
//! - **Runner**: executes the job's domain logic and always reports a result
//!   event, `error` when the logic fails
//!
//! # Example
//!
//! ```rust
//! use statejob::builder::bind;
//! use statejob::core::{Entity, EntityId, State};
//! use statejob::job::{Job, JobResult, JobRunner, MemoryQueue, MemoryStore, Payload};
//! use statejob::machine::{StateMachine, Transition};
//! use statejob::BoxError;
//! use serde::{Deserialize, Serialize};
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
//! #[derive(Clone)]
//! struct Upload { id: i64, state: Phase }
//!
//! impl Entity for Upload {
//!     type State = Phase;
//!     const TYPE_NAME: &'static str = "Upload";
//!     fn id(&self) -> EntityId { EntityId::Int(self.id) }
//!     fn state(&self) -> &Phase { &self.state }
//!     fn set_state(&mut self, state: Phase) { self.state = state; }
//! }
//!
//! struct ScanJob;
//!
//! impl Job<Upload> for ScanJob {
//!     fn name(&self) -> statejob::job::JobName {
//!         "ScanJob".into()
//!     }
//!
//!     fn perform_with_result(&self, _: &mut Upload, _: &Payload) -> Result<JobResult, BoxError> {
//!         Ok(JobResult::ok())
//!     }
//! }
//!
//! let queue = Arc::new(MemoryQueue::new());
//! let mut machine = StateMachine::new();
//! machine.event("scan", [Transition::new(Phase::Idle, Phase::Running)]);
//! bind(&mut machine, "ScanJob", queue.clone(), |job| {
//!     job.on_enter(Phase::Running)?
//!         .result_to("ok", Phase::Done)?
//!         .result_to("error", Phase::Failed)
//! })?;
//! let machine = Arc::new(machine);
//!
//! let store = MemoryStore::new();
//! let mut upload = Upload { id: 1, state: Phase::Idle };
//! machine.fire(&mut upload, "scan")?;
//! store.insert(upload);
//!
//! let runner = JobRunner::new(ScanJob, Arc::clone(&machine), store);
//! for scheduled in queue.take_due(chrono::Utc::now()) {
//!     runner.perform(&scheduled.request)?;
//! }
//! assert_eq!(runner.store().get(&EntityId::Int(1)).unwrap().state, Phase::Done);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builder;
pub mod core;
pub mod job;
pub mod machine;

/// Boxed error for failures raised by user code (domain logic, callbacks).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// Re-export commonly used types
pub use crate::builder::{bind, BindError, JobBinding, JobBindingBuilder, ResultOptions};
pub use crate::core::{Entity, EntityId, Guard, State};
pub use crate::job::{Job, JobName, JobQueue, JobRequest, JobResult, JobRunner, Payload};
pub use crate::machine::StateMachine;
