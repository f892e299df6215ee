//! Job naming, queue transport and the job runner.

mod naming;
mod queue;
mod runner;

pub use naming::{result_event_name, result_method_name, JobName, JobResult};
pub use queue::{JobQueue, JobRequest, MemoryQueue, Payload, QueueError, ScheduledJob};
pub use runner::{EntityStore, Job, JobRunner, MemoryStore, Performed, RunError, StoreError};
