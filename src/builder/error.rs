//! Errors raised while declaring job bindings.

use crate::job::{JobName, JobResult};
use thiserror::Error;

/// A single contradiction inside one result declaration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OptionConflict {
    #[error("retry_if_state cannot be combined with retry_after")]
    RetryIfStateWithRetryAfter,

    #[error("a guard cannot be combined with retry_after")]
    GuardWithRetryAfter,

    #[error("either a target state or retry_after is required")]
    MissingTarget,
}

/// Configuration errors. Raised while the binding is declared, never
/// while jobs run.
#[derive(Debug, Error)]
pub enum BindError {
    #[error(
        "Job {job}: expected exactly one result => state entry, got {entries}. \
         Use an explicit state option when passing additional options"
    )]
    InvalidResultMapping { job: JobName, entries: usize },

    #[error("Job {job}: on_enter must be declared above result '{result}' which uses retry_if_state")]
    RetryBeforeOnEnter { job: JobName, result: JobResult },

    #[error(
        "Job {job}: on_enter('{state}') must be declared above every result which uses retry_if_state"
    )]
    OnEnterAfterRetry { job: JobName, state: String },

    #[error("Job {job}: result '{result}' uses retry_after and must be its only rule")]
    RetryAfterNotExclusive { job: JobName, result: JobResult },

    #[error("Job {job}: result '{result}' has conflicting options: {}", join(.conflicts))]
    ConflictingOptions {
        job: JobName,
        result: JobResult,
        conflicts: Vec<OptionConflict>,
    },
}

fn join(conflicts: &[OptionConflict]) -> String {
    conflicts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
