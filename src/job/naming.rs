//! Job identifiers, result labels and the event names derived from them.

use crate::machine::BANG;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a job, e.g. `Billing::InvoiceJob`.
///
/// Result event names are derived from it, so renaming a job renames its
/// events.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobName(String);

impl JobName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Snake-cased segments of the name joined by `_`.
    ///
    /// Segments are separated by `::` or `/`.
    ///
    /// ```rust
    /// use statejob::job::JobName;
    ///
    /// let job = JobName::new("StateMachineJob::TestJob");
    /// assert_eq!(job.event_prefix(), "state_machine_job_test_job");
    /// ```
    pub fn event_prefix(&self) -> String {
        self.0
            .split("::")
            .flat_map(|part| part.split('/'))
            .filter(|segment| !segment.is_empty())
            .map(underscore)
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl fmt::Display for JobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for JobName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Symbolic outcome of a job's domain logic.
///
/// A label, not an exception: `ok`, `error`, or any domain-specific value.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobResult(String);

impl JobResult {
    pub const OK: &'static str = "ok";
    pub const ERROR: &'static str = "error";

    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn ok() -> Self {
        Self::new(Self::OK)
    }

    /// Label signalled whenever domain logic fails.
    pub fn error() -> Self {
        Self::new(Self::ERROR)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobResult {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for JobResult {
    fn from(label: String) -> Self {
        Self(label)
    }
}

/// Event fired on the entity when `job` finishes with `result`.
///
/// Pure: depends on nothing but its arguments.
///
/// ```rust
/// use statejob::job::{result_event_name, JobName, JobResult};
///
/// let name = result_event_name(&JobName::new("Imports::CsvJob"), &JobResult::ok());
/// assert_eq!(name, "imports_csv_job_ok");
/// ```
pub fn result_event_name(job: &JobName, result: &JobResult) -> String {
    format!("{}_{}", job.event_prefix(), result.as_str())
}

/// Invocable (strict) form of [`result_event_name`].
pub fn result_method_name(job: &JobName, result: &JobResult) -> String {
    let mut method = result_event_name(job, result);
    method.push(BANG);
    method
}

/// Snake-case one CamelCase segment, keeping acronym runs together.
fn underscore(segment: &str) -> String {
    let chars: Vec<char> = segment.chars().collect();
    let mut out = String::with_capacity(segment.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower)
            {
                out.push('_');
            }
        }
        out.push(if c == '-' { '_' } else { c.to_ascii_lowercase() });
    }

    out
}
