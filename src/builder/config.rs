//! Binding configuration carried on each job binding.

use serde::{Deserialize, Serialize};

/// Queue name used when a binding does not set one.
pub const DEFAULT_QUEUE: &str = "default";

/// Settings a binding passes along with every job it enqueues.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    /// Queue the transport should route the job's requests to
    pub queue: String,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            queue: DEFAULT_QUEUE.to_string(),
        }
    }
}
