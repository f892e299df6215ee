//! State machine errors.

use crate::BoxError;
use thiserror::Error;

/// Errors raised while dispatching events on an entity.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error("Unknown event '{event}'")]
    UnknownEvent { event: String },

    #[error("Cannot fire '{event}' from state '{state}'")]
    InvalidTransition { event: String, state: String },

    #[error("Callback after '{event}' into '{state}' failed: {source}")]
    Callback {
        event: String,
        state: String,
        #[source]
        source: BoxError,
    },

    #[error("Helper '{method}' failed: {source}")]
    Helper {
        method: String,
        #[source]
        source: BoxError,
    },
}
