//! Guard predicates for controlling state transitions.
//!
//! Guards are pure boolean functions over an entity that decide whether a
//! transition may fire. A transition without a guard always may.

use std::fmt;
use std::sync::Arc;

/// Pure predicate that determines if a transition can fire for an entity.
///
/// Guards are cheap to clone; clones share the same predicate.
///
/// # Example
///
/// ```rust
/// use statejob::core::Guard;
///
/// struct Report {
///     rows: usize,
/// }
///
/// let has_rows = Guard::new(|report: &Report| report.rows > 0);
///
/// assert!(has_rows.check(&Report { rows: 3 }));
/// assert!(!has_rows.check(&Report { rows: 0 }));
/// ```
pub struct Guard<E> {
    predicate: Arc<dyn Fn(&E) -> bool + Send + Sync>,
}

impl<E> Guard<E> {
    /// Create a guard from a pure predicate function.
    ///
    /// The predicate must be deterministic and thread-safe.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(predicate),
        }
    }

    /// Check if the guard allows a transition for this entity.
    pub fn check(&self, entity: &E) -> bool {
        (self.predicate)(entity)
    }
}

impl<E> Clone for Guard<E> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<E> fmt::Debug for Guard<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard(..)")
    }
}
