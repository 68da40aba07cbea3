// src/context.rs

//! Shared, opaque per-flow context.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Caller-supplied value shared by every unit of a flow.
///
/// The scheduler never inspects it; it only hands the same instance to each
/// unit it dispatches, so sibling tasks can share contextual values without
/// coupling to each other. Cloning is cheap (shared allocation).
#[derive(Clone)]
pub struct JobContext(Arc<dyn Any + Send + Sync>);

impl JobContext {
    /// Wrap an arbitrary value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// A context carrying nothing.
    pub fn empty() -> Self {
        Self(Arc::new(()))
    }

    /// Borrow the wrapped value, if it has type `T`.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl Default for JobContext {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for JobContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JobContext(..)")
    }
}
