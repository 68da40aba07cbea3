// src/flow/mod.rs

//! Fan-out/fan-in completion scheduling.
//!
//! - [`unit`] defines the contract for a named completable unit.
//! - [`scheduler`] contains the generic container that dispatches its units
//!   concurrently, counts their completions, and fires a successor exactly
//!   once when the count reaches the run's snapshot size.
//!
//! The container is applied recursively: [`Job`] holds tasks, [`Work`] holds
//! jobs, both through the same [`Flow`] type.

pub mod scheduler;
pub mod unit;

pub use scheduler::{Flow, RunHandle, RunSummary, Successor};
pub use unit::{Signal, Unit, UnitOutcome};

/// A job: a flow of heterogeneous tasks, keyed by task id.
pub type Job = Flow<Box<dyn Unit>>;

/// A work: a flow of jobs, with fan-out/fan-in semantics identical to a
/// job's — the same protocol one nesting level up.
pub type Work = Flow<Job>;

impl Flow<Box<dyn Unit>> {
    /// Attach any [`Unit`] implementation as a task, boxing it in place.
    pub fn attach_task(&self, id: impl Into<String>, task: impl Unit) {
        self.attach(id, Box::new(task) as Box<dyn Unit>);
    }
}
