// src/flow/unit.rs

use std::time::Duration;

use async_trait::async_trait;

use crate::context::JobContext;
use crate::errors::{Error, Result};

/// A named completable unit of work owned by a [`Flow`](crate::flow::Flow).
///
/// Returning from `run()` — with `Ok` or `Err` — *is* the unit's completion
/// signal: success and failure both count as "done", so a failing unit never
/// deadlocks its container. Errors are collected into the owning flow's
/// [`RunSummary`](crate::flow::RunSummary) rather than silently absorbed.
#[async_trait]
pub trait Unit: Send + Sync + 'static {
    /// Perform the unit of work. Must eventually return, even when the unit
    /// has nothing to do (empty target, no configuration).
    async fn run(&self, ctx: &JobContext) -> Result<()>;

    /// Optional stall protection: when set, the owning flow force-completes
    /// the unit after this long and records it as stalled.
    fn timeout(&self) -> Option<Duration> {
        None
    }
}

#[async_trait]
impl Unit for Box<dyn Unit> {
    async fn run(&self, ctx: &JobContext) -> Result<()> {
        (**self).run(ctx).await
    }

    fn timeout(&self) -> Option<Duration> {
        (**self).timeout()
    }
}

/// Signal a unit delivers to its owning flow when it finishes.
///
/// Only `End` advances the fan-in counter; other values are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    End,
    Progress,
}

/// Terminal outcome of one dispatched unit within a run.
#[derive(Debug)]
pub enum UnitOutcome {
    Success,
    Failed(Error),
    /// The unit exceeded its timeout and was force-completed.
    Stalled,
}

impl From<Result<()>> for UnitOutcome {
    fn from(res: Result<()>) -> Self {
        match res {
            Ok(()) => UnitOutcome::Success,
            Err(err) => UnitOutcome::Failed(err),
        }
    }
}
