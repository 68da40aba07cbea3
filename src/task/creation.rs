// src/task/creation.rs

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::context::JobContext;
use crate::errors::{Error, Result};
use crate::flow::Unit;

type Callback = Box<dyn FnMut() -> Result<()> + Send>;

/// One-shot task that synchronously runs a list of callbacks, in append
/// order, then completes.
///
/// A failing callback does not abort the remaining callbacks and never
/// suppresses the completion signal: every callback runs, the first error is
/// reported through the task's result, and the owning flow counts the task
/// as done either way.
#[derive(Default)]
pub struct CreationTask {
    callbacks: Mutex<Vec<Callback>>,
    timeout: Option<Duration>,
}

impl CreationTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one callback. Callbacks run exactly once per flow run, in the
    /// order they were appended.
    pub fn with_callback(mut self, f: impl FnMut() -> Result<()> + Send + 'static) -> Self {
        self.callbacks_mut().push(Box::new(f));
        self
    }

    /// Stall protection for callbacks that block unexpectedly.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn callbacks_mut(&mut self) -> &mut Vec<Callback> {
        self.callbacks.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Callback>> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Unit for CreationTask {
    async fn run(&self, _ctx: &JobContext) -> Result<()> {
        let mut callbacks = self.lock();
        debug!(callbacks = callbacks.len(), "running creation task");

        let mut first_error: Option<Error> = None;
        for (index, cb) in callbacks.iter_mut().enumerate() {
            if let Err(err) = cb() {
                warn!(index, error = %err, "creation callback failed; continuing");
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
