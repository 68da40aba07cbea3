// src/flow/scheduler.rs

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use crate::context::JobContext;
use crate::errors::{Error, FlowError, Result};
use crate::flow::unit::{Signal, Unit, UnitOutcome};

/// What a flow does once every unit scheduled for a run has completed.
pub enum Successor<U: Unit> {
    /// Terminate quietly.
    None,
    /// Invoke a callback. Its error, if any, is captured into the run's
    /// [`RunSummary`] — the flow's own bookkeeping is finished by then.
    Callback(Box<dyn FnMut() -> Result<()> + Send>),
    /// Run another flow of the same level, re-entering the same state machine.
    Next(Flow<U>),
}

impl<U: Unit> Successor<U> {
    pub fn callback(f: impl FnMut() -> Result<()> + Send + 'static) -> Self {
        Successor::Callback(Box::new(f))
    }

    pub fn next(flow: Flow<U>) -> Self {
        Successor::Next(flow)
    }
}

impl<U: Unit> fmt::Debug for Successor<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Successor::None => f.write_str("Successor::None"),
            Successor::Callback(_) => f.write_str("Successor::Callback(..)"),
            Successor::Next(flow) => write!(f, "Successor::Next({})", flow.id()),
        }
    }
}

/// Report of one finished run, delivered through its [`RunHandle`].
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Units counted as complete in this run (failed and stalled included).
    pub completed: usize,
    /// Units detached from the snapshot while the run was active.
    pub detached: usize,
    /// Units whose `run()` returned an error.
    pub failed: Vec<(String, Error)>,
    /// Units that exceeded their timeout and were force-completed.
    pub stalled: Vec<String>,
    /// Error raised by a successor callback, if any.
    pub successor_error: Option<Error>,
}

impl RunSummary {
    /// True when every unit succeeded and the successor did not error.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.stalled.is_empty() && self.successor_error.is_none()
    }
}

/// Awaitable handle for one run of a [`Flow`].
///
/// Resolves after the run's successor has been invoked. Dropping the handle
/// is fine; the run proceeds regardless.
pub struct RunHandle {
    rx: oneshot::Receiver<RunSummary>,
}

impl RunHandle {
    /// Wait for the run to complete and return its summary.
    pub async fn finished(self) -> Result<RunSummary> {
        self.rx.await.map_err(|_| FlowError::Dropped.into())
    }
}

/// Bookkeeping for one active run.
///
/// The expected total is fixed by the snapshot taken at run start, and only
/// ever lowered by mid-run detaches. Completions are matched against the
/// snapshot ids and the run id, so signals from detached units or earlier
/// runs are silent no-ops.
struct ActiveRun {
    run_id: u64,
    expected: usize,
    completed: usize,
    detached: usize,
    /// Snapshot ids that have not completed yet.
    pending: HashSet<String>,
    failed: Vec<(String, Error)>,
    stalled: Vec<String>,
    done_tx: Option<oneshot::Sender<RunSummary>>,
}

struct State<U: Unit> {
    units: HashMap<String, Arc<U>>,
    successor: Successor<U>,
    /// Monotonically increasing run ID.
    run_counter: u64,
    /// Bookkeeping of the active run, or `None` when Idle/Complete.
    active: Option<ActiveRun>,
}

struct Shared<U: Unit> {
    id: String,
    context: JobContext,
    state: Mutex<State<U>>,
}

/// Generic fan-out/fan-in scheduler: a container of named completable units
/// with a single successor.
///
/// `run()` snapshots the current unit set, dispatches every snapshotted unit
/// without waiting, and counts completion signals; when the count reaches the
/// snapshot size the successor fires exactly once, strictly after the last
/// completion. Completion order among units is unconstrained — the scheduler
/// only counts.
///
/// The same type serves both nesting levels: a [`Job`](crate::flow::Job) is a
/// `Flow` of boxed tasks, a [`Work`](crate::flow::Work) is a `Flow` of
/// `Job`s (every `Flow` is itself a [`Unit`]).
///
/// Cloning yields another handle to the same flow. All fan-in state sits
/// behind one mutex; increment-and-compare is a single locked step, and the
/// successor is always invoked outside the lock.
pub struct Flow<U: Unit> {
    shared: Arc<Shared<U>>,
}

impl<U: Unit> Clone for Flow<U> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<U: Unit> fmt::Debug for Flow<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Flow({})", self.shared.id)
    }
}

impl<U: Unit> Flow<U> {
    /// Construct an empty flow. The id names the flow when it is itself an
    /// item inside a containing flow; the context is handed to every unit
    /// this flow dispatches.
    pub fn new(id: impl Into<String>, context: JobContext) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: id.into(),
                context,
                state: Mutex::new(State {
                    units: HashMap::new(),
                    successor: Successor::None,
                    run_counter: 0,
                    active: None,
                }),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.shared.id
    }

    pub fn context(&self) -> JobContext {
        self.shared.context.clone()
    }

    /// Insert a unit under an id, overwriting any previous unit with that id.
    ///
    /// Units attached while a run is active are not part of that run's
    /// snapshot; they participate from the next `run()` on.
    pub fn attach(&self, id: impl Into<String>, unit: U) {
        let id = id.into();
        debug!(flow = %self.shared.id, unit = %id, "attaching unit");
        self.lock().units.insert(id, Arc::new(unit));
    }

    /// Remove a unit by id, returning it if present.
    ///
    /// Detaching does not cancel in-flight work. If the unit was still
    /// expected by the active run, the run's expected total is lowered (so
    /// the flow never waits for a signal that will not be counted) and the
    /// unit's eventual completion becomes a silent no-op.
    pub fn detach(&self, id: &str) -> Option<Arc<U>> {
        let (removed, finished) = {
            let mut state = self.lock();
            let removed = state.units.remove(id);
            let mut finished = false;
            if let Some(active) = state.active.as_mut() {
                if active.pending.remove(id) {
                    active.expected -= 1;
                    active.detached += 1;
                    debug!(
                        flow = %self.shared.id,
                        unit = %id,
                        expected = active.expected,
                        "unit detached mid-run; lowering expected total"
                    );
                    finished = active.completed >= active.expected;
                }
            }
            (removed, finished)
        };

        if finished {
            self.finish_run();
        }
        removed
    }

    /// Replace the successor. Takes effect for the next completion.
    pub fn set_next(&self, successor: Successor<U>) {
        self.lock().successor = successor;
    }

    pub fn len(&self) -> usize {
        self.lock().units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().units.is_empty()
    }

    /// Returns `true` if there is currently no active run.
    pub fn is_idle(&self) -> bool {
        self.lock().active.is_none()
    }

    /// Start a run: reset the completion counter, snapshot the current unit
    /// set and dispatch every snapshotted unit without waiting for any one to
    /// finish. A flow with zero units completes immediately and still fires
    /// its successor. Re-running a completed flow repeats the full cycle.
    ///
    /// Must be called within a tokio runtime. A run that is still active when
    /// `run()` is called again is superseded: its handle resolves with
    /// [`FlowError::Dropped`] and late signals from it are ignored.
    pub fn run(&self) -> RunHandle {
        self.run_with(self.shared.context.clone())
    }

    /// As [`Flow::run`], but dispatching units with a caller-supplied context.
    /// This is how a containing flow propagates its own context downwards.
    pub(crate) fn run_with(&self, ctx: JobContext) -> RunHandle {
        let (done_tx, done_rx) = oneshot::channel();

        let (run_id, dispatch) = {
            let mut state = self.lock();
            state.run_counter += 1;
            let run_id = state.run_counter;

            let dispatch: Vec<(String, Arc<U>)> = state
                .units
                .iter()
                .map(|(id, unit)| (id.clone(), Arc::clone(unit)))
                .collect();

            state.active = Some(ActiveRun {
                run_id,
                expected: dispatch.len(),
                completed: 0,
                detached: 0,
                pending: dispatch.iter().map(|(id, _)| id.clone()).collect(),
                failed: Vec::new(),
                stalled: Vec::new(),
                done_tx: Some(done_tx),
            });

            debug!(
                flow = %self.shared.id,
                run_id,
                units = dispatch.len(),
                "starting run"
            );
            (run_id, dispatch)
        };

        if dispatch.is_empty() {
            // Zero scheduled units count as immediately fully complete.
            self.finish_run();
            return RunHandle { rx: done_rx };
        }

        for (id, unit) in dispatch {
            let flow = self.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move {
                let outcome = match unit.timeout() {
                    Some(limit) => match tokio::time::timeout(limit, unit.run(&ctx)).await {
                        Ok(res) => res.into(),
                        Err(_) => {
                            warn!(
                                flow = %flow.shared.id,
                                unit = %id,
                                timeout_ms = limit.as_millis() as u64,
                                "unit stalled; forcing completion"
                            );
                            UnitOutcome::Stalled
                        }
                    },
                    None => unit.run(&ctx).await.into(),
                };
                flow.on_unit_end(run_id, &id, Signal::End, outcome);
            });
        }

        RunHandle { rx: done_rx }
    }

    /// Record one completion signal from a dispatched unit.
    ///
    /// Signals other than [`Signal::End`], signals tagged with a stale run
    /// id, and signals from units no longer in the snapshot (detached, or
    /// already counted) are ignored.
    fn on_unit_end(&self, run_id: u64, id: &str, signal: Signal, outcome: UnitOutcome) {
        if signal != Signal::End {
            debug!(flow = %self.shared.id, unit = %id, ?signal, "ignoring non-end signal");
            return;
        }

        let finished = {
            let mut state = self.lock();
            let Some(active) = state.active.as_mut() else {
                debug!(flow = %self.shared.id, unit = %id, "signal with no active run; ignoring");
                return;
            };
            if active.run_id != run_id {
                debug!(flow = %self.shared.id, unit = %id, run_id, "signal from stale run; ignoring");
                return;
            }
            if !active.pending.remove(id) {
                debug!(flow = %self.shared.id, unit = %id, "signal from unit outside snapshot; ignoring");
                return;
            }

            active.completed += 1;
            match outcome {
                UnitOutcome::Success => {}
                UnitOutcome::Failed(err) => {
                    warn!(flow = %self.shared.id, unit = %id, error = %err, "unit failed");
                    active.failed.push((id.to_string(), err));
                }
                UnitOutcome::Stalled => active.stalled.push(id.to_string()),
            }

            debug!(
                flow = %self.shared.id,
                unit = %id,
                completed = active.completed,
                expected = active.expected,
                "unit completed"
            );
            active.completed >= active.expected
        };

        if finished {
            self.finish_run();
        }
    }

    /// Transition the active run to Complete: fire the successor exactly
    /// once, then resolve the run's handle.
    fn finish_run(&self) {
        let (mut run, successor) = {
            let mut state = self.lock();
            let Some(run) = state.active.take() else {
                return;
            };
            // Move the successor out so it is never invoked under the lock;
            // it is reinstalled below unless replaced meanwhile.
            let successor = std::mem::replace(&mut state.successor, Successor::None);
            (run, successor)
        };

        debug!(
            flow = %self.shared.id,
            run_id = run.run_id,
            completed = run.completed,
            "run complete"
        );

        let mut successor = successor;
        let successor_error = match &mut successor {
            Successor::None => None,
            Successor::Callback(cb) => match cb() {
                Ok(()) => None,
                Err(err) => {
                    error!(flow = %self.shared.id, error = %err, "successor callback failed");
                    Some(err)
                }
            },
            Successor::Next(next) => {
                debug!(flow = %self.shared.id, next = %next.id(), "running successor flow");
                // Fire and forget; the next flow has its own handle semantics.
                let _ = next.run();
                None
            }
        };

        {
            let mut state = self.lock();
            if matches!(state.successor, Successor::None) {
                state.successor = successor;
            }
        }

        let summary = RunSummary {
            completed: run.completed,
            detached: run.detached,
            failed: std::mem::take(&mut run.failed),
            stalled: std::mem::take(&mut run.stalled),
            successor_error,
        };
        if let Some(tx) = run.done_tx.take() {
            // The caller may have dropped its handle; that is fine.
            let _ = tx.send(summary);
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<U>> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Every flow is itself a completable unit, which is what lets a `Work`
/// contain `Job`s exactly as a `Job` contains tasks.
///
/// Run as a unit, the flow dispatches with the *parent's* context (context
/// propagates downwards from the containing flow) and completes when its own
/// fan-in completes. Failures and stalls inside the nested run surface as
/// this unit's error.
#[async_trait]
impl<U: Unit> Unit for Flow<U> {
    async fn run(&self, ctx: &JobContext) -> Result<()> {
        let summary = self
            .run_with(ctx.clone())
            .finished()
            .await
            .with_context(|| format!("nested flow '{}' did not complete", self.id()))?;

        if let Some(err) = summary.successor_error {
            return Err(err.context(format!("successor of flow '{}' failed", self.id())));
        }
        if let Some(id) = summary.stalled.first() {
            anyhow::bail!("unit '{}' stalled in flow '{}'", id, self.id());
        }
        if let Some((id, err)) = summary.failed.into_iter().next() {
            return Err(err.context(format!("unit '{}' failed in flow '{}'", id, self.id())));
        }
        Ok(())
    }
}

/// A flow of flows can attach a member under its own id, mirroring how a
/// containing collection keys its items.
impl<U: Unit> Flow<Flow<U>> {
    pub fn attach_flow(&self, flow: Flow<U>) {
        let id = flow.id().to_string();
        self.attach(id, flow);
    }
}
