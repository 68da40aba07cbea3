// tests/common/mod.rs

//! Shared helpers for the integration tests: a scripted in-memory animation
//! collaborator and a gate unit whose completion the test controls.

#![allow(dead_code)] // each test binary uses a subset of these helpers

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Semaphore, mpsc};

use jobflow::anim::{AnimationSpec, Animator, ElementId, Selection, Selector, ValueMap};
use jobflow::{JobContext, Result, Successor, Unit};

/// One observable operation the stub animator performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubOp {
    Styles(ValueMap),
    Attrs(ValueMap),
    Text(String),
    Animate {
        selection: Selection,
        styles: ValueMap,
        attrs: ValueMap,
        text: Option<String>,
    },
}

struct RunningAnimation {
    selection: Selection,
    /// Elements that have not reported their end yet.
    remaining: Vec<ElementId>,
    end_tx: mpsc::UnboundedSender<ElementId>,
}

#[derive(Default)]
struct StubState {
    selections: HashMap<u64, Vec<ElementId>>,
    by_selector: HashMap<Selector, Selection>,
    next_selection: u64,
    next_element: u64,
    ops: Vec<StubOp>,
    running: Vec<RunningAnimation>,
    auto_complete: bool,
}

/// Scripted animation collaborator. Animations stay pending until the test
/// finishes their elements one by one (or `set_auto_complete(true)` makes
/// every animation end immediately).
pub struct StubAnimator {
    state: Mutex<StubState>,
}

impl StubAnimator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(StubState::default()),
        })
    }

    /// When enabled, `animate` sends every per-element end synchronously.
    pub fn set_auto_complete(&self, on: bool) {
        self.state.lock().unwrap().auto_complete = on;
    }

    /// Create a fresh selection holding `count` elements.
    pub fn selection_with(&self, count: usize) -> Selection {
        let mut state = self.state.lock().unwrap();
        let selection = Selection(state.next_selection);
        state.next_selection += 1;
        let elements = (0..count)
            .map(|_| {
                let el = ElementId(state.next_element);
                state.next_element += 1;
                el
            })
            .collect();
        state.selections.insert(selection.0, elements);
        selection
    }

    /// Register a selection of `count` elements under a selector, so that
    /// `resolve` finds it.
    pub fn register(&self, selector: Selector, count: usize) -> Selection {
        let selection = self.selection_with(count);
        self.state
            .lock()
            .unwrap()
            .by_selector
            .insert(selector, selection);
        selection
    }

    /// Grow a live selection by one element.
    pub fn add_element(&self, selection: Selection) -> ElementId {
        let mut state = self.state.lock().unwrap();
        let el = ElementId(state.next_element);
        state.next_element += 1;
        state
            .selections
            .entry(selection.0)
            .or_default()
            .push(el);
        el
    }

    /// Report the end of one not-yet-finished element of the pending
    /// animation on `selection`. Panics if nothing is pending.
    pub fn finish_next(&self, selection: Selection) -> ElementId {
        let mut state = self.state.lock().unwrap();
        let anim = state
            .running
            .iter_mut()
            .find(|a| a.selection == selection && !a.remaining.is_empty())
            .expect("no pending animation for selection");
        let el = anim.remaining.remove(0);
        anim.end_tx.send(el).expect("transition task dropped its end channel");
        el
    }

    /// Report the end of every remaining element on `selection`.
    pub fn finish_all(&self, selection: Selection) {
        let mut state = self.state.lock().unwrap();
        for anim in state.running.iter_mut().filter(|a| a.selection == selection) {
            for el in anim.remaining.drain(..) {
                let _ = anim.end_tx.send(el);
            }
        }
    }

    pub fn animations_started(&self) -> usize {
        let state = self.state.lock().unwrap();
        state
            .ops
            .iter()
            .filter(|op| matches!(op, StubOp::Animate { .. }))
            .count()
    }

    pub fn ops(&self) -> Vec<StubOp> {
        self.state.lock().unwrap().ops.clone()
    }
}

impl Animator for StubAnimator {
    fn resolve(&self, selector: &Selector) -> Selection {
        let mut state = self.state.lock().unwrap();
        if let Some(selection) = state.by_selector.get(selector) {
            return *selection;
        }
        // Unknown selectors resolve to a fresh empty selection.
        let selection = Selection(state.next_selection);
        state.next_selection += 1;
        state.selections.insert(selection.0, Vec::new());
        selection
    }

    fn size(&self, selection: Selection) -> usize {
        self.state
            .lock()
            .unwrap()
            .selections
            .get(&selection.0)
            .map_or(0, Vec::len)
    }

    fn set_styles(&self, _selection: Selection, values: &ValueMap) {
        self.state.lock().unwrap().ops.push(StubOp::Styles(values.clone()));
    }

    fn set_attrs(&self, _selection: Selection, values: &ValueMap) {
        self.state.lock().unwrap().ops.push(StubOp::Attrs(values.clone()));
    }

    fn set_text(&self, _selection: Selection, text: &str) {
        self.state.lock().unwrap().ops.push(StubOp::Text(text.to_string()));
    }

    fn animate(
        &self,
        selection: Selection,
        spec: AnimationSpec,
        end_tx: mpsc::UnboundedSender<ElementId>,
    ) {
        let mut state = self.state.lock().unwrap();
        let elements = state
            .selections
            .get(&selection.0)
            .cloned()
            .unwrap_or_default();
        state.ops.push(StubOp::Animate {
            selection,
            styles: spec.styles.clone(),
            attrs: spec.attrs.clone(),
            text: spec.text.clone(),
        });
        if state.auto_complete {
            for el in elements {
                let _ = end_tx.send(el);
            }
        } else {
            state.running.push(RunningAnimation {
                selection,
                remaining: elements,
                end_tx,
            });
        }
    }
}

/// Unit that completes once the test releases its gate.
pub struct GateTask {
    gate: Arc<Semaphore>,
    timeout: Option<Duration>,
}

impl GateTask {
    pub fn new() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        (
            Self {
                gate: Arc::clone(&gate),
                timeout: None,
            },
            gate,
        )
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Release one run's worth of the gate.
pub fn release(gate: &Arc<Semaphore>) {
    gate.add_permits(1);
}

#[async_trait]
impl Unit for GateTask {
    async fn run(&self, _ctx: &JobContext) -> Result<()> {
        let permit = self.gate.acquire().await?;
        permit.forget();
        Ok(())
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Successor callback that counts its invocations.
pub fn counting_successor<U: Unit>(counter: Arc<AtomicUsize>) -> Successor<U> {
    Successor::callback(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

/// Let spawned tasks make progress on the current-thread runtime.
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}
