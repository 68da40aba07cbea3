// src/anim/mod.rs

//! Boundary to the external animation/selection collaborator.
//!
//! `jobflow` does not interpolate values or touch elements itself; it hands
//! that work to an [`Animator`] implementation and only aggregates the
//! per-element completion signals the collaborator sends back.
//!
//! - [`ease`] names the easing curves a spec can request.
//! - [`spec`] holds the passive data handed to [`Animator::animate`].

pub mod ease;
pub mod spec;

use tokio::sync::mpsc;

pub use ease::Ease;
pub use spec::{AnimationSpec, Tween, TweenFn, ValueMap};

/// How a target selection is described before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// A single element id (`#foo`).
    Id(String),
    /// All elements carrying a class (`.foo`).
    Class(String),
    /// All elements of a tag (`rect`, `div`, ...).
    Tag(String),
    /// A collaborator-specific selector string passed through verbatim.
    Raw(String),
}

/// Opaque handle to a resolved, *live* set of target elements.
///
/// The collaborator owns the membership; [`Animator::size`] reports the
/// current size, which may differ from the size at resolution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selection(pub u64);

/// Identifier of a single element within the collaborator's world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub u64);

/// The external animation/selection collaborator.
///
/// Contract for [`Animator::animate`]: start one timed interpolation over
/// every element currently in the selection, honouring the spec's delay,
/// duration and easing curve; send exactly one message on `end_tx` per
/// element when that element's animation finishes; apply the spec's target
/// text (if any) when the interpolation ends. The caller counts the
/// per-element signals against the selection size it captured at animation
/// start — implementations must never collapse them into a single aggregate
/// signal.
pub trait Animator: Send + Sync {
    /// Resolve a selector to a concrete (possibly empty) selection.
    fn resolve(&self, selector: &Selector) -> Selection;

    /// Current number of elements in the selection.
    fn size(&self, selection: Selection) -> usize;

    /// Immediately set named style values on every element of the selection.
    fn set_styles(&self, selection: Selection, values: &ValueMap);

    /// Immediately set named attribute values on every element of the selection.
    fn set_attrs(&self, selection: Selection, values: &ValueMap);

    /// Immediately set the text content of every element of the selection.
    fn set_text(&self, selection: Selection, text: &str);

    /// Begin a timed interpolation; see the trait-level contract.
    fn animate(
        &self,
        selection: Selection,
        spec: AnimationSpec,
        end_tx: mpsc::UnboundedSender<ElementId>,
    );
}
