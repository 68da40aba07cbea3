// src/lib.rs

//! `jobflow` sequences visual transitions by fanning a set of named units of
//! work out, counting their completions, and firing a configured successor
//! once every unit scheduled for the run has finished.
//!
//! The same container is used at every nesting level:
//! - a [`Job`] owns tasks ([`CreationTask`], [`TransitionTask`], or any
//!   [`Unit`] implementation),
//! - a [`Work`] owns [`Job`]s with identical fan-out/fan-in semantics.
//!
//! Timed interpolation of styles, attributes and text is delegated to an
//! external collaborator behind the [`anim::Animator`] trait; this crate only
//! schedules it and aggregates its per-element completion signals.

pub mod anim;
pub mod context;
pub mod errors;
pub mod flow;
pub mod logging;
pub mod task;

pub use crate::context::JobContext;
pub use crate::errors::{ConfigError, Error, FlowError, Result};
pub use crate::flow::{Flow, Job, RunHandle, RunSummary, Successor, Unit, Work};
pub use crate::task::{CreationTask, Transform, TransitionTask};
