// src/errors.rs

//! Crate-wide error types.
//!
//! Runtime failures travel as [`anyhow`] errors (units report them through
//! their `run()` result and the owning flow collects them into its
//! [`RunSummary`](crate::flow::RunSummary)). Configuration problems get a
//! structured [`ConfigError`] so callers fail fast at build time instead of
//! misbehaving at run time.

pub use anyhow::{Error, Result};

/// Errors raised synchronously while configuring a task or a transform
/// descriptor.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A named style/attribute transform was given an empty property name.
    #[error("transform property name must not be empty")]
    EmptyPropertyName,

    /// A whole-map transform carried neither source nor target values.
    #[error("map transform must provide at least one source or target value")]
    EmptyMapTransform,

    /// An easing curve name did not match any known curve.
    #[error("unknown easing curve '{0}'")]
    UnknownEase(String),
}

/// Errors surfaced through a [`RunHandle`](crate::flow::RunHandle).
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// The flow was dropped, or re-run, before this run completed.
    #[error("run was dropped or superseded before completing")]
    Dropped,
}
