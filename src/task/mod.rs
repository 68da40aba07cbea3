// src/task/mod.rs

//! Concrete task variants.
//!
//! - [`creation`]: one-shot synchronous callback tasks.
//! - [`transition`]: animated style/attribute/text changes delegated to the
//!   animation collaborator.

pub mod creation;
pub mod transition;

pub use creation::CreationTask;
pub use transition::{Transform, TransitionTask};
