// src/anim/spec.rs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::anim::Ease;

/// Named property values (styles or attributes), keyed by property name.
pub type ValueMap = BTreeMap<String, String>;

/// Custom interpolator: maps normalised progress in `[0, 1]` to a value.
pub type TweenFn = Arc<dyn Fn(f64) -> String + Send + Sync>;

/// One custom-interpolated style property within a timed interpolation.
///
/// Used where a linear tween between two literals is not enough; the
/// collaborator calls `func` with the eased progress instead.
#[derive(Clone)]
pub struct Tween {
    pub name: String,
    pub func: TweenFn,
}

impl fmt::Debug for Tween {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tween").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Everything the collaborator needs to start one timed interpolation.
///
/// Source (initial) values are not part of the spec: the scheduler applies
/// them immediately before handing this over, so the collaborator always
/// animates "from the element's current value".
#[derive(Debug, Clone, Default)]
pub struct AnimationSpec {
    pub delay: Duration,
    pub duration: Duration,
    pub ease: Ease,
    /// Target style values, linearly tweened from current values.
    pub styles: ValueMap,
    /// Target attribute values, linearly tweened from current values.
    pub attrs: ValueMap,
    /// Custom style interpolators.
    pub tweens: Vec<Tween>,
    /// Target text content, applied when the interpolation ends.
    pub text: Option<String>,
}
