// src/task/transition.rs

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::anim::{AnimationSpec, Animator, Ease, Selection, Selector, Tween, TweenFn, ValueMap};
use crate::context::JobContext;
use crate::errors::{ConfigError, Result};
use crate::flow::Unit;

/// Default duration of a timed transition, in milliseconds.
const DEFAULT_DURATION_MS: u64 = 750;

/// One property change a [`TransitionTask`] applies to its selection.
///
/// Each constructor validates its shape and fails fast with a
/// [`ConfigError`] instead of silently falling back to an empty change.
#[derive(Clone)]
pub struct Transform {
    kind: TransformKind,
}

#[derive(Clone)]
enum TransformKind {
    /// Animate one named style from `source` (or the current value) to `target`.
    Style {
        name: String,
        source: Option<String>,
        target: PropertyTarget,
    },
    /// Animate one named attribute from `source` (or the current value) to `target`.
    Attr {
        name: String,
        source: Option<String>,
        target: PropertyTarget,
    },
    /// Animate a whole style map at once.
    StyleMap { source: ValueMap, target: ValueMap },
    /// Animate a whole attribute map at once.
    AttrMap { source: ValueMap, target: ValueMap },
    /// Set one style immediately, outside the timed interpolation.
    SetStyle { name: String, value: String },
    /// Set one attribute immediately, outside the timed interpolation.
    SetAttr { name: String, value: String },
    /// Change text content: `source` applied at start, `target` at the end
    /// of the interpolation.
    Text {
        source: Option<String>,
        target: String,
    },
}

#[derive(Clone)]
enum PropertyTarget {
    Literal(String),
    /// Custom interpolation instead of a linear tween between two literals.
    Tween(TweenFn),
}

impl Transform {
    /// Animate a style from an explicit source value to a target value.
    pub fn style_between(
        name: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            kind: TransformKind::Style {
                name: non_empty(name)?,
                source: Some(source.into()),
                target: PropertyTarget::Literal(target.into()),
            },
        })
    }

    /// Animate a style from its current value to a target value.
    pub fn style_to(
        name: impl Into<String>,
        target: impl Into<String>,
    ) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            kind: TransformKind::Style {
                name: non_empty(name)?,
                source: None,
                target: PropertyTarget::Literal(target.into()),
            },
        })
    }

    /// Animate a style with a custom value-producing function.
    pub fn style_tween(
        name: impl Into<String>,
        func: impl Fn(f64) -> String + Send + Sync + 'static,
    ) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            kind: TransformKind::Style {
                name: non_empty(name)?,
                source: None,
                target: PropertyTarget::Tween(Arc::new(func)),
            },
        })
    }

    /// Animate a whole style map: all of `source` is applied at start, all
    /// of `target` is interpolated to.
    pub fn style_map(
        source: ValueMap,
        target: ValueMap,
    ) -> std::result::Result<Self, ConfigError> {
        if source.is_empty() && target.is_empty() {
            return Err(ConfigError::EmptyMapTransform);
        }
        Ok(Self {
            kind: TransformKind::StyleMap { source, target },
        })
    }

    /// Animate an attribute from an explicit source value to a target value.
    pub fn attr_between(
        name: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            kind: TransformKind::Attr {
                name: non_empty(name)?,
                source: Some(source.into()),
                target: PropertyTarget::Literal(target.into()),
            },
        })
    }

    /// Animate an attribute from its current value to a target value.
    pub fn attr_to(
        name: impl Into<String>,
        target: impl Into<String>,
    ) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            kind: TransformKind::Attr {
                name: non_empty(name)?,
                source: None,
                target: PropertyTarget::Literal(target.into()),
            },
        })
    }

    /// Animate a whole attribute map at once.
    pub fn attr_map(source: ValueMap, target: ValueMap) -> std::result::Result<Self, ConfigError> {
        if source.is_empty() && target.is_empty() {
            return Err(ConfigError::EmptyMapTransform);
        }
        Ok(Self {
            kind: TransformKind::AttrMap { source, target },
        })
    }

    /// Set a style immediately, with no interpolation.
    pub fn set_style(
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            kind: TransformKind::SetStyle {
                name: non_empty(name)?,
                value: value.into(),
            },
        })
    }

    /// Set an attribute immediately, with no interpolation.
    pub fn set_attr(
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            kind: TransformKind::SetAttr {
                name: non_empty(name)?,
                value: value.into(),
            },
        })
    }

    /// Change text content from an explicit source to a target.
    pub fn text_between(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: TransformKind::Text {
                source: Some(source.into()),
                target: target.into(),
            },
        }
    }

    /// Change text content from whatever it currently is to a target.
    pub fn text_to(target: impl Into<String>) -> Self {
        Self {
            kind: TransformKind::Text {
                source: None,
                target: target.into(),
            },
        }
    }
}

fn non_empty(name: impl Into<String>) -> std::result::Result<String, ConfigError> {
    let name = name.into();
    if name.trim().is_empty() {
        return Err(ConfigError::EmptyPropertyName);
    }
    Ok(name)
}

/// Transform descriptors partitioned into the shape the collaborator needs.
#[derive(Default)]
struct Partitioned {
    src_styles: ValueMap,
    src_attrs: ValueMap,
    target_styles: ValueMap,
    target_attrs: ValueMap,
    tweens: Vec<Tween>,
    set_styles: ValueMap,
    set_attrs: ValueMap,
    text_source: Option<String>,
    text_target: Option<String>,
}

impl Partitioned {
    fn has_animation(&self) -> bool {
        !self.target_styles.is_empty()
            || !self.target_attrs.is_empty()
            || !self.tweens.is_empty()
            || self.text_target.is_some()
    }
}

/// Task that animates its selection through the external collaborator.
///
/// The selection is resolved once at construction; its *size* is read again
/// at run time, because selections are live. `run()` applies source values
/// and one-shot sets synchronously, starts the timed interpolation, then
/// counts the collaborator's per-element end signals against the selection
/// size captured at animation start — it completes only when every matched
/// element has finished, and immediately when there is nothing to animate.
pub struct TransitionTask {
    animator: Arc<dyn Animator>,
    selection: Selection,
    delay: Duration,
    duration: Duration,
    ease: Ease,
    transforms: Vec<Transform>,
    timeout: Option<Duration>,
}

impl TransitionTask {
    /// Build on a pre-resolved selection.
    pub fn new(animator: Arc<dyn Animator>, selection: Selection) -> Self {
        Self {
            animator,
            selection,
            delay: Duration::ZERO,
            duration: Duration::from_millis(DEFAULT_DURATION_MS),
            ease: Ease::default(),
            transforms: Vec::new(),
            timeout: None,
        }
    }

    /// Build by resolving a selector through the collaborator.
    pub fn select(animator: Arc<dyn Animator>, selector: &Selector) -> Self {
        let selection = animator.resolve(selector);
        Self::new(animator, selection)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    /// Stall protection: force completion if the collaborator never reports
    /// all per-element ends within this span.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Append a transform descriptor.
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transforms.push(transform);
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn ease(&self) -> Ease {
        self.ease
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    fn partition(&self) -> Partitioned {
        let mut p = Partitioned::default();
        for transform in &self.transforms {
            match &transform.kind {
                TransformKind::Style { name, source, target } => {
                    if let Some(src) = source {
                        p.src_styles.insert(name.clone(), src.clone());
                    }
                    match target {
                        PropertyTarget::Literal(value) => {
                            p.target_styles.insert(name.clone(), value.clone());
                        }
                        PropertyTarget::Tween(func) => p.tweens.push(Tween {
                            name: name.clone(),
                            func: Arc::clone(func),
                        }),
                    }
                }
                TransformKind::Attr { name, source, target } => {
                    if let Some(src) = source {
                        p.src_attrs.insert(name.clone(), src.clone());
                    }
                    match target {
                        PropertyTarget::Literal(value) => {
                            p.target_attrs.insert(name.clone(), value.clone());
                        }
                        // Attribute tweens share the style tween list; the
                        // collaborator dispatches on the property name.
                        PropertyTarget::Tween(func) => p.tweens.push(Tween {
                            name: name.clone(),
                            func: Arc::clone(func),
                        }),
                    }
                }
                TransformKind::StyleMap { source, target } => {
                    p.src_styles.extend(source.clone());
                    p.target_styles.extend(target.clone());
                }
                TransformKind::AttrMap { source, target } => {
                    p.src_attrs.extend(source.clone());
                    p.target_attrs.extend(target.clone());
                }
                TransformKind::SetStyle { name, value } => {
                    p.set_styles.insert(name.clone(), value.clone());
                }
                TransformKind::SetAttr { name, value } => {
                    p.set_attrs.insert(name.clone(), value.clone());
                }
                TransformKind::Text { source, target } => {
                    p.text_source = source.clone();
                    p.text_target = Some(target.clone());
                }
            }
        }
        p
    }
}

#[async_trait]
impl Unit for TransitionTask {
    async fn run(&self, _ctx: &JobContext) -> Result<()> {
        if self.transforms.is_empty() {
            debug!("transition has no transforms; completing immediately");
            return Ok(());
        }
        if self.animator.size(self.selection) == 0 {
            debug!("transition selection is empty; completing immediately");
            return Ok(());
        }

        let p = self.partition();

        // Source values and one-shot sets go in synchronously, before the
        // timed interpolation starts.
        if !p.src_styles.is_empty() {
            self.animator.set_styles(self.selection, &p.src_styles);
        }
        if !p.src_attrs.is_empty() {
            self.animator.set_attrs(self.selection, &p.src_attrs);
        }
        if !p.set_styles.is_empty() {
            self.animator.set_styles(self.selection, &p.set_styles);
        }
        if !p.set_attrs.is_empty() {
            self.animator.set_attrs(self.selection, &p.set_attrs);
        }
        if let Some(text) = &p.text_source {
            self.animator.set_text(self.selection, text);
        }

        if !p.has_animation() {
            debug!("transition had only one-shot changes; completing");
            return Ok(());
        }

        // Size captured at animation time, not configuration time.
        let matched = self.animator.size(self.selection);
        if matched == 0 {
            return Ok(());
        }

        let spec = AnimationSpec {
            delay: self.delay,
            duration: self.duration,
            ease: self.ease,
            styles: p.target_styles,
            attrs: p.target_attrs,
            tweens: p.tweens,
            text: p.text_target,
        };

        let (end_tx, mut end_rx) = mpsc::unbounded_channel();
        self.animator.animate(self.selection, spec, end_tx);
        debug!(matched, "transition dispatched; waiting for per-element ends");

        let mut ended = 0usize;
        while ended < matched {
            match end_rx.recv().await {
                Some(element) => {
                    ended += 1;
                    debug!(?element, ended, matched, "element finished animating");
                }
                None => {
                    return Err(anyhow!(
                        "animator dropped the end channel after {ended} of {matched} elements"
                    ));
                }
            }
        }

        Ok(())
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
