//! Enter/exit transitions for host nodes.
//!
//! A [`Transition`] animates one node in or out and reports completion
//! through the callback it was started with. The returned
//! [`TransitionToken`] is the only handle on that callback:
//!
//! - `complete()` runs it at most once,
//! - `cancel()` drops it without running it, and is idempotent.
//!
//! Implementations must never invoke the callback from inside `start` or
//! `stop`; completion always arrives later, from the implementation's own
//! driver (see [`SlideTransitions::tick`]).

use std::cell::RefCell;
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};

use crate::animation::{AnimatedValue, AnimationSpec, Clock, GlobalClock};
use crate::{Dispose, NodeId, VisualHost};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Enter,
    Exit,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TransitionOptions {
    /// Start from the phase's initial state instead of wherever the node is now.
    pub reset: bool,
    /// Overrides the transition's own spec.
    pub spec: Option<AnimationSpec>,
}

impl TransitionOptions {
    pub fn reset() -> Self {
        Self {
            reset: true,
            spec: None,
        }
    }

    pub fn with_spec(mut self, spec: AnimationSpec) -> Self {
        self.spec = Some(spec);
        self
    }
}

/// Handle on a running transition's completion.
#[derive(Clone, Debug)]
pub struct TransitionToken(Dispose);

impl TransitionToken {
    pub fn new(on_done: impl FnOnce() + 'static) -> Self {
        Self(Dispose::new(on_done))
    }

    /// Runs the completion unless it already ran or was cancelled.
    pub fn complete(&self) {
        self.0.run();
    }

    /// Drops the completion without running it. Safe to call repeatedly.
    pub fn cancel(&self) -> bool {
        self.0.cancel()
    }

    /// `true` until the token completes or is cancelled.
    pub fn is_active(&self) -> bool {
        self.0.is_armed()
    }

    pub fn same(&self, other: &TransitionToken) -> bool {
        self.0.ptr_eq(&other.0)
    }
}

pub trait Transition {
    fn start(
        &self,
        host: &Rc<dyn VisualHost>,
        node: NodeId,
        phase: Phase,
        options: &TransitionOptions,
        on_done: Box<dyn FnOnce()>,
    ) -> TransitionToken;

    /// Cancels `token` without running its completion.
    fn stop(&self, token: &TransitionToken) {
        token.cancel();
    }
}

new_key_type! {
    struct SlideKey;
}

struct Slide {
    host: Rc<dyn VisualHost>,
    node: NodeId,
    value: AnimatedValue<f32>,
    token: TransitionToken,
}

/// Vertical slide: animates a node's reveal between collapsed and fully shown.
///
/// Nothing moves until [`tick`](Self::tick) is called, typically once per frame.
pub struct SlideTransitions {
    clock: Rc<dyn Clock>,
    spec: AnimationSpec,
    running: RefCell<SlotMap<SlideKey, Slide>>,
}

impl Default for SlideTransitions {
    fn default() -> Self {
        Self::new()
    }
}

impl SlideTransitions {
    pub fn new() -> Self {
        Self {
            clock: Rc::new(GlobalClock),
            spec: AnimationSpec::default(),
            running: RefCell::new(SlotMap::with_key()),
        }
    }

    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_spec(mut self, spec: AnimationSpec) -> Self {
        self.spec = spec;
        self
    }

    /// Number of slides still in flight.
    pub fn active(&self) -> usize {
        self.running.borrow().len()
    }

    /// Advances every slide to the clock's current time and completes the
    /// finished ones. Returns `true` while anything is still moving.
    pub fn tick(&self) -> bool {
        let now = self.clock.now();
        let finished: Vec<TransitionToken> = {
            let mut running = self.running.borrow_mut();
            let mut done = Vec::new();
            for (key, slide) in running.iter_mut() {
                let moving = slide.value.update(now);
                slide.host.set_reveal(slide.node, *slide.value.get());
                if !moving {
                    done.push(key);
                }
            }
            done.into_iter()
                .filter_map(|key| running.remove(key))
                .map(|slide| slide.token)
                .collect()
        };

        // Completions may start or stop other slides.
        for token in finished {
            token.complete();
        }
        !self.running.borrow().is_empty()
    }
}

impl Transition for SlideTransitions {
    fn start(
        &self,
        host: &Rc<dyn VisualHost>,
        node: NodeId,
        phase: Phase,
        options: &TransitionOptions,
        on_done: Box<dyn FnOnce()>,
    ) -> TransitionToken {
        let (from, to) = match phase {
            Phase::Enter => (0.0, 1.0),
            Phase::Exit => (1.0, 0.0),
        };
        let start = if options.reset {
            from
        } else {
            host.reveal(node)
        };
        host.set_reveal(node, start);

        let mut value = AnimatedValue::new(start, options.spec.unwrap_or(self.spec));
        value.set_target(to, self.clock.now());

        let token = TransitionToken::new(on_done);
        self.running.borrow_mut().insert(Slide {
            host: host.clone(),
            node,
            value,
            token: token.clone(),
        });
        log::trace!("slide {phase:?} started for {node:?} from {start}");
        token
    }

    fn stop(&self, token: &TransitionToken) {
        token.cancel();
        self.running.borrow_mut().retain(|_, s| !s.token.same(token));
    }
}
