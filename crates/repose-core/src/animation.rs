use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use web_time::Instant;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl Easing {
    pub fn interpolate(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => t * (2.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationSpec {
    pub duration: Duration,
    pub easing: Easing,
    pub delay: Duration,
}

impl Default for AnimationSpec {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(300),
            easing: Easing::EaseInOut,
            delay: Duration::ZERO,
        }
    }
}

impl AnimationSpec {
    pub fn tween(duration: Duration, easing: Easing) -> Self {
        Self {
            duration,
            easing,
            delay: Duration::ZERO,
        }
    }

    pub fn fast() -> Self {
        Self {
            duration: Duration::from_millis(150),
            easing: Easing::EaseOut,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

pub trait Interpolate {
    fn interpolate(&self, other: &Self, t: f32) -> Self;
}

impl Interpolate for f32 {
    fn interpolate(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

// Animation clock
pub trait Clock: 'static {
    fn now(&self) -> Instant;
}

/// Reads the process-wide clock installed with [`set_clock`].
pub struct GlobalClock;

impl Clock for GlobalClock {
    fn now(&self) -> Instant {
        now()
    }
}

static CLOCK: RwLock<Option<Arc<dyn Clock + Send + Sync>>> = parking_lot::const_rwlock(None);

/// Current time on the installed animation clock (system time if none is installed).
pub fn now() -> Instant {
    CLOCK
        .read()
        .as_ref()
        .map(|c| c.now())
        .unwrap_or_else(Instant::now)
}

/// Install a process-wide animation clock. Platforms use the system clock; tools may pin time.
pub fn set_clock(clock: Arc<dyn Clock + Send + Sync>) {
    *CLOCK.write() = Some(clock);
}

pub fn reset_clock() {
    *CLOCK.write() = None;
}

/// A clock you can drive deterministically.
pub struct ManualClock {
    t: Mutex<Instant>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(t: Instant) -> Self {
        Self { t: Mutex::new(t) }
    }

    pub fn advance(&self, by: Duration) {
        *self.t.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.t.lock()
    }
}

/// Value that moves towards a target over an [`AnimationSpec`].
#[derive(Clone, Debug)]
pub struct AnimatedValue<T: Interpolate + Clone> {
    current: T,
    target: T,
    start: T,
    spec: AnimationSpec,
    start_time: Option<Instant>,
}

impl<T: Interpolate + Clone> AnimatedValue<T> {
    pub fn new(initial: T, spec: AnimationSpec) -> Self {
        Self {
            current: initial.clone(),
            target: initial.clone(),
            start: initial,
            spec,
            start_time: None,
        }
    }

    /// Starts moving from the current value towards `target`.
    pub fn set_target(&mut self, target: T, at: Instant) {
        self.start = self.current.clone();
        self.target = target;
        self.start_time = Some(at);
    }

    /// Advances to `at`. Returns `true` while still animating.
    pub fn update(&mut self, at: Instant) -> bool {
        let Some(start) = self.start_time else {
            return false;
        };

        let elapsed = at.saturating_duration_since(start);
        if elapsed < self.spec.delay {
            return true;
        }

        let animation_time = elapsed - self.spec.delay;
        if animation_time >= self.spec.duration {
            self.current = self.target.clone();
            self.start_time = None;
            return false;
        }

        let t = animation_time.as_secs_f32() / self.spec.duration.as_secs_f32();
        let eased_t = self.spec.easing.interpolate(t);
        self.current = self.start.interpolate(&self.target, eased_t);
        true
    }

    pub fn get(&self) -> &T {
        &self.current
    }

    pub fn is_animating(&self) -> bool {
        self.start_time.is_some()
    }
}
