//! # Sources, hosts, components and transitions
//!
//! `repose-core` holds the small capabilities every data-bound view is built
//! from. None of them know about lists or records:
//!
//! - [`Observable`] / [`Emitter`]: ordered publish/subscribe with named
//!   [`Events`]. [`Signal<T>`] is the simplest observable source;
//!   [`Collection`] and [`Record`] are what list and record views bind to.
//! - [`VisualHost`]: opaque mount points addressed by [`NodeId`];
//!   [`MemoryHost`] is an in-memory tree.
//! - [`Component`]: `render(node)` / `unrender()`; factories return a
//!   [`Built`], which may be a component now or a future one.
//! - [`Transition`]: cancellable enter/exit animations;
//!   [`SlideTransitions`] is driven by the animation [`Clock`].
//!
//! ## Signals
//!
//! ```rust
//! use repose_core::*;
//! use std::rc::Rc;
//! use std::cell::Cell;
//!
//! let count = signal(0);
//! let seen = Rc::new(Cell::new(0));
//! let handler: Handler<i32> = {
//!     let seen = seen.clone();
//!     Rc::new(move |v: &i32| -> Result<()> {
//!         seen.set(*v);
//!         Ok(())
//!     })
//! };
//! count.subscribe(Events::CHANGE, handler);
//!
//! count.set(1).unwrap();
//! count.update(|v| *v += 1).unwrap();
//! assert_eq!(count.get(), 2);
//! assert_eq!(seen.get(), 2);
//! ```
//!
//! Subscriber errors travel back to the writer: `set` returns the first error
//! any handler raised, after every handler has seen the value.
//!
//! ## Transitions
//!
//! A transition's completion is owned by its [`TransitionToken`]. Stopping a
//! transition cancels the token, so a cancelled exit can never tear a node
//! down twice.

pub mod animation;
pub mod component;
pub mod effects;
pub mod error;
pub mod host;
pub mod signal;
pub mod source;
pub mod transition;

mod tests;

pub use animation::{
    AnimatedValue, AnimationSpec, Clock, Easing, GlobalClock, Interpolate, ManualClock, now,
    reset_clock, set_clock,
};
pub use component::*;
pub use effects::Dispose;
pub use error::{Error, Result};
pub use host::{MemoryHost, NodeId, VisualHost};
pub use signal::*;
pub use source::*;
pub use transition::*;
