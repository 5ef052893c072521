use std::any::Any;
use std::future::Future;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;

use crate::{NodeId, Result, VisualHost};

/// Something that can be mounted into a host node and later taken down again.
///
/// `unrender` is only ever called once per successful `render`.
pub trait Component: Any {
    fn render(&mut self, host: &Rc<dyn VisualHost>, node: NodeId) -> Result<()>;
    fn unrender(&mut self);
}

pub type BoxedComponent = Box<dyn Component>;

pub type DeferredComponent = LocalBoxFuture<'static, Result<Option<BoxedComponent>>>;

/// What a child factory hands back: a component now, nothing, or a component later.
pub enum Built {
    Ready(Option<BoxedComponent>),
    Deferred(DeferredComponent),
}

impl Built {
    pub fn ready(component: impl Component) -> Self {
        Built::Ready(Some(Box::new(component)))
    }

    /// Reserve the slot but render nothing into it.
    pub fn empty() -> Self {
        Built::Ready(None)
    }

    pub fn deferred<F>(fut: F) -> Self
    where
        F: Future<Output = Result<Option<BoxedComponent>>> + 'static,
    {
        Built::Deferred(fut.boxed_local())
    }
}

impl<C: Component> From<C> for Built {
    fn from(component: C) -> Self {
        Built::ready(component)
    }
}

impl std::fmt::Debug for Built {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Built::Ready(Some(_)) => write!(f, "Ready(<component>)"),
            Built::Ready(None) => write!(f, "Ready(None)"),
            Built::Deferred(_) => write!(f, "Deferred"),
        }
    }
}

pub fn downcast_ref<C: Component>(component: &dyn Component) -> Option<&C> {
    let any: &dyn Any = component;
    any.downcast_ref::<C>()
}

pub fn downcast_mut<C: Component>(component: &mut dyn Component) -> Option<&mut C> {
    let any: &mut dyn Any = component;
    any.downcast_mut::<C>()
}
