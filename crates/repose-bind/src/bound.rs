use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use repose_core::{Component, Events, NodeId, Observable, Result, VisualHost};

use crate::control::ValueControl;
use crate::listener::ChangeListener;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoundOptions {
    /// Attach to the source after the wrapped component has rendered, so the
    /// first update already sees its node.
    pub postrender_update: bool,
}

impl BoundOptions {
    pub fn postrender() -> Self {
        Self {
            postrender_update: true,
        }
    }
}

/// Wraps a component and keeps it updated from a source.
///
/// The update closure gets the source, the component and the event (`None`
/// on attach and after a source swap).
pub struct BoundComponent<S: ?Sized + Observable + 'static, C: Component> {
    component: Rc<RefCell<C>>,
    listener: ChangeListener<S>,
    options: BoundOptions,
}

impl<S, C> BoundComponent<S, C>
where
    S: ?Sized + Observable + 'static,
    C: Component,
{
    pub fn new<F>(
        source: Option<Rc<S>>,
        events: Events,
        component: C,
        update: F,
        options: BoundOptions,
    ) -> Self
    where
        F: Fn(Option<&S>, &mut C, Option<&S::Event>) -> Result<()> + 'static,
    {
        let component = Rc::new(RefCell::new(component));
        let weak = Rc::downgrade(&component);
        let listener = ChangeListener::bind(source, events, move |source, event| {
            let Some(component) = weak.upgrade() else {
                return Ok(());
            };
            let Ok(mut component) = component.try_borrow_mut() else {
                log::warn!("bound component busy, dropping update");
                return Ok(());
            };
            update(source, &mut component, event)
        });

        Self {
            component,
            listener,
            options,
        }
    }

    pub fn component(&self) -> Ref<'_, C> {
        self.component.borrow()
    }

    pub fn component_mut(&self) -> RefMut<'_, C> {
        self.component.borrow_mut()
    }

    pub fn source(&self) -> Option<Rc<S>> {
        self.listener.source()
    }

    pub fn set_source(&mut self, source: Option<Rc<S>>) -> Result<()> {
        self.listener.set_source(source)
    }

    pub fn is_rendered(&self) -> bool {
        self.listener.is_rendered()
    }
}

impl<S, C> BoundComponent<S, C>
where
    S: ?Sized + Observable + 'static,
    C: ValueControl,
{
    /// Like [`new`](Self::new), but `update` returns the control's next value
    /// instead of mutating it. `None` leaves the control as it is.
    pub fn with_value<F>(
        source: Option<Rc<S>>,
        events: Events,
        control: C,
        update: F,
        options: BoundOptions,
    ) -> Self
    where
        F: Fn(Option<&S>, &C, Option<&S::Event>) -> Result<Option<C::Value>> + 'static,
    {
        Self::new(
            source,
            events,
            control,
            move |source, control: &mut C, event| {
                if let Some(value) = update(source, control, event)? {
                    control.set_value(value);
                }
                Ok(())
            },
            options,
        )
    }
}

impl<S, C> Component for BoundComponent<S, C>
where
    S: ?Sized + Observable + 'static,
    C: Component,
{
    fn render(&mut self, host: &Rc<dyn VisualHost>, node: NodeId) -> Result<()> {
        if self.options.postrender_update {
            self.component.borrow_mut().render(host, node)?;
            self.listener.on_attach()
        } else {
            self.listener.on_attach()?;
            self.component.borrow_mut().render(host, node)
        }
    }

    fn unrender(&mut self) {
        self.component.borrow_mut().unrender();
        self.listener.on_detach();
    }
}
