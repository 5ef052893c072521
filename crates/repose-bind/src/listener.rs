use std::cell::RefCell;
use std::rc::{Rc, Weak};

use repose_core::{Events, Handler, Observable, Result, SubId};

/// Update callback: the bound source and the event, `None` for a full resync.
pub type UpdateFn<S> =
    Rc<dyn Fn(Option<&S>, Option<&<S as Observable>::Event>) -> Result<()>>;

/// Binds one update callback to one source's change notifications.
///
/// The subscription only exists between [`on_attach`](Self::on_attach) and
/// [`on_detach`](Self::on_detach). Attaching (and swapping the source while
/// attached) fires the callback once with no event, so the owner can rebuild
/// from scratch.
pub struct ChangeListener<S: ?Sized + Observable + 'static> {
    source: Option<Rc<S>>,
    // What the shared handler reads at delivery time.
    bound: Rc<RefCell<Option<Weak<S>>>>,
    events: Events,
    update: Option<UpdateFn<S>>,
    handler: Option<Handler<S::Event>>,
    subscription: Option<SubId>,
    rendered: bool,
}

impl<S: ?Sized + Observable + 'static> ChangeListener<S> {
    pub fn new(source: Option<Rc<S>>, events: Events, update: Option<UpdateFn<S>>) -> Self {
        let bound = Rc::new(RefCell::new(source.as_ref().map(Rc::downgrade)));
        let handler = update.clone().map(|update| {
            let bound = bound.clone();
            let handler: Handler<S::Event> = Rc::new(move |event: &S::Event| {
                let source = bound.borrow().as_ref().and_then(Weak::upgrade);
                match source {
                    Some(source) => update(Some(&*source), Some(event)),
                    None => {
                        log::trace!("change delivered after the source was dropped");
                        Ok(())
                    }
                }
            });
            handler
        });

        Self {
            source,
            bound,
            events,
            update,
            handler,
            subscription: None,
            rendered: false,
        }
    }

    /// Shorthand for [`new`](Self::new) with a plain closure.
    pub fn bind<F>(source: Option<Rc<S>>, events: Events, update: F) -> Self
    where
        F: Fn(Option<&S>, Option<&S::Event>) -> Result<()> + 'static,
    {
        Self::new(source, events, Some(Rc::new(update)))
    }

    pub fn source(&self) -> Option<Rc<S>> {
        self.source.clone()
    }

    pub fn is_rendered(&self) -> bool {
        self.rendered
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn on_attach(&mut self) -> Result<()> {
        self.unsubscribe();
        self.subscribe();
        self.rendered = true;
        self.resync()
    }

    pub fn on_detach(&mut self) {
        self.unsubscribe();
        self.rendered = false;
    }

    /// Rebinds to `source`. While attached this moves the subscription and
    /// fires one full resync; otherwise the source is only stored.
    pub fn set_source(&mut self, source: Option<Rc<S>>) -> Result<()> {
        let same = match (&self.source, &source) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if same {
            return Ok(());
        }

        if !self.rendered {
            self.store(source);
            return Ok(());
        }

        self.unsubscribe();
        self.store(source);
        self.subscribe();
        self.resync()
    }

    fn store(&mut self, source: Option<Rc<S>>) {
        *self.bound.borrow_mut() = source.as_ref().map(Rc::downgrade);
        self.source = source;
    }

    fn subscribe(&mut self) {
        if let (Some(source), Some(handler)) = (&self.source, &self.handler) {
            self.subscription = source.subscribe(self.events, handler.clone());
        }
    }

    fn unsubscribe(&mut self) {
        if let Some(id) = self.subscription.take()
            && let Some(source) = &self.source
        {
            source.unsubscribe(id);
        }
    }

    fn resync(&self) -> Result<()> {
        match &self.update {
            Some(update) => update(self.source.as_deref(), None),
            None => Ok(()),
        }
    }
}

impl<S: ?Sized + Observable + 'static> Drop for ChangeListener<S> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
