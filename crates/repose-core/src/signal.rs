use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bitflags::bitflags;

use crate::Result;

bitflags! {
    /// Named change events a source can publish. Subscribers pick the ones they want.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Events: u8 {
        const ADD = 1 << 0;
        const REMOVE = 1 << 1;
        const CHANGE = 1 << 2;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubId(u64);

/// Subscriber callback. An error is reported back to whoever triggered the emission.
pub type Handler<E> = Rc<dyn Fn(&E) -> Result<()>>;

/// A data source that may publish change notifications.
///
/// Static sources keep the default methods: `subscribe` returns `None` and no
/// live updates are ever delivered.
pub trait Observable {
    type Event: 'static;

    fn subscribe(&self, _events: Events, _handler: Handler<Self::Event>) -> Option<SubId> {
        None
    }

    fn unsubscribe(&self, _id: SubId) {}
}

struct Subscriber<E> {
    id: SubId,
    events: Events,
    handler: Handler<E>,
}

/// Ordered, single-threaded publish/subscribe list.
pub struct Emitter<E: 'static> {
    next_id: Cell<u64>,
    subs: RefCell<Vec<Subscriber<E>>>,
}

impl<E> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Emitter<E> {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(1),
            subs: RefCell::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, events: Events, handler: Handler<E>) -> SubId {
        let id = SubId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subs.borrow_mut().push(Subscriber {
            id,
            events,
            handler,
        });
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubId) -> bool {
        let mut subs = self.subs.borrow_mut();
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() != before
    }

    pub fn is_subscribed(&self, id: SubId) -> bool {
        self.subs.borrow().iter().any(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.subs.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subs.borrow().is_empty()
    }

    /// Delivers `event` to every subscriber of `kind`, in subscription order.
    ///
    /// Handlers may subscribe or unsubscribe while the event is in flight; a
    /// handler removed mid-emission is skipped. Every remaining subscriber sees
    /// the event even if an earlier one fails; the first error is returned.
    pub fn emit(&self, kind: Events, event: &E) -> Result<()> {
        let targets: Vec<(SubId, Handler<E>)> = self
            .subs
            .borrow()
            .iter()
            .filter(|s| s.events.intersects(kind))
            .map(|s| (s.id, s.handler.clone()))
            .collect();

        let mut first_err = None;
        for (id, handler) in targets {
            if !self.is_subscribed(id) {
                continue;
            }
            if let Err(err) = handler(event) {
                log::warn!("subscriber {:?} failed handling {:?}: {}", id, kind, err);
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// Observable single value. Writes notify `Events::CHANGE` subscribers with the new value.
#[derive(Clone)]
pub struct Signal<T: 'static>(Rc<Inner<T>>);

struct Inner<T: 'static> {
    value: RefCell<T>,
    changes: Emitter<T>,
}

impl<T> Signal<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(Inner {
            value: RefCell::new(value),
            changes: Emitter::new(),
        }))
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.0.value.borrow().clone()
    }

    pub fn set(&self, v: T) -> Result<()>
    where
        T: Clone,
    {
        *self.0.value.borrow_mut() = v;
        self.notify()
    }

    pub fn update<F: FnOnce(&mut T)>(&self, f: F) -> Result<()>
    where
        T: Clone,
    {
        f(&mut self.0.value.borrow_mut());
        self.notify()
    }

    // Handlers get a copy so they can read or write the signal again.
    fn notify(&self) -> Result<()>
    where
        T: Clone,
    {
        let current = self.get();
        self.0.changes.emit(Events::CHANGE, &current)
    }
}

impl<T> Observable for Signal<T> {
    type Event = T;

    fn subscribe(&self, events: Events, handler: Handler<T>) -> Option<SubId> {
        Some(self.0.changes.subscribe(events, handler))
    }

    fn unsubscribe(&self, id: SubId) {
        self.0.changes.unsubscribe(id);
    }
}

pub fn signal<T>(t: T) -> Signal<T> {
    Signal::new(t)
}
