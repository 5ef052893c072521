//! Data sources the views bind to.
//!
//! A [`Collection`] is ordered and index-addressed and publishes
//! [`CollectionEvent`]s; a [`Record`] maps string keys to values and publishes
//! one [`RecordChange`] per batch of edits. `Vec<T>` and
//! `BTreeMap<String, V>` are static sources: they can be rendered but never
//! notify. [`ObservableList`] and [`ObservableRecord`] are the live ones.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::{Emitter, Error, Events, Handler, Observable, Result, SubId};

#[derive(Clone, Debug, PartialEq)]
pub enum CollectionEvent<T> {
    Add { item: T, idx: usize },
    Remove { idx: usize },
}

impl<T> CollectionEvent<T> {
    pub fn kind(&self) -> Events {
        match self {
            CollectionEvent::Add { .. } => Events::ADD,
            CollectionEvent::Remove { .. } => Events::REMOVE,
        }
    }
}

/// One batch of record edits: every changed key with its previous value.
///
/// `None` as previous value means the key was added. Whether a listed key was
/// removed is read from the record itself: it no longer exists there.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordChange<V> {
    pub changed: Vec<(String, Option<V>)>,
}

impl<V> RecordChange<V> {
    pub fn contains(&self, key: &str) -> bool {
        self.changed.iter().any(|(k, _)| k == key)
    }
}

pub trait Collection<T: 'static>: Observable<Event = CollectionEvent<T>> {
    /// Current items, in order.
    fn snapshot(&self) -> Vec<T>;
}

pub trait Record<V: 'static>: Observable<Event = RecordChange<V>> {
    /// Current keys, in the record's natural order.
    fn keys(&self) -> Vec<String>;
    fn get(&self, key: &str) -> Option<V>;
}

impl<T: 'static> Observable for Vec<T> {
    type Event = CollectionEvent<T>;
}

impl<T: Clone + 'static> Collection<T> for Vec<T> {
    fn snapshot(&self) -> Vec<T> {
        self.clone()
    }
}

impl<V: 'static> Observable for BTreeMap<String, V> {
    type Event = RecordChange<V>;
}

impl<V: Clone + 'static> Record<V> for BTreeMap<String, V> {
    fn keys(&self) -> Vec<String> {
        BTreeMap::keys(self).cloned().collect()
    }

    fn get(&self, key: &str) -> Option<V> {
        BTreeMap::get(self, key).cloned()
    }
}

/// An ordered list that publishes `add` and `remove` events.
///
/// Mutations return the first error raised by a subscriber, such as a view
/// whose child factory refused the new item. The mutation itself has already
/// happened by then.
pub struct ObservableList<T: 'static> {
    items: RefCell<Vec<T>>,
    emitter: Emitter<CollectionEvent<T>>,
}

impl<T: Clone + 'static> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T: Clone + 'static> ObservableList<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: RefCell::new(items.into_iter().collect()),
            emitter: Emitter::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<T> {
        self.items.borrow().get(idx).cloned()
    }

    pub fn push(&self, item: T) -> Result<()> {
        let idx = self.len();
        self.insert(idx, item)
    }

    pub fn insert(&self, idx: usize, item: T) -> Result<()> {
        {
            let mut items = self.items.borrow_mut();
            if idx > items.len() {
                return Err(Error::IndexOutOfRange {
                    index: idx,
                    len: items.len(),
                });
            }
            items.insert(idx, item.clone());
        }
        self.emit(CollectionEvent::Add { item, idx })
    }

    pub fn remove(&self, idx: usize) -> Result<T> {
        let item = {
            let mut items = self.items.borrow_mut();
            if idx >= items.len() {
                return Err(Error::IndexOutOfRange {
                    index: idx,
                    len: items.len(),
                });
            }
            items.remove(idx)
        };
        self.emit(CollectionEvent::Remove { idx })?;
        Ok(item)
    }

    /// Number of live subscriptions.
    pub fn subscribers(&self) -> usize {
        self.emitter.len()
    }

    fn emit(&self, event: CollectionEvent<T>) -> Result<()> {
        self.emitter.emit(event.kind(), &event)
    }
}

impl<T: 'static> Observable for ObservableList<T> {
    type Event = CollectionEvent<T>;

    fn subscribe(&self, events: Events, handler: Handler<Self::Event>) -> Option<SubId> {
        Some(self.emitter.subscribe(events, handler))
    }

    fn unsubscribe(&self, id: SubId) {
        self.emitter.unsubscribe(id);
    }
}

impl<T: Clone + 'static> Collection<T> for ObservableList<T> {
    fn snapshot(&self) -> Vec<T> {
        self.items.borrow().clone()
    }
}

/// A string-keyed record that publishes one `change` event per edit batch.
pub struct ObservableRecord<V: 'static> {
    props: RefCell<BTreeMap<String, V>>,
    emitter: Emitter<RecordChange<V>>,
}

impl<V: Clone + PartialEq + 'static> Default for ObservableRecord<V> {
    fn default() -> Self {
        Self::new(Vec::<(String, V)>::new())
    }
}

impl<V: Clone + PartialEq + 'static> ObservableRecord<V> {
    pub fn new<K: Into<String>>(props: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            props: RefCell::new(props.into_iter().map(|(k, v)| (k.into(), v)).collect()),
            emitter: Emitter::new(),
        }
    }

    pub fn set(&self, key: impl Into<String>, value: V) -> Result<()> {
        self.update([(key.into(), Some(value))])
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.update([(key.to_string(), None)])
    }

    /// Applies a batch of edits (`None` deletes) and emits a single change
    /// listing only the keys whose value actually changed.
    pub fn update(&self, changes: impl IntoIterator<Item = (String, Option<V>)>) -> Result<()> {
        let mut changed: Vec<(String, Option<V>)> = Vec::new();
        {
            let mut props = self.props.borrow_mut();
            for (key, value) in changes {
                let previous = match value {
                    Some(v) => {
                        if props.get(&key) == Some(&v) {
                            continue;
                        }
                        props.insert(key.clone(), v)
                    }
                    None => match props.remove(&key) {
                        Some(old) => Some(old),
                        None => continue,
                    },
                };
                // A key edited twice in one batch reports its value from before the batch.
                if !changed.iter().any(|(k, _)| *k == key) {
                    changed.push((key, previous));
                }
            }
        }

        if changed.is_empty() {
            return Ok(());
        }
        self.emitter.emit(Events::CHANGE, &RecordChange { changed })
    }

    pub fn subscribers(&self) -> usize {
        self.emitter.len()
    }
}

impl<V: 'static> Observable for ObservableRecord<V> {
    type Event = RecordChange<V>;

    fn subscribe(&self, events: Events, handler: Handler<Self::Event>) -> Option<SubId> {
        Some(self.emitter.subscribe(events, handler))
    }

    fn unsubscribe(&self, id: SubId) {
        self.emitter.unsubscribe(id);
    }
}

impl<V: Clone + PartialEq + 'static> Record<V> for ObservableRecord<V> {
    fn keys(&self) -> Vec<String> {
        self.props.borrow().keys().cloned().collect()
    }

    fn get(&self, key: &str) -> Option<V> {
        self.props.borrow().get(key).cloned()
    }
}
