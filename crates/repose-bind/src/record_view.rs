use std::cell::RefCell;
use std::rc::{Rc, Weak};

use repose_core::{Built, Component, Events, NodeId, Record, RecordChange, Result, VisualHost};

use crate::listener::ChangeListener;
use crate::reconciler::{KeyedReconciler, ReconcilerOptions};
use crate::sync::SyncBarrier;

#[derive(Clone, Debug)]
pub struct RecordViewOptions {
    /// Tag of the container node. `None` renders children straight into the
    /// parent.
    pub tag: Option<String>,
    /// Keys to show, in this order. Defaults to every key, sorted.
    pub include: Option<Vec<String>>,
    pub exclude: Vec<String>,
    pub reconciler: ReconcilerOptions,
}

impl Default for RecordViewOptions {
    fn default() -> Self {
        Self {
            tag: Some("div".into()),
            include: None,
            exclude: Vec::new(),
            reconciler: ReconcilerOptions::default(),
        }
    }
}

impl RecordViewOptions {
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn fragment(mut self) -> Self {
        self.tag = None;
        self
    }

    pub fn with_include<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.include = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_exclude<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.exclude = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_reconciler(mut self, reconciler: ReconcilerOptions) -> Self {
        self.reconciler = reconciler;
        self
    }

    fn shows(&self, key: &str) -> bool {
        let included = self
            .include
            .as_ref()
            .is_none_or(|keys| keys.iter().any(|k| k == key));
        included && !self.exclude.iter().any(|k| k == key)
    }

    /// The keys of `source` this view shows, in display order.
    fn ordered_keys<V: 'static>(&self, source: &dyn Record<V>) -> Vec<String> {
        let present = source.keys();
        let mut keys: Vec<String> = match &self.include {
            Some(include) => include
                .iter()
                .filter(|k| present.contains(k))
                .cloned()
                .collect(),
            None => {
                let mut keys = present;
                keys.sort();
                keys
            }
        };
        keys.retain(|k| !self.exclude.contains(k));
        keys
    }
}

struct Mounted {
    host: Rc<dyn VisualHost>,
    parent: NodeId,
    // `None` in fragment mode.
    container: Option<NodeId>,
}

struct RecordState<V: 'static> {
    source: Option<Rc<dyn Record<V>>>,
    options: RecordViewOptions,
    reconciler: KeyedReconciler<String, V>,
    barrier: SyncBarrier,
    mounted: Option<Mounted>,
}

/// What the view should show right now: `(key, value)` in display order.
fn expected<V: Clone + 'static>(
    source: &Option<Rc<dyn Record<V>>>,
    options: &RecordViewOptions,
) -> Vec<(String, V)> {
    let Some(source) = source else {
        return Vec::new();
    };
    options
        .ordered_keys(&**source)
        .into_iter()
        .filter_map(|key| source.get(&key).map(|value| (key, value)))
        .collect()
}

/// Renders the properties of a keyed record, one child per shown key.
///
/// A changed value replaces its child: the old one exits while the new one
/// enters at the same position. Keys that disappear from the record exit.
pub struct RecordView<V: Clone + PartialEq + 'static> {
    listener: ChangeListener<dyn Record<V>>,
    state: Rc<RefCell<RecordState<V>>>,
}

impl<V: Clone + PartialEq + 'static> RecordView<V> {
    pub fn new(
        source: Option<Rc<dyn Record<V>>>,
        factory: impl Fn(&str, &V, usize) -> Result<Built> + 'static,
        options: RecordViewOptions,
    ) -> Self {
        let reconciler = KeyedReconciler::new(
            move |key: &String, value: &V, index| factory(key, value, index),
            options.reconciler.clone(),
        );
        let state = Rc::new(RefCell::new(RecordState {
            source: source.clone(),
            options,
            reconciler,
            barrier: SyncBarrier::new(),
            mounted: None,
        }));

        let weak = Rc::downgrade(&state);
        state
            .borrow()
            .reconciler
            .set_on_settled(Some(Rc::new(move || Self::check_sync(&weak))));

        let weak = Rc::downgrade(&state);
        let listener = ChangeListener::bind(source, Events::CHANGE, move |source, event| {
            Self::apply(&weak, source, event)
        });

        Self { listener, state }
    }

    fn apply(
        state: &Weak<RefCell<RecordState<V>>>,
        source: Option<&dyn Record<V>>,
        event: Option<&RecordChange<V>>,
    ) -> Result<()> {
        let Some(state) = state.upgrade() else {
            return Ok(());
        };

        let result = {
            let s = state.borrow();
            match event {
                None => {
                    s.reconciler.force_teardown();
                    let entries = expected(&s.source, &s.options);
                    log::debug!("record resync with {} keys", entries.len());
                    s.reconciler.initialize(entries)
                }
                Some(change) => match source {
                    Some(source) => Self::apply_change(&s, source, change),
                    None => Ok(()),
                },
            }
        };

        if let Err(err) = &result {
            log::warn!("record update failed: {err}");
        }
        Self::check_sync(&Rc::downgrade(&state));
        result
    }

    // Removals and replacements first, then additions in display order.
    fn apply_change(
        s: &RecordState<V>,
        source: &dyn Record<V>,
        change: &RecordChange<V>,
    ) -> Result<()> {
        let mut additions = Vec::new();
        for (key, _previous) in &change.changed {
            if !s.options.shows(key) {
                continue;
            }
            if let Some(value) = s.reconciler.replace_or_remove(key, source.get(key)) {
                additions.push((key.clone(), value));
            }
        }
        if additions.is_empty() {
            return Ok(());
        }

        let order = s.options.ordered_keys(source);
        additions.sort_by_key(|(key, _)| order.iter().position(|k| k == key));
        for (key, value) in additions {
            let Some(at) = order.iter().position(|k| *k == key) else {
                continue;
            };
            let index = order[..at]
                .iter()
                .filter(|k| s.reconciler.position_of(k).is_some())
                .count();
            s.reconciler.insert(index, key, value)?;
        }
        Ok(())
    }

    fn check_sync(state: &Weak<RefCell<RecordState<V>>>) {
        let Some(state) = state.upgrade() else {
            return;
        };
        let ready = {
            let Ok(mut s) = state.try_borrow_mut() else {
                log::trace!("sync check skipped: view busy");
                return;
            };
            let RecordState {
                source,
                options,
                reconciler,
                barrier,
                ..
            } = &mut *s;
            barrier.release_if(|| reconciler.matches(&expected(source, options)))
        };
        for callback in ready {
            callback();
        }
    }

    /// Renders every shown key. Returns the container node, or `parent` in
    /// fragment mode.
    pub fn render(&mut self, host: &Rc<dyn VisualHost>, parent: NodeId) -> Result<NodeId> {
        if self.listener.is_rendered() {
            self.unrender();
        }

        let target = {
            let mut s = self.state.borrow_mut();
            let container = s.options.tag.as_deref().map(|tag| {
                let node = host.create_node(tag);
                host.insert_before(parent, node, None);
                node
            });
            let target = container.unwrap_or(parent);
            s.reconciler.mount(host.clone(), target);
            s.barrier.mount();
            s.mounted = Some(Mounted {
                host: host.clone(),
                parent,
                container,
            });
            target
        };

        self.listener.on_attach()?;
        Ok(target)
    }

    pub fn unrender(&mut self) {
        self.listener.on_detach();
        let mounted = {
            let mut s = self.state.borrow_mut();
            s.reconciler.unmount();
            s.barrier.unmount();
            s.mounted.take()
        };
        if let Some(Mounted {
            host,
            parent,
            container: Some(container),
        }) = mounted
        {
            host.remove_child(parent, container);
            host.release(container);
        }
    }

    pub fn set_source(&mut self, source: Option<Rc<dyn Record<V>>>) -> Result<()> {
        self.state.borrow_mut().source = source.clone();
        self.listener.set_source(source)
    }

    pub fn source(&self) -> Option<Rc<dyn Record<V>>> {
        self.listener.source()
    }

    /// Queues `callback` until the shown keys and values match the record.
    pub fn sync(&self, callback: impl FnOnce() + 'static) -> bool {
        if !self.state.borrow_mut().barrier.register(Box::new(callback)) {
            log::debug!("sync requested on an unrendered record view");
            return false;
        }
        Self::check_sync(&Rc::downgrade(&self.state));
        true
    }

    pub fn with_child_at<R>(&self, index: usize, f: impl FnOnce(&dyn Component) -> R) -> Option<R> {
        self.state.borrow().reconciler.with_component_at(index, f)
    }

    pub fn child_node(&self, index: usize) -> Option<NodeId> {
        self.state.borrow().reconciler.node_at(index)
    }

    /// Shown keys, in display order.
    pub fn keys(&self) -> Vec<String> {
        self.state.borrow().reconciler.keys()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().reconciler.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn exiting_len(&self) -> usize {
        self.state.borrow().reconciler.exiting_len()
    }

    pub fn active_transitions(&self) -> usize {
        self.state.borrow().reconciler.active_tokens()
    }

    pub fn is_rendered(&self) -> bool {
        self.listener.is_rendered()
    }
}

impl<V: Clone + PartialEq + 'static> Component for RecordView<V> {
    fn render(&mut self, host: &Rc<dyn VisualHost>, node: NodeId) -> Result<()> {
        RecordView::render(self, host, node).map(|_| ())
    }

    fn unrender(&mut self) {
        RecordView::unrender(self);
    }
}
