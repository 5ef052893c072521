use std::cell::RefCell;
use std::rc::{Rc, Weak};

use repose_core::{
    Built, Collection, CollectionEvent, Component, Events, NodeId, Result, VisualHost,
};

use crate::listener::ChangeListener;
use crate::reconciler::{KeyedReconciler, ReconcilerOptions};
use crate::sync::SyncBarrier;

#[derive(Clone, Debug)]
pub struct CollectionViewOptions {
    /// Tag of the container node.
    pub tag: String,
    pub reconciler: ReconcilerOptions,
}

impl Default for CollectionViewOptions {
    fn default() -> Self {
        Self {
            tag: "ul".into(),
            reconciler: ReconcilerOptions::default().with_child_tag("li"),
        }
    }
}

impl CollectionViewOptions {
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_reconciler(mut self, reconciler: ReconcilerOptions) -> Self {
        self.reconciler = reconciler;
        self
    }
}

struct Mounted {
    host: Rc<dyn VisualHost>,
    parent: NodeId,
    container: NodeId,
}

struct ListState<T: 'static> {
    source: Option<Rc<dyn Collection<T>>>,
    reconciler: KeyedReconciler<usize, T>,
    barrier: SyncBarrier,
    mounted: Option<Mounted>,
}

impl<T: Clone + PartialEq + 'static> ListState<T> {
    fn in_sync(reconciler: &KeyedReconciler<usize, T>, source: &Option<Rc<dyn Collection<T>>>) -> bool {
        let expected: Vec<(usize, T)> = source
            .as_ref()
            .map(|s| s.snapshot())
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .collect();
        reconciler.matches(&expected)
    }
}

/// Renders an ordered collection, one child per item, and follows its
/// `add` / `remove` events.
///
/// Children are built by the factory given to [`new`](Self::new), which sees
/// the item and its index. Removed children leave through the configured
/// exit transition while later items move up immediately.
pub struct CollectionView<T: Clone + PartialEq + 'static> {
    listener: ChangeListener<dyn Collection<T>>,
    state: Rc<RefCell<ListState<T>>>,
    options: CollectionViewOptions,
}

impl<T: Clone + PartialEq + 'static> CollectionView<T> {
    pub fn new(
        source: Option<Rc<dyn Collection<T>>>,
        factory: impl Fn(&T, usize) -> Result<Built> + 'static,
        options: CollectionViewOptions,
    ) -> Self {
        let reconciler = KeyedReconciler::new(
            move |_key: &usize, item: &T, index| factory(item, index),
            options.reconciler.clone(),
        );
        let state = Rc::new(RefCell::new(ListState {
            source: source.clone(),
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
        let listener = ChangeListener::bind(
            source,
            Events::ADD | Events::REMOVE,
            move |source, event| Self::apply(&weak, source, event),
        );

        Self {
            listener,
            state,
            options,
        }
    }

    fn apply(
        state: &Weak<RefCell<ListState<T>>>,
        source: Option<&dyn Collection<T>>,
        event: Option<&CollectionEvent<T>>,
    ) -> Result<()> {
        let Some(state) = state.upgrade() else {
            return Ok(());
        };

        let result = {
            let s = state.borrow();
            let reconciler = &s.reconciler;
            let result = match event {
                None => {
                    reconciler.force_teardown();
                    let items = source.map(|s| s.snapshot()).unwrap_or_default();
                    log::debug!("collection resync with {} items", items.len());
                    reconciler.initialize(items.into_iter().enumerate())
                }
                Some(CollectionEvent::Add { item, idx }) => {
                    reconciler.insert(*idx, *idx, item.clone())
                }
                Some(CollectionEvent::Remove { idx }) => reconciler.remove_at(*idx),
            };
            reconciler.reindex();
            result
        };

        if let Err(err) = &result {
            log::warn!("collection update failed: {err}");
        }
        Self::check_sync(&Rc::downgrade(&state));
        result
    }

    fn check_sync(state: &Weak<RefCell<ListState<T>>>) {
        let Some(state) = state.upgrade() else {
            return;
        };
        let ready = {
            let Ok(mut s) = state.try_borrow_mut() else {
                log::trace!("sync check skipped: view busy");
                return;
            };
            let ListState {
                source,
                reconciler,
                barrier,
                ..
            } = &mut *s;
            barrier.release_if(|| ListState::in_sync(reconciler, source))
        };
        for callback in ready {
            callback();
        }
    }

    /// Creates the container under `parent` and renders every current item.
    pub fn render(&mut self, host: &Rc<dyn VisualHost>, parent: NodeId) -> Result<NodeId> {
        if self.listener.is_rendered() {
            self.unrender();
        }

        let container = host.create_node(&self.options.tag);
        host.insert_before(parent, container, None);
        {
            let mut s = self.state.borrow_mut();
            s.reconciler.mount(host.clone(), container);
            s.barrier.mount();
            s.mounted = Some(Mounted {
                host: host.clone(),
                parent,
                container,
            });
        }

        self.listener.on_attach()?;
        Ok(container)
    }

    /// Tears every child down at once, skipping exit transitions, and removes
    /// the container. Pending `sync` callbacks are dropped.
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
            container,
        }) = mounted
        {
            host.remove_child(parent, container);
            host.release(container);
        }
    }

    /// Swaps the source. While rendered the old children are dropped without
    /// transitions and the new source is rendered from scratch.
    pub fn set_source(&mut self, source: Option<Rc<dyn Collection<T>>>) -> Result<()> {
        self.state.borrow_mut().source = source.clone();
        self.listener.set_source(source)
    }

    pub fn source(&self) -> Option<Rc<dyn Collection<T>>> {
        self.listener.source()
    }

    /// Queues `callback` until the children match the source again; runs it
    /// right away if they already do. Returns `false` when not rendered.
    pub fn sync(&self, callback: impl FnOnce() + 'static) -> bool {
        if !self.state.borrow_mut().barrier.register(Box::new(callback)) {
            log::debug!("sync requested on an unrendered collection view");
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

    pub fn container(&self) -> Option<NodeId> {
        self.state.borrow().mounted.as_ref().map(|m| m.container)
    }

    /// Items currently shown, in order.
    pub fn items(&self) -> Vec<T> {
        self.state
            .borrow()
            .reconciler
            .entries()
            .into_iter()
            .map(|(_, item)| item)
            .collect()
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

impl<T: Clone + PartialEq + 'static> Component for CollectionView<T> {
    fn render(&mut self, host: &Rc<dyn VisualHost>, node: NodeId) -> Result<()> {
        CollectionView::render(self, host, node).map(|_| ())
    }

    fn unrender(&mut self) {
        CollectionView::unrender(self);
    }
}
