//! Keyed reconciliation of a flat list of child components.
//!
//! A [`KeyedReconciler`] keeps one record per visible child: its key, the
//! value it was built from, the component and the host node it renders into.
//! Records move through `live -> exiting -> gone`:
//!
//! - `insert` builds a child, mounts its node hidden, renders it, then shows it
//!   and starts the enter transition,
//! - `remove_at` / `remove_key` / `replace_or_remove` move a record to the
//!   exiting set and start its exit transition,
//! - the exit completion tears the record down, but only if it is still in the
//!   exiting set, so a late or repeated completion is a no-op,
//! - `force_teardown` drops everything synchronously, cancelling transitions.
//!
//! Asynchronous callbacks (exit completions, deferred builds) name records by
//! [`RecordId`]. Ids are generational, so a callback that outlives its record
//! can never reach a newer one.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use futures::task::{LocalSpawn, LocalSpawnExt};
use slotmap::{SlotMap, new_key_type};

use repose_core::{
    BoxedComponent, Built, Component, Error, NodeId, Phase, Result, Transition,
    TransitionOptions, TransitionToken, VisualHost,
};

new_key_type! {
    pub struct RecordId;
}

/// Builds the child for `(key, value)` at its position in the live list.
pub type Factory<K, V> = Rc<dyn Fn(&K, &V, usize) -> Result<Built>>;

#[derive(Clone)]
pub struct ReconcilerOptions {
    /// Tag of the node each child renders into.
    pub child_tag: String,
    /// No transition means inserts and removals take effect immediately.
    pub transition: Option<Rc<dyn Transition>>,
    /// Runs deferred builds.
    pub spawner: Option<Rc<dyn LocalSpawn>>,
    pub enter: TransitionOptions,
    pub exit: TransitionOptions,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            child_tag: "div".into(),
            transition: None,
            spawner: None,
            enter: TransitionOptions::reset(),
            exit: TransitionOptions::default(),
        }
    }
}

impl ReconcilerOptions {
    pub fn with_child_tag(mut self, tag: impl Into<String>) -> Self {
        self.child_tag = tag.into();
        self
    }

    pub fn with_transition(mut self, transition: Rc<dyn Transition>) -> Self {
        self.transition = Some(transition);
        self
    }

    pub fn with_spawner(mut self, spawner: Rc<dyn LocalSpawn>) -> Self {
        self.spawner = Some(spawner);
        self
    }

    pub fn with_enter(mut self, enter: TransitionOptions) -> Self {
        self.enter = enter;
        self
    }

    pub fn with_exit(mut self, exit: TransitionOptions) -> Self {
        self.exit = exit;
        self
    }
}

impl fmt::Debug for ReconcilerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconcilerOptions")
            .field("child_tag", &self.child_tag)
            .field("transition", &self.transition.is_some())
            .field("spawner", &self.spawner.is_some())
            .field("enter", &self.enter)
            .field("exit", &self.exit)
            .finish()
    }
}

struct ChildRecord<K, V> {
    key: K,
    value: V,
    component: Option<BoxedComponent>,
    node: NodeId,
    token: Option<TransitionToken>,
    // Deferred build not resolved yet.
    pending: bool,
}

struct Core<K, V> {
    options: ReconcilerOptions,
    host: Option<Rc<dyn VisualHost>>,
    container: Option<NodeId>,
    records: SlotMap<RecordId, ChildRecord<K, V>>,
    live: Vec<RecordId>,
    exiting: Vec<RecordId>,
    on_settled: Option<Rc<dyn Fn()>>,
    late_exits: LateExits,
}

type Shared<K, V> = Rc<RefCell<Core<K, V>>>;

// Exit completions that arrived while the core was borrowed.
type LateExits = Rc<RefCell<Vec<RecordId>>>;

fn render_into(
    host: &Rc<dyn VisualHost>,
    node: NodeId,
    component: Option<BoxedComponent>,
) -> Result<Option<BoxedComponent>> {
    match component {
        Some(mut component) => {
            component.render(host, node)?;
            Ok(Some(component))
        }
        None => Ok(None),
    }
}

fn stop_token(transition: &Option<Rc<dyn Transition>>, token: &TransitionToken) {
    match transition {
        Some(transition) => transition.stop(token),
        None => {
            token.cancel();
        }
    }
}

impl<K, V> Core<K, V>
where
    K: Clone + PartialEq + fmt::Debug + 'static,
    V: Clone + PartialEq + 'static,
{
    fn target(&self) -> Result<(Rc<dyn VisualHost>, NodeId)> {
        match (&self.host, self.container) {
            (Some(host), Some(container)) => Ok((host.clone(), container)),
            _ => Err(Error::NotRendered),
        }
    }

    fn node_of(&self, id: RecordId) -> Option<NodeId> {
        self.records.get(id).map(|r| r.node)
    }

    fn find_live(&self, key: &K) -> Option<RecordId> {
        self.live
            .iter()
            .copied()
            .find(|id| self.records.get(*id).is_some_and(|r| r.key == *key))
    }

    fn live_records(&self) -> impl Iterator<Item = &ChildRecord<K, V>> {
        self.live.iter().filter_map(|id| self.records.get(*id))
    }

    fn add(
        this: &Shared<K, V>,
        factory: &Factory<K, V>,
        index: usize,
        key: K,
        value: V,
        animate: bool,
    ) -> Result<()> {
        let (host, container, before, tag, spawner) = {
            let core = this.borrow();
            let (host, container) = core.target()?;
            let len = core.live.len();
            if index > len {
                return Err(Error::IndexOutOfRange { index, len });
            }
            let before = core.live.get(index).and_then(|id| core.node_of(*id));
            (
                host,
                container,
                before,
                core.options.child_tag.clone(),
                core.options.spawner.clone(),
            )
        };

        let built = factory(&key, &value, index)?;
        if matches!(built, Built::Deferred(_)) && spawner.is_none() {
            return Err(Error::NoSpawner);
        }

        let node = host.create_node(&tag);
        host.set_hidden(node, true);
        host.insert_before(container, node, before);

        match built {
            Built::Ready(component) => {
                let component = match render_into(&host, node, component) {
                    Ok(component) => component,
                    Err(err) => {
                        host.remove_child(container, node);
                        host.release(node);
                        return Err(err);
                    }
                };
                let id = Self::push_live(this, index, key, value, component, node, false);
                host.set_hidden(node, false);
                if animate {
                    Self::start_enter(this, id);
                }
            }
            Built::Deferred(future) => {
                let id = Self::push_live(this, index, key, value, None, node, true);
                let weak = Rc::downgrade(this);
                let spawned = spawner.ok_or(Error::NoSpawner).and_then(|spawner| {
                    spawner
                        .spawn_local(async move {
                            let result = future.await;
                            Self::resolve(&weak, id, result, animate);
                        })
                        .map_err(Error::from)
                });
                if let Err(err) = spawned {
                    Self::teardown(this, id);
                    return Err(err);
                }
                log::trace!("deferred build spawned for {id:?}");
            }
        }
        Ok(())
    }

    fn push_live(
        this: &Shared<K, V>,
        index: usize,
        key: K,
        value: V,
        component: Option<BoxedComponent>,
        node: NodeId,
        pending: bool,
    ) -> RecordId {
        let mut core = this.borrow_mut();
        let id = core.records.insert(ChildRecord {
            key,
            value,
            component,
            node,
            token: None,
            pending,
        });
        let at = index.min(core.live.len());
        core.live.insert(at, id);
        id
    }

    fn start_enter(this: &Shared<K, V>, id: RecordId) {
        let (transition, host, node, options) = {
            let core = this.borrow();
            let (Some(transition), Some(host), Some(node)) = (
                core.options.transition.clone(),
                core.host.clone(),
                core.node_of(id),
            ) else {
                return;
            };
            (transition, host, node, core.options.enter)
        };

        let weak = Rc::downgrade(this);
        let token = transition.start(
            &host,
            node,
            Phase::Enter,
            &options,
            Box::new(move || {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                if let Ok(mut core) = shared.try_borrow_mut()
                    && let Some(record) = core.records.get_mut(id)
                    && record.token.as_ref().is_some_and(|t| !t.is_active())
                {
                    record.token = None;
                }
            }),
        );
        if let Some(record) = this.borrow_mut().records.get_mut(id) {
            record.token = Some(token);
        }
    }

    /// Moves a live record to the exiting set and starts its exit.
    fn retire(this: &Shared<K, V>, id: RecordId) {
        let (transition, host, node, options, animate, late) = {
            let mut core = this.borrow_mut();
            let Some(at) = core.live.iter().position(|x| *x == id) else {
                return;
            };
            core.live.remove(at);
            core.exiting.push(id);

            let transition = core.options.transition.clone();
            let options = core.options.exit;
            let host = core.host.clone();
            let late = core.late_exits.clone();
            let Some(record) = core.records.get_mut(id) else {
                return;
            };
            if let Some(token) = record.token.take() {
                stop_token(&transition, &token);
            }
            (transition, host, record.node, options, !record.pending, late)
        };

        // Placeholders of unresolved builds were never shown.
        let (Some(transition), Some(host), true) = (transition, host, animate) else {
            Self::teardown(this, id);
            return;
        };

        let weak = Rc::downgrade(this);
        let token = transition.start(
            &host,
            node,
            Phase::Exit,
            &options,
            Box::new(move || Self::finish_exit(&weak, &late, id)),
        );
        if let Some(record) = this.borrow_mut().records.get_mut(id) {
            record.token = Some(token);
        }
    }

    fn finish_exit(weak: &Weak<RefCell<Self>>, late: &LateExits, id: RecordId) {
        let Some(this) = weak.upgrade() else {
            return;
        };
        if this.try_borrow_mut().is_err() {
            log::debug!("exit of {id:?} finished while its reconciler was busy, deferring");
            late.borrow_mut().push(id);
            return;
        }
        Self::complete_exit(&this, id);
        Self::flush_late_exits(&this, late);
    }

    fn complete_exit(this: &Shared<K, V>, id: RecordId) {
        if !this.borrow().exiting.contains(&id) {
            log::trace!("stale exit completion for {id:?}");
            return;
        }
        Self::teardown(this, id);
        Self::settled(this);
    }

    /// Finishes the exits deferred by [`finish_exit`](Self::finish_exit).
    fn flush_late_exits(this: &Shared<K, V>, late: &LateExits) {
        loop {
            if this.try_borrow_mut().is_err() {
                return;
            }
            let Some(id) = late.borrow_mut().pop() else {
                return;
            };
            Self::complete_exit(this, id);
        }
    }

    fn resolve(
        weak: &Weak<RefCell<Self>>,
        id: RecordId,
        result: Result<Option<BoxedComponent>>,
        animate: bool,
    ) {
        let Some(this) = weak.upgrade() else {
            log::trace!("deferred build for {id:?} resolved after its reconciler was dropped");
            return;
        };
        let target = {
            let core = this.borrow();
            match (core.host.clone(), core.node_of(id)) {
                (Some(host), Some(node)) if core.live.contains(&id) => Some((host, node)),
                _ => None,
            }
        };
        let Some((host, node)) = target else {
            log::trace!("dropping deferred build for {id:?}: no longer live");
            return;
        };

        match result.and_then(|component| render_into(&host, node, component)) {
            Ok(component) => {
                let leftover = {
                    let mut core = this.borrow_mut();
                    match core.records.get_mut(id) {
                        Some(record) => {
                            record.component = component;
                            record.pending = false;
                            None
                        }
                        None => component,
                    }
                };
                if let Some(mut component) = leftover {
                    component.unrender();
                    return;
                }
                host.set_hidden(node, false);
                if animate {
                    Self::start_enter(&this, id);
                }
            }
            Err(err) => {
                log::error!("deferred build for {id:?} failed: {err}");
                Self::teardown(&this, id);
            }
        }
        Self::settled(&this);
    }

    /// Drops a record for good: cancels its transition, unrenders the
    /// component, detaches and releases the node.
    fn teardown(this: &Shared<K, V>, id: RecordId) {
        let (record, host, container) = {
            let mut core = this.borrow_mut();
            core.live.retain(|x| *x != id);
            core.exiting.retain(|x| *x != id);
            let Some(record) = core.records.remove(id) else {
                return;
            };
            if let Some(token) = &record.token {
                stop_token(&core.options.transition, token);
            }
            (record, core.host.clone(), core.container)
        };

        if let Some(mut component) = record.component {
            component.unrender();
        }
        if let (Some(host), Some(container)) = (host, container) {
            host.remove_child(container, record.node);
            host.release(record.node);
        }
    }

    fn force_teardown(this: &Shared<K, V>) {
        let ids: Vec<RecordId> = {
            let core = this.borrow();
            core.live.iter().chain(core.exiting.iter()).copied().collect()
        };
        if !ids.is_empty() {
            log::debug!("tearing down {} child records", ids.len());
        }
        for id in ids {
            Self::teardown(this, id);
        }
    }

    fn settled(this: &Shared<K, V>) {
        let callback = this.borrow().on_settled.clone();
        if let Some(callback) = callback {
            callback();
        }
    }
}

/// Maintains the live and exiting child records of one container node.
pub struct KeyedReconciler<K: 'static, V: 'static> {
    core: Shared<K, V>,
    factory: Factory<K, V>,
    late_exits: LateExits,
}

impl<K, V> KeyedReconciler<K, V>
where
    K: Clone + PartialEq + fmt::Debug + 'static,
    V: Clone + PartialEq + 'static,
{
    pub fn new(
        factory: impl Fn(&K, &V, usize) -> Result<Built> + 'static,
        options: ReconcilerOptions,
    ) -> Self {
        let late_exits = LateExits::default();
        Self {
            core: Rc::new(RefCell::new(Core {
                options,
                host: None,
                container: None,
                records: SlotMap::with_key(),
                live: Vec::new(),
                exiting: Vec::new(),
                on_settled: None,
                late_exits: late_exits.clone(),
            })),
            factory: Rc::new(factory),
            late_exits,
        }
    }

    fn flush_late_exits(&self) {
        Core::flush_late_exits(&self.core, &self.late_exits);
    }

    pub fn options(&self) -> ReconcilerOptions {
        self.core.borrow().options.clone()
    }

    /// Called after asynchronous work changed the structure: an exit finished
    /// or a deferred build resolved.
    pub fn set_on_settled(&self, callback: Option<Rc<dyn Fn()>>) {
        self.core.borrow_mut().on_settled = callback;
    }

    pub fn mount(&self, host: Rc<dyn VisualHost>, container: NodeId) {
        if self.is_mounted() {
            self.unmount();
        }
        let mut core = self.core.borrow_mut();
        core.host = Some(host);
        core.container = Some(container);
    }

    /// Tears down every record and forgets the container.
    pub fn unmount(&self) {
        self.force_teardown();
        let mut core = self.core.borrow_mut();
        core.host = None;
        core.container = None;
    }

    pub fn is_mounted(&self) -> bool {
        self.core.borrow().container.is_some()
    }

    /// Appends one record per entry, without transitions.
    ///
    /// Stops at the first failing entry; records created before it stay live.
    pub fn initialize(&self, entries: impl IntoIterator<Item = (K, V)>) -> Result<()> {
        for (key, value) in entries {
            let index = self.len();
            Core::add(&self.core, &self.factory, index, key, value, false)?;
        }
        log::debug!("initialized {} child records", self.len());
        self.flush_late_exits();
        Ok(())
    }

    pub fn insert(&self, index: usize, key: K, value: V) -> Result<()> {
        let result = Core::add(&self.core, &self.factory, index, key, value, true);
        self.flush_late_exits();
        result
    }

    pub fn remove_at(&self, index: usize) -> Result<()> {
        let id = {
            let core = self.core.borrow();
            let len = core.live.len();
            core.live
                .get(index)
                .copied()
                .ok_or(Error::IndexOutOfRange { index, len })?
        };
        Core::retire(&self.core, id);
        self.flush_late_exits();
        Ok(())
    }

    /// Returns `false` if no live record has `key`.
    pub fn remove_key(&self, key: &K) -> bool {
        let id = self.core.borrow().find_live(key);
        match id {
            Some(id) => {
                Core::retire(&self.core, id);
                self.flush_late_exits();
                true
            }
            None => false,
        }
    }

    /// Retires the live record for `key` unless it already holds `value`.
    ///
    /// Returns the value that still has to be inserted: `None` when it is
    /// unchanged or when the key is being removed.
    pub fn replace_or_remove(&self, key: &K, value: Option<V>) -> Option<V> {
        let (id, unchanged) = {
            let core = self.core.borrow();
            let id = core.find_live(key);
            let unchanged = match (id, &value) {
                (Some(id), Some(value)) => core.records.get(id).is_some_and(|r| r.value == *value),
                _ => false,
            };
            (id, unchanged)
        };

        if unchanged {
            return None;
        }
        if let Some(id) = id {
            Core::retire(&self.core, id);
            self.flush_late_exits();
        }
        value
    }

    /// Synchronously drops every live and exiting record. No transition
    /// completion runs afterwards.
    pub fn force_teardown(&self) {
        Core::force_teardown(&self.core);
    }

    pub fn len(&self) -> usize {
        self.core.borrow().live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.borrow().live.is_empty()
    }

    pub fn exiting_len(&self) -> usize {
        self.core.borrow().exiting.len()
    }

    pub fn keys(&self) -> Vec<K> {
        self.core.borrow().live_records().map(|r| r.key.clone()).collect()
    }

    pub fn entries(&self) -> Vec<(K, V)> {
        self.core
            .borrow()
            .live_records()
            .map(|r| (r.key.clone(), r.value.clone()))
            .collect()
    }

    pub fn position_of(&self, key: &K) -> Option<usize> {
        self.core.borrow().live_records().position(|r| r.key == *key)
    }

    pub fn node_at(&self, index: usize) -> Option<NodeId> {
        let core = self.core.borrow();
        core.live.get(index).and_then(|id| core.node_of(*id))
    }

    pub fn value_at(&self, index: usize) -> Option<V> {
        let core = self.core.borrow();
        core.live
            .get(index)
            .and_then(|id| core.records.get(*id))
            .map(|r| r.value.clone())
    }

    /// Runs `f` on the component at `index`, if it is built.
    pub fn with_component_at<R>(
        &self,
        index: usize,
        f: impl FnOnce(&dyn Component) -> R,
    ) -> Option<R> {
        let result = {
            let core = self.core.borrow();
            let component = core
                .live
                .get(index)
                .and_then(|id| core.records.get(*id))
                .and_then(|r| r.component.as_deref())?;
            f(component)
        };
        self.flush_late_exits();
        Some(result)
    }

    /// Deferred builds that have not resolved yet.
    pub fn pending_builds(&self) -> usize {
        self.core.borrow().live_records().filter(|r| r.pending).count()
    }

    /// `true` if the live records are exactly `expected`, in order, and
    /// every one of them is built.
    pub fn matches(&self, expected: &[(K, V)]) -> bool {
        let core = self.core.borrow();
        core.live.len() == expected.len()
            && core
                .live_records()
                .zip(expected)
                .all(|(r, (key, value))| !r.pending && r.key == *key && r.value == *value)
    }

    /// Transitions whose completion has neither run nor been cancelled.
    pub fn active_tokens(&self) -> usize {
        self.core
            .borrow()
            .records
            .values()
            .filter(|r| r.token.as_ref().is_some_and(TransitionToken::is_active))
            .count()
    }
}

impl<V: Clone + PartialEq + 'static> KeyedReconciler<usize, V> {
    /// Renumbers positional keys after an insert or removal.
    pub fn reindex(&self) {
        let mut core = self.core.borrow_mut();
        let Core { live, records, .. } = &mut *core;
        for (index, id) in live.iter().enumerate() {
            if let Some(record) = records.get_mut(*id) {
                record.key = index;
            }
        }
    }
}
