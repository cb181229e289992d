//! The TreeModel: consumer-facing lazy tree over a mutable source.
//!
//! The model owns the shadow tree, the update-window counter and the
//! observer fan-out behind one `RefCell`. Everything runs on the caller's
//! thread; the only deferred work is the single close scheduled by
//! [`TreeModel::queue_update`].
//!
//! Structural brackets are delivered while the model is borrowed; their
//! handlers must not call back into it and read the cache view instead.
//! [`ModelEvent::FullRefresh`] is delivered after the borrow is released.

use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};

use lazytree_core::{Address, ModelEvent, Role};
use lazytree_source::{Source, UpdateSink};
use lazytree_sync::{reconcile, CacheSnapshot, NodeCache, Observer, ObserverSet, ReconcileStats, SyncError};

use crate::coalescer::UpdateCoalescer;
use crate::config::ModelConfig;
use crate::error::{ModelError, Result};
use crate::scheduler::{Scheduler, Task, TaskHandle};

struct ModelState<I> {
    cache: NodeCache<I>,
    observers: ObserverSet<I>,
    coalescer: UpdateCoalescer,
    /// Deferred close scheduled by `queue_update`, if still pending.
    pending: Option<TaskHandle>,
    passes: usize,
    last_stats: Option<ReconcileStats>,
}

struct Shared<S: Source> {
    source: S,
    scheduler: Rc<dyn Scheduler>,
    config: ModelConfig,
    state: RefCell<ModelState<S::Item>>,
}

impl<S: Source + 'static> Shared<S> {
    fn reconcile_all(&self, state: &mut ModelState<S::Item>) -> ReconcileStats {
        let root = state.cache.root();
        let stats = reconcile(&mut state.cache, &self.source, root, &mut state.observers);
        state.passes += 1;
        state.last_stats = Some(stats);
        stats
    }

    fn begin_update(&self) {
        let depth = self.state.borrow_mut().coalescer.begin();
        tracing::trace!(depth, "update window opened");
    }

    fn end_update(&self) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;

        if !state.coalescer.is_active() {
            tracing::warn!("end_update without a matching begin_update; ignored");
            return;
        }
        if state.coalescer.closes_outermost() {
            self.reconcile_all(state);
        }
        let depth = state.coalescer.end().unwrap_or(0);
        tracing::trace!(depth, "update window closed");
        if depth > 0 {
            return;
        }

        // The queued window, if any, is closed now.
        if let Some(pending) = state.pending.take() {
            pending.cancel();
        }
        if !self.config.refresh_on_commit || state.observers.is_empty() {
            return;
        }

        // Refresh handlers run unborrowed so they can read back through the
        // model. They get a copy of the cache as it stood at commit.
        let mut observers = mem::take(&mut state.observers);
        let view = state.cache.clone();
        drop(guard);
        observers.on_event(&ModelEvent::FullRefresh, &view);

        let mut state = self.state.borrow_mut();
        let subscribed_meanwhile = mem::replace(&mut state.observers, observers);
        state.observers.append(subscribed_meanwhile);
    }

    fn queue_update(this: &Rc<Self>) {
        if !this.state.borrow_mut().coalescer.try_queue() {
            tracing::trace!("update already active; queue request absorbed");
            return;
        }

        let weak = Rc::downgrade(this);
        let task: Task = Box::new(move || match weak.upgrade() {
            Some(shared) => {
                shared.state.borrow_mut().pending = None;
                shared.end_update();
            }
            None => tracing::trace!("model dropped before deferred update ran"),
        });

        match this.scheduler.defer(task) {
            Ok(handle) => this.state.borrow_mut().pending = Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "could not defer update; closing window now");
                this.end_update();
            }
        }
    }
}

/// Update signals routed from a source (or any other producer) to a model.
///
/// Holds the model weakly: once the model is dropped every call is a no-op.
struct UpdateHandle<S: Source> {
    shared: Weak<Shared<S>>,
}

impl<S: Source + 'static> UpdateSink for UpdateHandle<S> {
    fn begin_update(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.begin_update();
        }
    }

    fn end_update(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.end_update();
        }
    }

    fn queue_update(&self) {
        if let Some(shared) = self.shared.upgrade() {
            Shared::queue_update(&shared);
        }
    }
}

/// A lazily materialized tree model over a [`Source`].
///
/// Rows are materialized on first demand ([`row_count`](Self::row_count)),
/// and one reconciliation pass at the end of each outermost update window
/// brings everything materialized back in line with the source.
///
/// # Panics
///
/// Calling into the model while handling a remove or insert bracket panics
/// with a `RefCell` borrow error. A [`ModelEvent::FullRefresh`] handler may
/// use the model freely; notifications raised from inside that handler
/// reach only observers subscribed during it.
pub struct TreeModel<S: Source + 'static> {
    shared: Rc<Shared<S>>,
}

impl<S: Source + 'static> TreeModel<S> {
    /// Create a model with the default configuration.
    pub fn new(source: S, scheduler: Rc<dyn Scheduler>) -> Self {
        Self::with_config(source, scheduler, ModelConfig::default())
    }

    /// Create a model.
    ///
    /// Attaches an update sink to `source`, then reconciles once if
    /// [`ModelConfig::initial_sync`] is set.
    pub fn with_config(source: S, scheduler: Rc<dyn Scheduler>, config: ModelConfig) -> Self {
        let initial_sync = config.initial_sync;
        let shared = Rc::new(Shared {
            source,
            scheduler,
            config,
            state: RefCell::new(ModelState {
                cache: NodeCache::new(),
                observers: ObserverSet::new(),
                coalescer: UpdateCoalescer::new(),
                pending: None,
                passes: 0,
                last_stats: None,
            }),
        });
        let model = Self { shared };
        model.shared.source.attach(model.handle());
        if initial_sync {
            model.sync_tree();
        }
        model
    }

    /// The wrapped source.
    pub fn source(&self) -> &S {
        &self.shared.source
    }

    /// The active configuration.
    pub fn config(&self) -> &ModelConfig {
        &self.shared.config
    }

    /// A weak update sink for this model.
    pub fn handle(&self) -> Rc<dyn UpdateSink> {
        Rc::new(UpdateHandle {
            shared: Rc::downgrade(&self.shared),
        })
    }

    /// Register an observer for structural and refresh notifications.
    pub fn subscribe<O>(&self, observer: O)
    where
        O: Observer<S::Item> + 'static,
    {
        self.shared
            .state
            .borrow_mut()
            .observers
            .subscribe(Box::new(observer));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Navigation
    // ─────────────────────────────────────────────────────────────────────────

    /// Address of the materialized child at `row` under `parent`.
    ///
    /// Never loads; `None` for rows that are not materialized or a stale
    /// parent.
    pub fn index(&self, row: usize, parent: Address) -> Option<Address> {
        let state = self.shared.state.borrow();
        let parent = state.cache.node_at(parent)?;
        let child = state.cache.child(parent, row)?;
        state.cache.address_of(child)
    }

    /// Number of rows under `parent`, loading them on first call.
    pub fn row_count(&self, parent: Address) -> usize {
        let mut state = self.shared.state.borrow_mut();
        match state.cache.node_at(parent) {
            Some(node) => state.cache.child_count(&self.shared.source, node),
            None => 0,
        }
    }

    /// Always one.
    pub fn column_count(&self) -> usize {
        1
    }

    /// Whether `parent` has children, probing without loading.
    ///
    /// The root always reports true.
    pub fn has_children(&self, parent: Address) -> bool {
        if parent.is_root() {
            return true;
        }
        let mut state = self.shared.state.borrow_mut();
        match state.cache.node_at(parent) {
            Some(node) => state.cache.has_presence(&self.shared.source, node),
            None => false,
        }
    }

    /// Address of the parent of `address`; `None` for the root and stale
    /// addresses.
    pub fn parent(&self, address: Address) -> Option<Address> {
        let node = address.node()?;
        self.shared.state.borrow().cache.parent_address_of(node)
    }

    /// Source identity behind `address`.
    pub fn item(&self, address: Address) -> Option<S::Item> {
        let state = self.shared.state.borrow();
        let node = state.cache.node_at(address)?;
        state.cache.item(node).cloned()
    }

    /// Address of the node mirroring `item`, materializing its ancestors.
    pub fn try_address_of_item(&self, item: &S::Item) -> Result<Address> {
        let mut state = self.shared.state.borrow_mut();
        let node = state.cache.try_resolve_by_item(
            &self.shared.source,
            item,
            self.shared.config.max_ancestor_depth,
        )?;
        state
            .cache
            .address_of(node)
            .ok_or(ModelError::Sync(SyncError::StaleNode(node)))
    }

    /// Like [`try_address_of_item`](Self::try_address_of_item), but
    /// reports every failure as `None`.
    pub fn address_of_item(&self, item: &S::Item) -> Option<Address> {
        match self.try_address_of_item(item) {
            Ok(address) => Some(address),
            Err(ModelError::Sync(e @ SyncError::CyclicAncestry { .. }))
            | Err(ModelError::Sync(e @ SyncError::AncestryTooDeep { .. })) => {
                tracing::warn!(error = %e, "item has cyclic ancestry");
                None
            }
            Err(e) => {
                tracing::debug!(error = %e, "item did not resolve");
                None
            }
        }
    }

    /// Payload for `address`.
    ///
    /// Returns the default value for the root, for stale addresses and
    /// while an update window is open.
    pub fn data(&self, address: Address, role: Role) -> S::Value {
        let state = self.shared.state.borrow();
        if state.coalescer.is_active() {
            return S::Value::default();
        }
        match state.cache.node_at(address).and_then(|n| state.cache.item(n)) {
            Some(item) => self.shared.source.data(item, role),
            None => S::Value::default(),
        }
    }

    /// Like [`data`](Self::data), but fails on a stale address.
    pub fn try_data(&self, address: Address, role: Role) -> Result<S::Value> {
        let state = self.shared.state.borrow();
        if state.cache.node_at(address).is_none() {
            return Err(ModelError::StaleAddress(address));
        }
        drop(state);
        Ok(self.data(address, role))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Updates
    // ─────────────────────────────────────────────────────────────────────────

    /// Open an update window.
    pub fn begin_update(&self) {
        self.shared.begin_update();
    }

    /// Close an update window. Closing the outermost one reconciles the
    /// whole tree, then emits a full refresh.
    pub fn end_update(&self) {
        self.shared.end_update();
    }

    /// Request a reconciliation after the current unit of work.
    ///
    /// Any number of requests before the deferred close runs collapse into
    /// one pass. A request while a window is already open is absorbed by
    /// that window.
    pub fn queue_update(&self) {
        Shared::queue_update(&self.shared);
    }

    /// Whether an update window is open.
    pub fn is_updating(&self) -> bool {
        self.shared.state.borrow().coalescer.is_active()
    }

    /// Current update nesting depth.
    pub fn update_depth(&self) -> usize {
        self.shared.state.borrow().coalescer.depth()
    }

    /// Whether a deferred close is waiting to run.
    pub fn has_pending_update(&self) -> bool {
        self.shared.state.borrow().pending.is_some()
    }

    /// Reconcile the whole materialized tree now, regardless of windows.
    pub fn sync_tree(&self) -> ReconcileStats {
        let mut state = self.shared.state.borrow_mut();
        self.shared.reconcile_all(&mut state)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────────────────

    /// Number of reconciliation passes run so far.
    pub fn reconciliations(&self) -> usize {
        self.shared.state.borrow().passes
    }

    /// Counters from the most recent pass.
    pub fn last_stats(&self) -> Option<ReconcileStats> {
        self.shared.state.borrow().last_stats
    }

    /// Number of materialized nodes, root excluded.
    pub fn cached_nodes(&self) -> usize {
        self.shared.state.borrow().cache.len()
    }

    /// Check the position invariant and parent back-references.
    pub fn validate(&self) -> Result<()> {
        self.shared.state.borrow().cache.validate()?;
        Ok(())
    }

    /// Nested view of everything materialized.
    pub fn snapshot(&self) -> CacheSnapshot<S::Item> {
        let state = self.shared.state.borrow();
        let root = state.cache.root();
        state.cache.snapshot(root).unwrap_or(CacheSnapshot {
            item: None,
            loaded: false,
            children: Vec::new(),
        })
    }
}

impl<S: Source + 'static> Drop for TreeModel<S> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.shared.state.try_borrow_mut() {
            if let Some(pending) = state.pending.take() {
                tracing::trace!("cancelling deferred update on drop");
                pending.cancel();
            }
        }
    }
}

impl<S: Source + fmt::Debug + 'static> fmt::Debug for TreeModel<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("TreeModel");
        d.field("source", &self.shared.source)
            .field("config", &self.shared.config);
        if let Ok(state) = self.shared.state.try_borrow() {
            d.field("depth", &state.coalescer.depth())
                .field("cached_nodes", &state.cache.len());
        }
        d.finish()
    }
}
