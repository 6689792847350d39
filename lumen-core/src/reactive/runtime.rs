//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, memos, and
//! effects. It manages the dependency graph and schedules updates when
//! signals change.
//!
//! # How It Works
//!
//! 1. When a memo or effect is created, it registers with the runtime.
//!
//! 2. When a memo or effect reads a source (signal or memo), the runtime
//!    records the dependency in both directions.
//!
//! 3. When a source's value changes, the runtime:
//!    a. Marks its direct dependents "dirty"
//!    b. Marks everything further downstream "maybe dirty"
//!    c. Queues every effect it reached
//!
//!    Nothing recomputes during this pass.
//!
//! 4. Queued effects then pull: an effect that is only "maybe dirty" first
//!    brings the memos it read up to date, oldest source first, and runs only
//!    if one of them actually changed. A memo recomputes only after all of
//!    its own sources are current, so no computation sees a mix of old and
//!    new inputs.
//!
//! # Thread Safety
//!
//! The dependency index is global and lives in concurrent maps, so signals
//! can be shared across threads. The tracking context and the effect queue
//! are thread-local: effects run on the thread that performed the write.

use std::cell::RefCell;
use std::sync::{Arc, OnceLock, Weak};

use dashmap::DashMap;
use indexmap::IndexSet;
use smallvec::SmallVec;
use tracing::trace;

use super::context::ReactiveContext;
use super::memo::MemoState;
use super::scheduler;
use super::subscriber::{SourceId, SubscriberId};
use crate::config::RuntimeConfig;
use crate::error::ReactiveError;

/// A trait for types that can be notified when dependencies change.
pub trait Reactive: Send + Sync {
    /// Get the subscriber ID for this reactive value.
    fn subscriber_id(&self) -> SubscriberId;

    /// The source ID other computations track when they read this value.
    ///
    /// Only readable nodes (memos) have one.
    fn source_id(&self) -> Option<SourceId> {
        None
    }

    /// Raise the dirty state to at least `state`.
    ///
    /// Returns true when the value was clean before, i.e. its own
    /// dependents have not been marked yet.
    fn mark(&self, state: MemoState) -> bool;

    /// Bring a derived value up to date, recomputing only if a source
    /// actually changed.
    fn refresh(&self) {}

    /// Run this reactive value now (effects only).
    fn schedule(&self);

    /// Check if this reactive value is an effect (eager) or memo (lazy).
    fn is_eager(&self) -> bool;
}

/// Handle to a registered reactive value.
///
/// Dropping this handle unregisters the reactive value from the runtime.
pub struct ReactiveHandle {
    subscriber_id: SubscriberId,
    source_id: Option<SourceId>,
}

impl ReactiveHandle {
    pub fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }
}

impl Drop for ReactiveHandle {
    fn drop(&mut self) {
        Runtime::unregister(self.subscriber_id, self.source_id);
    }
}

/// The global reactive runtime.
///
/// This is a singleton that manages all reactive values in the application.
pub struct Runtime;

type Registry = DashMap<SubscriberId, Weak<dyn Reactive>>;

// Weak references so that the registry never keeps a node alive.
static REGISTRY: OnceLock<Registry> = OnceLock::new();
static SOURCE_SUBSCRIBERS: OnceLock<DashMap<SourceId, IndexSet<SubscriberId>>> = OnceLock::new();
static SUBSCRIBER_SOURCES: OnceLock<DashMap<SubscriberId, SmallVec<[SourceId; 4]>>> =
    OnceLock::new();
// Readable nodes, by the source ID their readers track.
static SOURCE_NODES: OnceLock<DashMap<SourceId, SubscriberId>> = OnceLock::new();

thread_local! {
    static CONFIG: RefCell<RuntimeConfig> = RefCell::new(RuntimeConfig::default());
}

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(DashMap::new)
}

fn source_subscribers() -> &'static DashMap<SourceId, IndexSet<SubscriberId>> {
    SOURCE_SUBSCRIBERS.get_or_init(DashMap::new)
}

fn subscriber_sources() -> &'static DashMap<SubscriberId, SmallVec<[SourceId; 4]>> {
    SUBSCRIBER_SOURCES.get_or_init(DashMap::new)
}

fn source_nodes() -> &'static DashMap<SourceId, SubscriberId> {
    SOURCE_NODES.get_or_init(DashMap::new)
}

impl Runtime {
    /// Register a reactive value with the runtime.
    ///
    /// Returns a handle that unregisters the value when dropped.
    pub fn register(reactive: Arc<dyn Reactive>) -> ReactiveHandle {
        let id = reactive.subscriber_id();
        let source_id = reactive.source_id();
        registry().insert(id, Arc::downgrade(&reactive));
        if let Some(source_id) = source_id {
            source_nodes().insert(source_id, id);
        }
        ReactiveHandle {
            subscriber_id: id,
            source_id,
        }
    }

    /// Unregister a reactive value.
    fn unregister(id: SubscriberId, source_id: Option<SourceId>) {
        registry().remove(&id);
        if let Some(source_id) = source_id {
            source_nodes().remove(&source_id);
        }
        Self::clear_dependencies(id);
    }

    /// Look up a live reactive value by subscriber ID.
    pub(crate) fn lookup(id: SubscriberId) -> Option<Arc<dyn Reactive>> {
        registry().get(&id).and_then(|entry| entry.value().upgrade())
    }

    /// Check whether a subscriber is still registered.
    pub fn is_registered(id: SubscriberId) -> bool {
        registry().contains_key(&id)
    }

    /// Record that a subscriber depends on a source.
    ///
    /// Called automatically when a source is read within a reactive context.
    pub fn add_dependency(source_id: SourceId, subscriber_id: SubscriberId) {
        source_subscribers()
            .entry(source_id)
            .or_default()
            .insert(subscriber_id);

        let mut sources = subscriber_sources().entry(subscriber_id).or_default();
        if !sources.contains(&source_id) {
            sources.push(source_id);
        }
    }

    /// Remove all dependencies for a subscriber.
    ///
    /// Called before re-running a computation to clear stale dependencies.
    pub fn clear_dependencies(subscriber_id: SubscriberId) {
        let Some((_, sources)) = subscriber_sources().remove(&subscriber_id) else {
            return;
        };

        for source_id in sources {
            if let Some(mut subscribers) = source_subscribers().get_mut(&source_id) {
                subscribers.shift_remove(&subscriber_id);
            }
        }
    }

    /// Forget a source that has been dropped.
    pub(crate) fn remove_source(source_id: SourceId) {
        source_subscribers().remove(&source_id);
        source_nodes().remove(&source_id);
    }

    /// Number of subscribers currently depending on a source.
    pub fn subscriber_count(source_id: SourceId) -> usize {
        source_subscribers()
            .get(&source_id)
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }

    /// Whether anything currently depends on a source.
    pub fn has_subscribers(source_id: SourceId) -> bool {
        Self::subscriber_count(source_id) > 0
    }

    /// Notify all subscribers that a source changed.
    ///
    /// This is the core update propagation mechanism. Effects queued while
    /// propagating run once propagation is complete, unless an enclosing
    /// [`batch`](super::batch) is still open.
    pub fn notify_source_change(source_id: SourceId) {
        scheduler::batch(|| Self::mark_subscribers(source_id, MemoState::Dirty));
    }

    fn mark_subscribers(source_id: SourceId, state: MemoState) {
        // Copy the subscriber list so no map guard is held while nodes run.
        let subscriber_ids: Vec<SubscriberId> = source_subscribers()
            .get(&source_id)
            .map(|subscribers| subscribers.iter().copied().collect())
            .unwrap_or_default();

        if subscriber_ids.is_empty() {
            return;
        }

        if Self::config().trace_propagation {
            trace!(source = %source_id, subscribers = subscriber_ids.len(), ?state, "marking subscribers");
        }

        for sub_id in subscriber_ids {
            let Some(reactive) = Self::lookup(sub_id) else {
                continue;
            };

            // Already marked nodes have already marked their dependents.
            if !reactive.mark(state) {
                continue;
            }

            if reactive.is_eager() {
                scheduler::enqueue(sub_id);
            } else if let Some(next) = reactive.source_id() {
                Self::mark_subscribers(next, MemoState::MaybeDirty);
            }
        }
    }

    /// Bring a source up to date before deciding whether a reader is stale.
    ///
    /// Signals are always current; memos recompute if one of their own
    /// sources changed.
    pub(crate) fn refresh_source(source_id: SourceId) {
        let Some(node_id) = source_nodes().get(&source_id).map(|entry| *entry.value()) else {
            return;
        };
        if let Some(node) = Self::lookup(node_id) {
            node.refresh();
        }
    }

    /// Get the current subscriber being tracked, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        ReactiveContext::current_subscriber()
    }

    /// Check if we're inside a reactive context.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }

    /// Install a configuration for the current thread.
    pub fn configure(config: RuntimeConfig) {
        CONFIG.with(|current| *current.borrow_mut() = config);
    }

    /// The configuration in effect on the current thread.
    pub fn config() -> RuntimeConfig {
        CONFIG.with(|current| current.borrow().clone())
    }

    /// Take the last scheduler error raised on the current thread.
    pub fn take_error() -> Option<ReactiveError> {
        scheduler::take_error()
    }
}
