//! Memo Implementation
//!
//! A Memo is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Memos Work
//!
//! 1. On first access, the memo runs its computation and caches the result.
//!
//! 2. When accessed again, if no dependencies have changed, returns cached value.
//!
//! 3. When a signal it read changes, the memo is marked "dirty". Memos
//!    further downstream are marked "maybe dirty". Nothing recomputes yet.
//!
//! 4. On the next read (by a caller, or by an effect deciding whether to
//!    run), a "maybe dirty" memo first refreshes the memos it read. It
//!    recomputes only if one of them produced a different value, and only
//!    after all of them are current.
//!
//! 5. A memo whose new value equals the cached one does not dirty its
//!    dependents. Effects downstream of an unchanged memo do not re-run.
//!
//! # Why This Matters
//!
//! This "lazy" approach avoids unnecessary recomputation:
//!
//! - A signal changes
//! - 10 memos depend on it
//! - Only the memos that are read (directly or by a live effect) recompute
//! - Memos that are never read stay dirty (no wasted work)

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::ReactiveContext;
use super::runtime::{Reactive, ReactiveHandle, Runtime};
use super::signal::track_read;
use super::subscriber::{SourceId, SubscriberId};

/// Dirty state of a memo or effect, ordered from clean to dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MemoState {
    /// The cached value is up-to-date.
    Clean,

    /// A dependency might have changed. Need to check.
    MaybeDirty,

    /// The memo definitely needs to recompute.
    Dirty,
}

struct MemoInner<T> {
    id: SourceId,
    subscriber_id: SubscriberId,
    compute: Box<dyn Fn() -> T + Send + Sync>,
    /// `None` until the first computation.
    value: RwLock<Option<T>>,
    state: RwLock<MemoState>,
    dependencies: RwLock<Vec<SourceId>>,
}

impl<T> MemoInner<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    fn get_untracked(&self) -> T {
        self.update_if_necessary();
        if let Some(value) = self.value.read().clone() {
            return value;
        }
        self.recompute()
    }

    fn update_if_necessary(&self) {
        if *self.state.read() == MemoState::MaybeDirty {
            let sources = self.dependencies.read().clone();
            for source in sources {
                Runtime::refresh_source(source);
                // A source changed value and marked us dirty.
                if *self.state.read() == MemoState::Dirty {
                    break;
                }
            }
        }

        if *self.state.read() == MemoState::Dirty || self.value.read().is_none() {
            self.recompute();
            return;
        }

        let mut state = self.state.write();
        if *state == MemoState::MaybeDirty {
            *state = MemoState::Clean;
        }
    }

    /// Run the computation in a fresh tracking context.
    ///
    /// Dependents are marked dirty when the value differs from the cached
    /// one. The first computation marks nobody.
    fn recompute(&self) -> T {
        Runtime::clear_dependencies(self.subscriber_id);

        let new_value = {
            let _ctx = ReactiveContext::enter(self.subscriber_id);
            let value = (self.compute)();
            *self.dependencies.write() = ReactiveContext::get_dependencies();
            value
        };

        let changed = {
            let mut slot = self.value.write();
            let changed = matches!(slot.as_ref(), Some(old) if *old != new_value);
            *slot = Some(new_value.clone());
            changed
        };

        *self.state.write() = MemoState::Clean;

        if changed {
            Runtime::notify_source_change(self.id);
        }

        new_value
    }
}

impl<T> Reactive for MemoInner<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    fn source_id(&self) -> Option<SourceId> {
        Some(self.id)
    }

    fn mark(&self, state: MemoState) -> bool {
        let mut current = self.state.write();
        let was_clean = *current == MemoState::Clean;
        if state > *current {
            *current = state;
        }
        was_clean
    }

    fn refresh(&self) {
        self.update_if_necessary();
    }

    fn schedule(&self) {}

    fn is_eager(&self) -> bool {
        false
    }
}

impl<T> Drop for MemoInner<T> {
    fn drop(&mut self) {
        Runtime::remove_source(self.id);
    }
}

/// A cached derived value that recomputes only when dependencies change.
///
/// # Type Parameters
///
/// - `T`: The type of the computed value. Must be Clone + Send + Sync + PartialEq.
///
/// The PartialEq bound is needed to detect when the computed value actually
/// changed (some memos might return the same value even if inputs changed).
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(2);
/// let doubled = {
///     let count = count.clone();
///     Memo::new(move || count.get() * 2)
/// };
///
/// assert_eq!(doubled.get(), 4);
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Memo<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    inner: Arc<MemoInner<T>>,
    handle: Arc<ReactiveHandle>,
}

impl<T> Memo<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    /// Create a new memo with the given computation function.
    ///
    /// The computation is not run immediately. It runs on first access.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let inner = Arc::new(MemoInner {
            id: SourceId::new(),
            subscriber_id: SubscriberId::new(),
            compute: Box::new(compute),
            value: RwLock::new(None),
            state: RwLock::new(MemoState::Dirty),
            dependencies: RwLock::new(Vec::new()),
        });

        let handle = Runtime::register(inner.clone());

        Self {
            inner,
            handle: Arc::new(handle),
        }
    }

    /// Get the memo's unique ID as a readable source.
    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    /// Get the subscriber ID for this memo.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.handle.subscriber_id()
    }

    /// Get the current value, recomputing if necessary.
    ///
    /// If called within a reactive context, the current computation
    /// subscribes to this memo. The subscription is recorded after the value
    /// is brought up to date, so a reader is never dirtied by its own read.
    pub fn get(&self) -> T {
        let value = self.inner.get_untracked();
        track_read(self.inner.id);
        value
    }

    /// Get the current value without tracking the read.
    pub fn get_untracked(&self) -> T {
        self.inner.get_untracked()
    }

    /// Mark the memo as potentially needing recomputation.
    pub fn mark_maybe_dirty(&self) {
        let mut state = self.inner.state.write();
        if *state == MemoState::Clean {
            *state = MemoState::MaybeDirty;
        }
    }

    /// Mark the memo as definitely needing recomputation.
    ///
    /// Dependents are not told; they see the new value on their next read.
    pub fn mark_dirty(&self) {
        *self.inner.state.write() = MemoState::Dirty;
    }

    /// Get the current dirty state.
    pub fn state(&self) -> MemoState {
        *self.inner.state.read()
    }

    /// Get the number of dependents.
    pub fn dependent_count(&self) -> usize {
        Runtime::subscriber_count(self.inner.id)
    }

    /// Get the number of sources read during the last computation.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.read().len()
    }

    /// Check if the memo has a cached value.
    pub fn has_value(&self) -> bool {
        self.inner.value.read().is_some()
    }
}

impl<T> Clone for Memo<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            handle: Arc::clone(&self.handle),
        }
    }
}

impl<T> Debug for Memo<T>
where
    T: Clone + Send + Sync + PartialEq + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .field("has_value", &self.has_value())
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
