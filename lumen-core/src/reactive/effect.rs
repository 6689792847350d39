//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency changes, the effect is queued and re-runs once the
//!    write that triggered it has finished propagating. An effect that only
//!    reads memos first refreshes them and stays put if none changed.
//!
//! 3. Before re-running, the effect clears its old dependencies and tracks
//!    new ones during execution. Dependencies are therefore dynamic: a
//!    branch that stops reading a signal stops subscribing to it.
//!
//! # Writes Inside Effects
//!
//! An effect body runs inside a batch. Effects triggered by its writes run
//! after the body returns, never nested inside it.
//!
//! # Lifetime
//!
//! Clones share one registration. The effect stops running when
//! [`Effect::dispose`] is called or when the last clone is dropped.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::context::ReactiveContext;
use super::memo::MemoState;
use super::runtime::{Reactive, ReactiveHandle, Runtime};
use super::scheduler;
use super::subscriber::{SourceId, SubscriberId};

/// Counter for generating unique effect IDs.
static EFFECT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_effect_id() -> u64 {
    EFFECT_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

struct EffectInner {
    id: u64,
    subscriber_id: SubscriberId,
    run: Box<dyn Fn() + Send + Sync>,
    /// Sources read during the last run.
    dependencies: RwLock<Vec<SourceId>>,
    state: RwLock<MemoState>,
    disposed: AtomicBool,
    run_count: AtomicUsize,
}

impl EffectInner {
    fn execute(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        // Clean before the body runs, so a write made by the body marks
        // the effect again.
        *self.state.write() = MemoState::Clean;

        scheduler::batch(|| {
            Runtime::clear_dependencies(self.subscriber_id);

            let _ctx = ReactiveContext::enter(self.subscriber_id);
            (self.run)();

            *self.dependencies.write() = ReactiveContext::get_dependencies();
            self.run_count.fetch_add(1, Ordering::SeqCst);
        });
    }
}

impl Reactive for EffectInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    fn mark(&self, state: MemoState) -> bool {
        if self.disposed.load(Ordering::SeqCst) {
            return false;
        }
        let mut current = self.state.write();
        let was_clean = *current == MemoState::Clean;
        if state > *current {
            *current = state;
        }
        was_clean
    }

    fn schedule(&self) {
        if *self.state.read() == MemoState::MaybeDirty {
            let sources = self.dependencies.read().clone();
            for source in sources {
                Runtime::refresh_source(source);
                if *self.state.read() == MemoState::Dirty {
                    break;
                }
            }

            let mut state = self.state.write();
            if *state == MemoState::MaybeDirty {
                // Every memo it read came out unchanged.
                *state = MemoState::Clean;
                return;
            }
        }
        self.execute();
    }

    fn is_eager(&self) -> bool {
        true
    }
}

/// A side-effecting computation that runs when dependencies change.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// let effect = {
///     let count = count.clone();
///     Effect::new(move || println!("Count is: {}", count.get()))
/// };
///
/// count.set(5);  // Prints: "Count is: 5"
/// ```
pub struct Effect {
    inner: Arc<EffectInner>,
    handle: Arc<ReactiveHandle>,
}

impl Effect {
    /// Create a new effect with the given function.
    ///
    /// The function runs immediately to establish initial dependencies.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect = Self::new_lazy(run);
        effect.execute();
        effect
    }

    /// Create a new effect without running it immediately.
    ///
    /// It has no dependencies until [`execute`](Self::execute) is called.
    pub fn new_lazy<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let inner = Arc::new(EffectInner {
            id: next_effect_id(),
            subscriber_id: SubscriberId::new(),
            run: Box::new(run),
            dependencies: RwLock::new(Vec::new()),
            state: RwLock::new(MemoState::Clean),
            disposed: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        });

        let handle = Runtime::register(inner.clone());
        debug!(effect = inner.id, subscriber = %inner.subscriber_id, "effect created");

        Self {
            inner,
            handle: Arc::new(handle),
        }
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Get the subscriber ID for this effect.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.handle.subscriber_id()
    }

    /// Execute the effect function.
    ///
    /// This runs the function within a reactive context to track dependencies.
    pub fn execute(&self) {
        self.inner.execute();
    }

    /// Schedule the effect to re-run.
    ///
    /// Outside a batch this runs the effect before returning; inside one it
    /// runs when the outermost batch closes.
    pub fn schedule(&self) {
        if !self.is_disposed() {
            scheduler::batch(|| scheduler::enqueue(self.inner.subscriber_id));
        }
    }

    /// Dispose of the effect.
    ///
    /// After disposal, the effect will not run again.
    pub fn dispose(&self) {
        if !self.inner.disposed.swap(true, Ordering::SeqCst) {
            Runtime::clear_dependencies(self.inner.subscriber_id);
            debug!(effect = self.inner.id, "effect disposed");
        }
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Get the number of dependencies.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.read().len()
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            handle: Arc::clone(&self.handle),
        }
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
