//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a signal is read,
//! we can register the current computation as a dependent.
//!
//! # Implementation
//!
//! We use a thread-local stack to track the currently executing computation.
//! When entering a reactive context (e.g., running a memo or effect), we push
//! the subscriber onto the stack. When the computation completes, we pop it.
//!
//! This design supports nested reactive contexts (e.g., a memo that reads
//! from another memo).

use std::cell::RefCell;

use smallvec::SmallVec;

use super::{SourceId, SubscriberId};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the reactive context stack.
#[derive(Debug, Clone)]
struct ContextEntry {
    /// The subscriber ID of the current computation.
    subscriber_id: SubscriberId,
    /// Sources read during this computation, in first-read order.
    dependencies: SmallVec<[SourceId; 4]>,
}

/// Guard that pops the context when dropped.
///
/// This ensures the context stack is properly maintained even if
/// the computation panics.
pub struct ReactiveContext {
    subscriber_id: SubscriberId,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given subscriber.
    ///
    /// While this context is active, any signals that are read will
    /// register the subscriber as a dependent.
    ///
    /// The context is automatically exited when the returned guard is dropped.
    pub fn enter(subscriber_id: SubscriberId) -> Self {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                subscriber_id,
                dependencies: SmallVec::new(),
            });
        });

        Self { subscriber_id }
    }

    /// Check if there is an active reactive context.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// Get the current subscriber ID, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().map(|entry| entry.subscriber_id))
    }

    /// Record a dependency on the given source.
    ///
    /// Repeated reads of the same source are recorded once.
    pub fn track_dependency(source_id: SourceId) {
        CONTEXT_STACK.with(|stack| {
            if let Some(entry) = stack.borrow_mut().last_mut() {
                if !entry.dependencies.contains(&source_id) {
                    entry.dependencies.push(source_id);
                }
            }
        });
    }

    /// Get the dependencies collected in the current context.
    pub fn get_dependencies() -> Vec<SourceId> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|entry| entry.dependencies.to_vec())
                .unwrap_or_default()
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.subscriber_id, self.subscriber_id,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.subscriber_id, entry.subscriber_id
                );
            }
        });
    }
}

/// Restores the stashed context stack on drop, including during unwinding.
struct UntrackGuard {
    stashed: Option<Vec<ContextEntry>>,
}

impl Drop for UntrackGuard {
    fn drop(&mut self) {
        if let Some(stashed) = self.stashed.take() {
            CONTEXT_STACK.with(|stack| *stack.borrow_mut() = stashed);
        }
    }
}

/// Run `f` without any active tracking context.
///
/// Reads inside `f` do not subscribe the surrounding memo or effect.
///
/// ```rust,ignore
/// let a = Signal::new(1);
/// let b = Signal::new(2);
///
/// // Re-runs when `a` changes, but not when `b` changes.
/// let _effect = Effect::new(move || {
///     let _ = a.get() + untrack(|| b.get());
/// });
/// ```
pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
    let stashed = CONTEXT_STACK.with(|stack| std::mem::take(&mut *stack.borrow_mut()));
    let _guard = UntrackGuard {
        stashed: Some(stashed),
    };
    f()
}
