//! Effect Scheduler
//!
//! Effects do not run in the middle of a propagation pass. They are queued
//! here and drained once the outermost batch closes.
//!
//! # Algorithm
//!
//! 1. A write propagates through the graph and enqueues every eager
//!    subscriber it reaches. The queue is an ordered set, so an effect that
//!    is reached twice is queued once.
//! 2. When the outermost batch closes, the queue is drained front to back.
//! 3. Writes made by a running effect enqueue more work at the back of the
//!    queue; they never start a nested flush.
//! 4. The flush stops with an error when it runs out of budget (see
//!    [`RuntimeConfig`](crate::config::RuntimeConfig)).

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use indexmap::IndexSet;
use tracing::error;

use super::runtime::Runtime;
use super::subscriber::SubscriberId;
use crate::error::ReactiveError;

thread_local! {
    static BATCH_DEPTH: Cell<usize> = const { Cell::new(0) };
    static FLUSHING: Cell<bool> = const { Cell::new(false) };
    static PENDING: RefCell<IndexSet<SubscriberId>> = RefCell::new(IndexSet::new());
    static LAST_ERROR: RefCell<Option<ReactiveError>> = const { RefCell::new(None) };
}

/// Closes a batch on drop so a panicking closure does not leave the
/// thread stuck in batching mode.
struct BatchGuard;

impl Drop for BatchGuard {
    fn drop(&mut self) {
        BATCH_DEPTH.with(|depth| depth.set(depth.get() - 1));
    }
}

struct FlushGuard;

impl Drop for FlushGuard {
    fn drop(&mut self) {
        FLUSHING.with(|flushing| flushing.set(false));
    }
}

/// Run `f` with effect execution deferred.
///
/// Effects triggered by writes inside `f` run once each, after the
/// outermost batch returns.
///
/// ```rust,ignore
/// let first = Signal::new("Ada".to_string());
/// let last = Signal::new("Lovelace".to_string());
///
/// batch(|| {
///     first.set("Grace".into());
///     last.set("Hopper".into());
/// });
/// // Effects reading both names ran once, seeing "Grace Hopper".
/// ```
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    let result = {
        BATCH_DEPTH.with(|depth| depth.set(depth.get() + 1));
        let _guard = BatchGuard;
        f()
    };

    if let Err(err) = flush() {
        error!(error = %err, "effect flush aborted");
        LAST_ERROR.with(|last| *last.borrow_mut() = Some(err));
    }

    result
}

/// Whether a batch is open on this thread.
pub fn is_batching() -> bool {
    BATCH_DEPTH.with(|depth| depth.get() > 0)
}

pub(crate) fn enqueue(id: SubscriberId) {
    PENDING.with(|pending| {
        pending.borrow_mut().insert(id);
    });
}

pub(crate) fn take_error() -> Option<ReactiveError> {
    LAST_ERROR.with(|last| last.borrow_mut().take())
}

fn clear_pending() {
    PENDING.with(|pending| pending.borrow_mut().clear());
}

fn next_pending() -> Option<SubscriberId> {
    PENDING.with(|pending| pending.borrow_mut().shift_remove_index(0))
}

/// Drain the queue, unless a batch is open or a flush is already running
/// further up the stack.
fn flush() -> Result<(), ReactiveError> {
    if is_batching() || FLUSHING.with(Cell::get) {
        return Ok(());
    }

    FLUSHING.with(|flushing| flushing.set(true));
    let _guard = FlushGuard;

    let config = Runtime::config();
    let mut iterations = 0usize;
    let mut runs: HashMap<SubscriberId, usize> = HashMap::new();

    while let Some(id) = next_pending() {
        iterations += 1;
        if iterations > config.max_flush_iterations {
            clear_pending();
            return Err(ReactiveError::FlushLimitExceeded {
                limit: config.max_flush_iterations,
            });
        }

        let count = runs.entry(id).or_default();
        *count += 1;
        if *count > config.max_effect_reruns {
            clear_pending();
            return Err(ReactiveError::CycleDetected {
                subscriber: id,
                runs: *count - 1,
            });
        }

        // Effects dropped after being queued are skipped.
        if let Some(reactive) = Runtime::lookup(id) {
            reactive.schedule();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_returns_closure_value() {
        assert_eq!(batch(|| 41 + 1), 42);
        assert!(!is_batching());
    }

    #[test]
    fn nested_batches_track_depth() {
        batch(|| {
            assert!(is_batching());
            batch(|| assert!(is_batching()));
            assert!(is_batching());
        });
        assert!(!is_batching());
    }

    #[test]
    fn queue_deduplicates() {
        let id = SubscriberId::new();
        batch(|| {
            enqueue(id);
            enqueue(id);
            assert_eq!(PENDING.with(|p| p.borrow().len()), 1);
        });
        // Unregistered ids are dropped during the flush.
        assert_eq!(PENDING.with(|p| p.borrow().len()), 0);
    }

    #[test]
    fn panicking_batch_restores_depth() {
        let result = std::panic::catch_unwind(|| batch(|| panic!("boom")));
        assert!(result.is_err());
        assert!(!is_batching());
    }
}
