//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a reactive context (memo/effect), the
//!    signal registers that context as a subscriber.
//!
//! 2. When a signal's value changes, all subscribers are notified.
//!
//! 3. Notifications trigger re-execution of dependent computations.
//!
//! # Atomicity
//!
//! The value is protected by a `RwLock`. Every write holds the write lock
//! for the whole mutation and notifies only after releasing it, so readers
//! see either the old value or the new one.
//!
//! Locks are not re-entrant: reading a signal from inside its own `update`
//! or `with` closure deadlocks.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::ReactiveContext;
use super::read_signal::ReadSignal;
use super::runtime::Runtime;
use super::SourceId;

pub(crate) struct SignalInner<T> {
    pub(crate) id: SourceId,
    pub(crate) value: RwLock<T>,
}

impl<T> Drop for SignalInner<T> {
    fn drop(&mut self) {
        Runtime::remove_source(self.id);
    }
}

/// A reactive signal holding a value of type T.
///
/// Clones share the same cell.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// // Read the value
/// let value = count.get();
///
/// // Update the value (notifies subscribers)
/// count.set(5);
/// count.update(|n| *n += 1);
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) inner: Arc<SignalInner<T>>,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                id: SourceId::new(),
                value: RwLock::new(value),
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    /// Get the current value.
    ///
    /// If called within a reactive context, this also registers the
    /// current computation as a subscriber.
    pub fn get(&self) -> T {
        self.track();
        self.inner.value.read().clone()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Borrow the current value, tracking the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.value.read())
    }

    /// Borrow the current value without tracking the read.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    /// Set a new value and notify subscribers.
    pub fn set(&self, value: T) {
        *self.inner.value.write() = value;
        self.notify();
    }

    /// Mutate the value in place and notify subscribers.
    ///
    /// Readers on other threads wait until `f` has returned.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        {
            let mut guard = self.inner.value.write();
            f(&mut guard);
        }
        self.notify();
    }

    /// Apply a fallible transform.
    ///
    /// `f` runs on a copy of the current value. The copy is committed, and
    /// subscribers notified, only when `f` returns `Ok`. On `Err` the signal
    /// keeps its previous value and nobody is notified.
    pub fn try_update<R, E>(&self, f: impl FnOnce(&mut T) -> Result<R, E>) -> Result<R, E> {
        let output = {
            let mut guard = self.inner.value.write();
            let mut draft = guard.clone();
            let output = f(&mut draft)?;
            *guard = draft;
            output
        };
        self.notify();
        Ok(output)
    }

    /// Create a read-only view sharing this signal's cell.
    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal::new(Arc::clone(&self.inner))
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        Runtime::subscriber_count(self.inner.id)
    }

    fn track(&self) {
        track_read(self.inner.id);
    }

    fn notify(&self) {
        Runtime::notify_source_change(self.inner.id);
    }
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    /// Set a new value, notifying subscribers only if it differs from the
    /// current one. Returns whether the value changed.
    pub fn set_if_changed(&self, value: T) -> bool {
        {
            let mut guard = self.inner.value.write();
            if *guard == value {
                return false;
            }
            *guard = value;
        }
        self.notify();
        true
    }
}

/// Register the current computation, if any, as a dependent of `source_id`.
pub(crate) fn track_read(source_id: SourceId) {
    if let Some(subscriber_id) = ReactiveContext::current_subscriber() {
        ReactiveContext::track_dependency(source_id);
        Runtime::add_dependency(source_id, subscriber_id);
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Signal<T>
where
    T: Clone + Send + Sync + Default + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> PartialEq for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Signals are equal when they share a cell.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.read())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Effect;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn signal_get_and_set() {
        let signal = Signal::new(0);
        assert_eq!(signal.get(), 0);

        signal.set(42);
        assert_eq!(signal.get(), 42);
    }

    #[test]
    fn signal_update_in_place() {
        let signal = Signal::new(vec![1, 2]);
        signal.update(|v| v.push(3));
        assert_eq!(signal.get(), vec![1, 2, 3]);
    }

    #[test]
    fn try_update_commits_on_ok() {
        let signal = Signal::new(10);
        let result: Result<i32, &str> = signal.try_update(|v| {
            *v += 5;
            Ok(*v)
        });
        assert_eq!(result, Ok(15));
        assert_eq!(signal.get(), 15);
    }

    #[test]
    fn try_update_rolls_back_on_err() {
        let signal = Signal::new(vec![1]);
        let runs = Arc::new(AtomicI32::new(0));

        let watched = signal.clone();
        let counter = runs.clone();
        let _effect = Effect::new(move || {
            watched.with(|_| ());
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let result: Result<(), String> = signal.try_update(|v| {
            v.push(2);
            Err("rejected".to_string())
        });

        assert!(result.is_err());
        assert_eq!(signal.get(), vec![1]);
        // Only the initial run.
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn set_if_changed_skips_equal_values() {
        let signal = Signal::new("a".to_string());
        let runs = Arc::new(AtomicI32::new(0));

        let watched = signal.clone();
        let counter = runs.clone();
        let _effect = Effect::new(move || {
            let _ = watched.get();
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!signal.set_if_changed("a".to_string()));
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        assert!(signal.set_if_changed("b".to_string()));
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn signal_clone_shares_state() {
        let signal1 = Signal::new(0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get(), 42);

        signal2.set(100);
        assert_eq!(signal1.get(), 100);
        assert_eq!(signal1, signal2);
    }

    #[test]
    fn signal_ids_are_unique() {
        let s1 = Signal::new(0);
        let s2 = Signal::new(0);
        let s3 = Signal::new(0);

        assert_ne!(s1.id(), s2.id());
        assert_ne!(s2.id(), s3.id());
        assert_ne!(s1.id(), s3.id());
        assert_ne!(s1, s2);
    }

    #[test]
    fn reads_outside_a_context_do_not_subscribe() {
        let signal = Signal::new(1);
        let _ = signal.get();
        signal.with(|_| ());
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let signal = Signal::new(0u32);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let signal = signal.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        signal.update(|n| *n += 1);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(signal.get(), 1000);
    }
}
