//! Read-only view of a signal.
//!
//! A `ReadSignal` shares the cell of the `Signal` it was created from and
//! sees every write to it, but offers no way to write. There is no
//! conversion back to `Signal`: the underlying cell is private and never
//! handed out, so a holder of a `ReadSignal` cannot mutate the value.

use std::fmt::Debug;
use std::sync::Arc;

use super::runtime::Runtime;
use super::signal::{track_read, Signal, SignalInner};
use super::SourceId;

/// A read-only handle to a signal's value.
pub struct ReadSignal<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<SignalInner<T>>,
}

impl<T> ReadSignal<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(inner: Arc<SignalInner<T>>) -> Self {
        Self { inner }
    }

    /// The ID of the underlying signal.
    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    /// Get the current value, tracking the read.
    pub fn get(&self) -> T {
        track_read(self.inner.id);
        self.inner.value.read().clone()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Borrow the current value, tracking the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        track_read(self.inner.id);
        f(&self.inner.value.read())
    }

    /// Borrow the current value without tracking the read.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    pub fn subscriber_count(&self) -> usize {
        Runtime::subscriber_count(self.inner.id)
    }
}

impl<T> From<Signal<T>> for ReadSignal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn from(signal: Signal<T>) -> Self {
        signal.read_only()
    }
}

impl<T> Clone for ReadSignal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for ReadSignal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadSignal")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.read())
            .finish()
    }
}
