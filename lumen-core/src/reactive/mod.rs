//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, memos, and effects.
//! These primitives form the foundation of Lumen's fine-grained reactivity.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking context (such as a memo or effect), the signal automatically
//! registers that context as a dependent. When the signal's value changes, all
//! dependents are notified.
//!
//! A [`ReadSignal`] is a read-only view of a signal. It cannot be turned back
//! into a writable signal.
//!
//! ## Memos
//!
//! A Memo is a derived value that caches its result. It re-evaluates only when
//! one of its dependencies changes, and only notifies its own dependents when
//! the result is different.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever its dependencies
//! change. Effects are used to synchronize reactive state with external systems,
//! such as updating a view or logging.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local tracking context to automatically
//! detect dependencies. When a signal is read, we check if there is an active
//! tracking context and, if so, register the dependency.
//!
//! Effects triggered by a write are queued and run after the write has
//! propagated through the graph. [`batch`] widens that window to several
//! writes.

mod context;
mod effect;
mod memo;
mod read_signal;
mod runtime;
mod scheduler;
mod signal;
mod subscriber;

pub use context::{untrack, ReactiveContext};
pub use effect::Effect;
pub use memo::{Memo, MemoState};
pub use read_signal::ReadSignal;
pub use runtime::{Reactive, ReactiveHandle, Runtime};
pub use scheduler::{batch, is_batching};
pub use signal::Signal;
pub use subscriber::{SourceId, SubscriberId};
