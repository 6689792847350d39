//! Lumen Core
//!
//! This crate provides fine-grained reactive state for applications.
//! It implements:
//!
//! - Reactive primitives (signals, read-only views, memos, effects)
//! - Automatic dependency tracking and batched effect scheduling
//! - A flight search application showing how state is arranged around them
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Core reactive primitives and dependency tracking
//! - `config`: Scheduler limits, installed per thread
//! - `error`: Runtime error type
//! - `flights`: Facade, form and nested-signal examples over one domain
//!
//! # Example
//!
//! ```rust,ignore
//! use lumen_core::reactive::{Effect, Memo, Signal};
//!
//! // Create a signal
//! let count = Signal::new(0);
//!
//! // Create a derived value
//! let doubled = {
//!     let count = count.clone();
//!     Memo::new(move || count.get() * 2)
//! };
//!
//! // Create an effect
//! let _effect = {
//!     let (count, doubled) = (count.clone(), doubled.clone());
//!     Effect::new(move || {
//!         println!("Count: {}, Doubled: {}", count.get(), doubled.get());
//!     })
//! };
//!
//! // Update the signal
//! count.set(5);
//! // Effect automatically runs, prints: "Count: 5, Doubled: 10"
//! ```

pub mod config;
pub mod error;
pub mod flights;
pub mod reactive;

pub use config::RuntimeConfig;
pub use error::ReactiveError;
