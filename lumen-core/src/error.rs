//! Error types for the reactive runtime.

use thiserror::Error;

use crate::reactive::SubscriberId;

/// Errors raised by the reactive runtime.
///
/// Signal writes never fail. Scheduler errors happen while effects are being
/// flushed; they are logged and retained until [`Runtime::take_error`] is
/// called.
///
/// [`Runtime::take_error`]: crate::reactive::Runtime::take_error
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// An effect kept re-triggering itself within a single flush.
    #[error("effect {subscriber} re-ran {runs} times in one flush; likely a write cycle")]
    CycleDetected { subscriber: SubscriberId, runs: usize },

    /// The flush loop ran more effects than allowed.
    #[error("effect flush exceeded {limit} iterations")]
    FlushLimitExceeded { limit: usize },

    /// A runtime configuration document could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;
