use thiserror::Error;

use super::model::{AirportCode, FlightId};

/// Failures reported by a flight search backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("search backend unavailable: {0}")]
    Unavailable(String),

    #[error("search backend timed out")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum FlightError {
    #[error("invalid airport code {0:?}: expected three letters")]
    InvalidAirport(String),

    #[error("origin and destination are both {0}")]
    SameOriginAndDestination(AirportCode),

    #[error("origin and destination are required to search")]
    MissingCriteria,

    #[error("flight {0} is not in the current results")]
    UnknownFlight(FlightId),

    #[error("invalid state patch: {0}")]
    InvalidPatch(#[source] serde_json::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("failed to decode snapshot: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}
