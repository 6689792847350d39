//! Flight Search
//!
//! A small application built on the reactive primitives, showing the
//! common ways of arranging state around signals:
//!
//! - [`FlightSearchFacade`]: all state in one signal owned by a service,
//!   exposed read-only, with validated writes and async loading.
//! - [`FlightSearchForm`]: many small signals in a component, combined both
//!   by a syncing effect and by a memo.
//! - [`FlightBoard`]: signals nested inside a signal.

mod api;
mod board;
mod error;
mod facade;
mod form;
mod model;

pub use api::{FlightSearchApi, InMemoryFlightApi};
pub use board::{FlightBoard, FlightRow};
pub use error::{ApiError, FlightError};
pub use facade::{FlightSearchFacade, SearchOutcome};
pub use form::FlightSearchForm;
pub use model::{
    AirportCode, Flight, FlightId, FlightSearchState, SearchCriteria, SearchStatus, StatePatch,
};
