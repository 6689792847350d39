//! Search backends.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use super::error::ApiError;
use super::model::{Flight, SearchCriteria};

/// An asynchronous flight search backend.
pub trait FlightSearchApi: Send + Sync {
    fn search(
        &self,
        criteria: &SearchCriteria,
    ) -> impl Future<Output = Result<Vec<Flight>, ApiError>> + Send;
}

/// A backend serving a fixed timetable from memory.
///
/// Urgent searches only return flights that still have seats, sorted by
/// price. Latency and failures can be injected for tests.
#[derive(Debug, Default)]
pub struct InMemoryFlightApi {
    timetable: Vec<Flight>,
    latency: Option<Duration>,
    /// Errors returned, in order, by the next searches.
    failures: Mutex<Vec<ApiError>>,
}

impl InMemoryFlightApi {
    pub fn new(timetable: Vec<Flight>) -> Self {
        Self {
            timetable,
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make the next search fail with `error`.
    pub fn fail_next(&self, error: ApiError) {
        self.failures.lock().push(error);
    }

    fn lookup(&self, criteria: &SearchCriteria) -> Vec<Flight> {
        let mut flights: Vec<Flight> = self
            .timetable
            .iter()
            .filter(|flight| criteria.matches(flight))
            .filter(|flight| !criteria.urgent || flight.seats_left > 0)
            .cloned()
            .collect();

        if criteria.urgent {
            flights.sort_by_key(|flight| flight.price_cents);
        }
        flights
    }
}

impl FlightSearchApi for InMemoryFlightApi {
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Flight>, ApiError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let failure = {
            let mut failures = self.failures.lock();
            (!failures.is_empty()).then(|| failures.remove(0))
        };
        if let Some(error) = failure {
            return Err(error);
        }

        let flights = self.lookup(criteria);
        debug!(count = flights.len(), urgent = criteria.urgent, "in-memory search");
        Ok(flights)
    }
}
