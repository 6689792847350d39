//! State in a service.
//!
//! `FlightSearchFacade` owns the whole search screen state in one signal.
//! Consumers get a [`ReadSignal`] and go through the facade's methods for
//! every write, which is where validation happens.
//!
//! # Ordering with in-flight searches
//!
//! Every search and every criteria change bumps a generation counter. A
//! search response is applied only if no newer search or criteria change
//! happened while it was in flight; otherwise it is dropped and the search
//! reports [`SearchOutcome::Superseded`].
//!
//! The counter is only bumped and compared while the state's write lock is
//! held, so a response and a criteria change made on another thread cannot
//! interleave.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, warn};

use super::api::FlightSearchApi;
use super::error::FlightError;
use super::model::{
    AirportCode, Flight, FlightId, FlightSearchState, SearchCriteria, SearchStatus, StatePatch,
};
use crate::reactive::{Memo, ReadSignal, Signal};

/// What happened to a search response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The response replaced the results.
    Applied { results: usize },
    /// A newer search or criteria change made the response stale.
    Superseded,
}

/// A response that lost the race against a newer generation.
struct Stale;

pub struct FlightSearchFacade<A> {
    api: A,
    state: Signal<FlightSearchState>,
    generation: AtomicU64,
    result_count: Memo<usize>,
    selected_total_cents: Memo<u64>,
}

impl<A: FlightSearchApi> FlightSearchFacade<A> {
    pub fn new(api: A) -> Self {
        Self::from_parts(api, FlightSearchState::default())
    }

    /// Start from an existing state, which must be valid.
    pub fn with_state(api: A, state: FlightSearchState) -> Result<Self, FlightError> {
        state.validate()?;
        Ok(Self::from_parts(api, state))
    }

    fn from_parts(api: A, state: FlightSearchState) -> Self {
        let state = Signal::new(state);

        let result_count = {
            let state = state.clone();
            Memo::new(move || state.with(|s| s.results.len()))
        };

        let selected_total_cents = {
            let state = state.clone();
            Memo::new(move || {
                state.with(|s| {
                    s.selected
                        .iter()
                        .filter_map(|id| s.find(*id))
                        .map(|flight| u64::from(flight.price_cents))
                        .sum::<u64>()
                })
            })
        };

        Self {
            api,
            state,
            generation: AtomicU64::new(0),
            result_count,
            selected_total_cents,
        }
    }

    /// Read-only access to the full state.
    pub fn state(&self) -> ReadSignal<FlightSearchState> {
        self.state.read_only()
    }

    pub fn criteria(&self) -> SearchCriteria {
        self.state.with(|s| s.criteria.clone())
    }

    pub fn status(&self) -> SearchStatus {
        self.state.with(|s| s.status.clone())
    }

    /// Number of flights in the current results.
    pub fn result_count(&self) -> Memo<usize> {
        self.result_count.clone()
    }

    /// Total price of the selected flights.
    pub fn selected_total_cents(&self) -> Memo<u64> {
        self.selected_total_cents.clone()
    }

    pub fn set_origin(&self, code: &str) -> Result<(), FlightError> {
        let code = AirportCode::parse(code)?;
        self.edit_criteria(|criteria| {
            criteria.origin = Some(code);
            Ok(())
        })
    }

    pub fn set_destination(&self, code: &str) -> Result<(), FlightError> {
        let code = AirportCode::parse(code)?;
        self.edit_criteria(|criteria| {
            criteria.destination = Some(code);
            Ok(())
        })
    }

    pub fn set_urgent(&self, urgent: bool) -> Result<(), FlightError> {
        self.edit_criteria(|criteria| {
            criteria.urgent = urgent;
            Ok(())
        })
    }

    /// Merge a JSON partial state into the criteria.
    ///
    /// The patch is validated as a whole; on error nothing changes.
    pub fn apply_patch(&self, patch: serde_json::Value) -> Result<(), FlightError> {
        let patch = StatePatch::from_json(patch)?;
        if patch.is_empty() {
            return Ok(());
        }
        self.edit_criteria(|criteria| patch.apply_to(criteria))
    }

    fn edit_criteria(
        &self,
        edit: impl FnOnce(&mut SearchCriteria) -> Result<(), FlightError>,
    ) -> Result<(), FlightError> {
        self.state.try_update(|state| -> Result<(), FlightError> {
            edit(&mut state.criteria)?;
            state.criteria.validate()?;
            if state.status == SearchStatus::Loading {
                state.status = SearchStatus::Idle;
            }
            // Responses to the old criteria must not land.
            self.generation.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    /// Run a search for the current criteria.
    ///
    /// Backend failures are recorded as [`SearchStatus::Failed`] and also
    /// returned.
    pub async fn search(&self) -> Result<SearchOutcome, FlightError> {
        let criteria = self.state.with_untracked(|s| s.criteria.clone());
        if criteria.route().is_none() {
            return Err(FlightError::MissingCriteria);
        }

        let mut generation = 0;
        self.state.update(|s| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            s.status = SearchStatus::Loading;
        });
        debug!(generation, ?criteria, "search started");

        let response = self.api.search(&criteria).await;

        let applied = self.state.try_update(|s| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return Err(Stale);
            }
            Ok(match response {
                Ok(flights) => {
                    s.selected
                        .retain(|id| flights.iter().any(|flight| flight.id == *id));
                    s.results = flights;
                    s.status = SearchStatus::Loaded;
                    Ok(s.results.len())
                }
                Err(err) => {
                    s.status = SearchStatus::Failed(err.to_string());
                    Err(err)
                }
            })
        });

        match applied {
            Err(Stale) => {
                debug!(generation, "discarding stale search response");
                Ok(SearchOutcome::Superseded)
            }
            Ok(Ok(results)) => {
                info!(generation, results, "search applied");
                Ok(SearchOutcome::Applied { results })
            }
            Ok(Err(err)) => {
                warn!(generation, error = %err, "search failed");
                Err(err.into())
            }
        }
    }

    /// Select a flight from the current results. Returns whether it was
    /// newly selected; selecting it again notifies nobody.
    pub fn select(&self, id: FlightId) -> Result<bool, FlightError> {
        let (known, selected) = self
            .state
            .with_untracked(|s| (s.find(id).is_some(), s.selected.contains(&id)));
        if !known {
            return Err(FlightError::UnknownFlight(id));
        }
        if selected {
            return Ok(false);
        }
        self.state.try_update(|s| {
            if s.find(id).is_none() {
                return Err(FlightError::UnknownFlight(id));
            }
            Ok(s.selected.insert(id))
        })
    }

    /// Deselect a flight. Returns whether it was selected.
    pub fn deselect(&self, id: FlightId) -> bool {
        if !self.state.with_untracked(|s| s.selected.contains(&id)) {
            return false;
        }
        self.state.update(|s| {
            s.selected.shift_remove(&id);
        });
        true
    }

    pub fn clear_selection(&self) {
        if self.state.with_untracked(|s| !s.selected.is_empty()) {
            self.state.update(|s| s.selected.clear());
        }
    }

    /// The selected flights, in selection order.
    pub fn selected_flights(&self) -> Vec<Flight> {
        self.state.with(|s| {
            s.selected
                .iter()
                .filter_map(|id| s.find(*id).cloned())
                .collect()
        })
    }

    /// Encode the current state as MessagePack.
    pub fn snapshot(&self) -> Result<Vec<u8>, FlightError> {
        Ok(self
            .state
            .with_untracked(|state| rmp_serde::to_vec_named(state))?)
    }

    /// Replace the state with a previously taken snapshot.
    ///
    /// A restored `Loading` status is reset to `Idle`, since the search it
    /// belonged to is gone.
    pub fn restore(&self, bytes: &[u8]) -> Result<(), FlightError> {
        let mut state: FlightSearchState = rmp_serde::from_slice(bytes)?;
        state.validate()?;
        if state.status == SearchStatus::Loading {
            state.status = SearchStatus::Idle;
        }

        self.state.update(|current| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            *current = state;
        });
        debug!("state restored from snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flights::api::fixtures::timetable;
    use crate::flights::api::InMemoryFlightApi;
    use crate::flights::error::ApiError;
    use crate::reactive::Effect;
    use parking_lot::RwLock;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn facade() -> FlightSearchFacade<InMemoryFlightApi> {
        FlightSearchFacade::new(InMemoryFlightApi::new(timetable()))
    }

    #[test]
    fn criteria_setters_validate() {
        let facade = facade();
        facade.set_origin("sfo").unwrap();

        assert!(matches!(
            facade.set_destination("SFO"),
            Err(FlightError::SameOriginAndDestination(_))
        ));
        assert!(matches!(
            facade.set_destination("S"),
            Err(FlightError::InvalidAirport(_))
        ));
        assert_eq!(facade.criteria().destination, None);
    }

    #[test]
    fn invalid_patch_leaves_state_untouched() {
        let facade = facade();
        facade
            .apply_patch(json!({ "origin": "SFO", "urgent": true }))
            .unwrap();

        let err = facade
            .apply_patch(json!({ "destination": "SFO", "urgent": false }))
            .unwrap_err();
        assert!(matches!(err, FlightError::SameOriginAndDestination(_)));

        let criteria = facade.criteria();
        assert!(criteria.urgent);
        assert_eq!(criteria.destination, None);
    }

    #[tokio::test]
    async fn search_requires_a_route() {
        let facade = facade();
        facade.set_origin("SFO").unwrap();
        assert!(matches!(
            facade.search().await,
            Err(FlightError::MissingCriteria)
        ));
        assert_eq!(facade.status(), SearchStatus::Idle);
    }

    #[tokio::test]
    async fn search_loads_results_and_notifies_watchers() {
        let facade = facade();
        let statuses = Arc::new(RwLock::new(Vec::new()));

        let (view, log) = (facade.state(), statuses.clone());
        let _watcher = Effect::new(move || log.write().push(view.with(|s| s.status.clone())));

        facade.set_origin("SFO").unwrap();
        facade.set_destination("JFK").unwrap();
        let outcome = facade.search().await.unwrap();

        assert_eq!(outcome, SearchOutcome::Applied { results: 3 });
        assert_eq!(facade.result_count().get(), 3);
        assert_eq!(statuses.read().last(), Some(&SearchStatus::Loaded));
        assert!(statuses.read().contains(&SearchStatus::Loading));
    }

    #[tokio::test]
    async fn failed_search_is_recorded_and_returned() {
        let api = InMemoryFlightApi::new(timetable());
        api.fail_next(ApiError::Unavailable("maintenance".into()));
        let facade = FlightSearchFacade::new(api);
        facade.apply_patch(json!({ "origin": "SFO", "destination": "JFK" })).unwrap();

        let err = facade.search().await.unwrap_err();
        assert!(matches!(err, FlightError::Api(ApiError::Unavailable(_))));
        assert!(matches!(facade.status(), SearchStatus::Failed(msg) if msg.contains("maintenance")));
    }

    #[tokio::test]
    async fn criteria_change_supersedes_in_flight_search() {
        let api = InMemoryFlightApi::new(timetable()).with_latency(Duration::from_millis(20));
        let facade = FlightSearchFacade::new(api);
        facade.apply_patch(json!({ "origin": "SFO", "destination": "JFK" })).unwrap();

        let (outcome, ()) = tokio::join!(facade.search(), async {
            tokio::task::yield_now().await;
            facade.set_destination("SEA").unwrap();
        });

        assert_eq!(outcome.unwrap(), SearchOutcome::Superseded);
        assert_eq!(facade.result_count().get(), 0);
        assert_eq!(facade.status(), SearchStatus::Idle);

        assert_eq!(
            facade.search().await.unwrap(),
            SearchOutcome::Applied { results: 1 }
        );
    }

    #[tokio::test]
    async fn selection_tracks_results() {
        let facade = facade();
        facade.apply_patch(json!({ "origin": "SFO", "destination": "JFK" })).unwrap();
        facade.search().await.unwrap();

        let total = facade.selected_total_cents();
        facade.select(FlightId(3)).unwrap();
        facade.select(FlightId(1)).unwrap();
        assert!(matches!(
            facade.select(FlightId(4)),
            Err(FlightError::UnknownFlight(FlightId(4)))
        ));

        let ids: Vec<_> = facade.selected_flights().iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![FlightId(3), FlightId(1)]);
        assert_eq!(total.get(), 57_000);

        assert!(facade.deselect(FlightId(3)));
        assert!(!facade.deselect(FlightId(3)));
        assert_eq!(total.get(), 32_000);

        // Urgent results drop the full flight 2, but flight 1 survives.
        facade.set_urgent(true).unwrap();
        facade.search().await.unwrap();
        assert_eq!(facade.selected_flights().len(), 1);

        facade.clear_selection();
        assert_eq!(total.get(), 0);
    }

    #[tokio::test]
    async fn selecting_twice_notifies_once() {
        let facade = facade();
        facade.apply_patch(json!({ "origin": "SFO", "destination": "JFK" })).unwrap();
        facade.search().await.unwrap();

        let runs = Arc::new(RwLock::new(0));
        let (view, counter) = (facade.state(), runs.clone());
        let _watcher = Effect::new(move || {
            view.with(|s| s.selected.len());
            *counter.write() += 1;
        });

        assert!(facade.select(FlightId(2)).unwrap());
        assert!(!facade.select(FlightId(2)).unwrap());
        assert_eq!(*runs.read(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn criteria_change_from_another_thread_supersedes_search() {
        let api = InMemoryFlightApi::new(timetable()).with_latency(Duration::from_millis(50));
        let facade = Arc::new(FlightSearchFacade::new(api));
        facade.apply_patch(json!({ "origin": "SFO", "destination": "JFK" })).unwrap();

        let editor = {
            let facade = Arc::clone(&facade);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(10));
                facade.set_destination("SEA").unwrap();
            })
        };

        let outcome = facade.search().await.unwrap();
        editor.join().unwrap();

        assert_eq!(outcome, SearchOutcome::Superseded);
        assert_eq!(facade.result_count().get(), 0);
        assert_eq!(facade.criteria().destination.unwrap().as_str(), "SEA");
    }

    #[tokio::test]
    async fn snapshot_round_trip_restores_state() {
        let facade = facade();
        facade.apply_patch(json!({ "origin": "SFO", "destination": "JFK" })).unwrap();
        facade.search().await.unwrap();
        facade.select(FlightId(1)).unwrap();
        let bytes = facade.snapshot().unwrap();

        let other = self::facade();
        other.restore(&bytes).unwrap();

        assert_eq!(other.state().get(), facade.state().get());
        assert!(other.restore(b"not msgpack").is_err());
    }
}
