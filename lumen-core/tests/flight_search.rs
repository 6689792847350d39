//! End-to-end flows across the facade, the form and the board.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::json;

use lumen_core::flights::{
    AirportCode, Flight, FlightBoard, FlightError, FlightId, FlightSearchFacade, FlightSearchForm,
    InMemoryFlightApi, SearchOutcome, SearchStatus,
};
use lumen_core::reactive::Effect;

fn flight(id: u32, origin: &str, destination: &str, price_cents: u32, seats_left: u16) -> Flight {
    Flight {
        id: FlightId(id),
        origin: AirportCode::parse(origin).unwrap(),
        destination: AirportCode::parse(destination).unwrap(),
        departs_at: "2026-12-01T09:30:00Z".to_string(),
        price_cents,
        seats_left,
    }
}

fn api() -> InMemoryFlightApi {
    InMemoryFlightApi::new(vec![
        flight(10, "AMS", "BCN", 9_900, 3),
        flight(11, "AMS", "BCN", 7_500, 0),
        flight(12, "BCN", "AMS", 8_800, 12),
    ])
}

#[tokio::test]
async fn form_feeds_facade_which_feeds_board() {
    let form = FlightSearchForm::new();
    let facade = FlightSearchFacade::new(api());
    let board = FlightBoard::new();

    form.set_origin("ams").unwrap();
    form.set_destination("bcn").unwrap();
    let patch = serde_json::to_value(form.to_patch().unwrap()).unwrap();
    facade.apply_patch(patch).unwrap();

    let outcome = facade.search().await.unwrap();
    assert_eq!(outcome, SearchOutcome::Applied { results: 2 });

    board.load(facade.state().get().results);
    board.toggle(FlightId(11)).unwrap();
    assert_eq!(board.selected_ids().get(), vec![FlightId(11)]);

    // Urgent search drops the sold-out flight; the board follows.
    form.set_urgent(true);
    let patch = serde_json::to_value(form.to_patch().unwrap()).unwrap();
    facade.apply_patch(patch).unwrap();
    facade.search().await.unwrap();
    board.load(facade.state().get().results);

    assert_eq!(board.len(), 1);
    assert!(board.selected_ids().get().is_empty());
    assert_eq!(form.summary().get(), "AMS -> BCN (urgent)");
}

#[tokio::test]
async fn status_transitions_are_observable() {
    let facade = FlightSearchFacade::new(api());
    let statuses = Arc::new(RwLock::new(Vec::new()));

    let (state, log) = (facade.state(), statuses.clone());
    let _watch = Effect::new(move || {
        let status = state.with(|s| s.status.clone());
        let mut log = log.write();
        if log.last() != Some(&status) {
            log.push(status);
        }
    });

    facade
        .apply_patch(json!({ "origin": "BCN", "destination": "AMS" }))
        .unwrap();
    facade.search().await.unwrap();

    assert_eq!(
        *statuses.read(),
        vec![SearchStatus::Idle, SearchStatus::Loading, SearchStatus::Loaded]
    );
}

#[test]
fn consumers_cannot_write_through_the_facade_view() {
    let facade = FlightSearchFacade::new(api());
    let view = facade.state();

    // The view only reads; writes go through validated facade methods.
    assert_eq!(view.get().criteria.origin, None);
    assert!(matches!(
        facade.apply_patch(json!({ "origin": "AMS", "destination": "AMS" })),
        Err(FlightError::SameOriginAndDestination(_))
    ));
    assert_eq!(view.get().criteria.origin, None);
}
