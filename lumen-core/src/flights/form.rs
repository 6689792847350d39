//! State in a component, split into many small signals.
//!
//! Each field of the search form is its own signal, so a view bound to
//! `urgent` does not re-run when `origin` changes. Two ways of combining
//! them sit side by side:
//!
//! - `criteria`: a plain signal kept in sync by an effect that reads the
//!   three fields and writes the combined value.
//! - `summary`: a memo computed from the same fields.
//!
//! The memo needs no extra signal and never runs for nobody; the effect
//! runs on every field change, whether or not anyone reads `criteria`.

use crate::reactive::{batch, Effect, Memo, ReadSignal, Signal};

use super::error::FlightError;
use super::model::{AirportCode, SearchCriteria, StatePatch};

pub struct FlightSearchForm {
    origin: Signal<Option<AirportCode>>,
    destination: Signal<Option<AirportCode>>,
    urgent: Signal<bool>,
    criteria: Signal<SearchCriteria>,
    summary: Memo<String>,
    sync: Effect,
}

impl FlightSearchForm {
    pub fn new() -> Self {
        let origin = Signal::new(None);
        let destination = Signal::new(None);
        let urgent = Signal::new(false);
        let criteria = Signal::new(SearchCriteria::default());

        let sync = {
            let (origin, destination, urgent, criteria) = (
                origin.clone(),
                destination.clone(),
                urgent.clone(),
                criteria.clone(),
            );
            Effect::new(move || {
                criteria.set_if_changed(SearchCriteria {
                    origin: origin.get(),
                    destination: destination.get(),
                    urgent: urgent.get(),
                });
            })
        };

        let summary = {
            let (origin, destination, urgent) =
                (origin.clone(), destination.clone(), urgent.clone());
            Memo::new(move || {
                let end = |code: Option<AirportCode>| {
                    code.map_or_else(|| "?".to_string(), |c| c.to_string())
                };
                let route = format!("{} -> {}", end(origin.get()), end(destination.get()));
                if urgent.get() {
                    format!("{route} (urgent)")
                } else {
                    route
                }
            })
        };

        Self {
            origin,
            destination,
            urgent,
            criteria,
            summary,
            sync,
        }
    }

    pub fn origin(&self) -> ReadSignal<Option<AirportCode>> {
        self.origin.read_only()
    }

    pub fn destination(&self) -> ReadSignal<Option<AirportCode>> {
        self.destination.read_only()
    }

    pub fn urgent(&self) -> ReadSignal<bool> {
        self.urgent.read_only()
    }

    pub fn set_origin(&self, code: &str) -> Result<(), FlightError> {
        self.origin.set(Some(AirportCode::parse(code)?));
        Ok(())
    }

    pub fn set_destination(&self, code: &str) -> Result<(), FlightError> {
        self.destination.set(Some(AirportCode::parse(code)?));
        Ok(())
    }

    pub fn set_urgent(&self, urgent: bool) {
        self.urgent.set(urgent);
    }

    pub fn clear(&self) {
        batch(|| {
            self.origin.set(None);
            self.destination.set(None);
            self.urgent.set(false);
        });
    }

    /// Exchange origin and destination in one step.
    pub fn swap_route(&self) {
        batch(|| {
            let origin = self.origin.get_untracked();
            self.origin.set(self.destination.get_untracked());
            self.destination.set(origin);
        });
    }

    /// The combined criteria, maintained by an effect.
    pub fn criteria(&self) -> ReadSignal<SearchCriteria> {
        self.criteria.read_only()
    }

    /// A one-line description of the route, maintained by a memo.
    pub fn summary(&self) -> Memo<String> {
        self.summary.clone()
    }

    /// How many times the syncing effect has run.
    pub fn sync_runs(&self) -> usize {
        self.sync.run_count()
    }

    /// The form contents as a patch for a [`FlightSearchFacade`](super::FlightSearchFacade).
    pub fn to_patch(&self) -> Result<StatePatch, FlightError> {
        let criteria = self.criteria.get_untracked();
        criteria.validate()?;
        Ok(StatePatch {
            origin: criteria.origin,
            destination: criteria.destination,
            urgent: Some(criteria.urgent),
        })
    }
}

impl Default for FlightSearchForm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::RwLock;
    use std::sync::Arc;

    #[test]
    fn effect_combines_fields_into_criteria() {
        let form = FlightSearchForm::new();
        form.set_origin("sfo").unwrap();
        form.set_destination("jfk").unwrap();
        form.set_urgent(true);

        let criteria = form.criteria().get();
        assert_eq!(criteria.origin.unwrap().as_str(), "SFO");
        assert_eq!(criteria.destination.unwrap().as_str(), "JFK");
        assert!(criteria.urgent);
        // Initial run plus one per field write.
        assert_eq!(form.sync_runs(), 4);
    }

    #[test]
    fn memo_summarises_fields() {
        let form = FlightSearchForm::new();
        let summary = form.summary();
        assert_eq!(summary.get(), "? -> ?");

        form.set_origin("LHR").unwrap();
        assert_eq!(summary.get(), "LHR -> ?");

        form.set_destination("CDG").unwrap();
        form.set_urgent(true);
        assert_eq!(summary.get(), "LHR -> CDG (urgent)");
    }

    #[test]
    fn swap_is_seen_as_one_change() {
        let form = FlightSearchForm::new();
        form.set_origin("SFO").unwrap();
        form.set_destination("SEA").unwrap();

        let seen = Arc::new(RwLock::new(Vec::new()));
        let (criteria, log) = (form.criteria(), seen.clone());
        let _watcher = Effect::new(move || {
            let c = criteria.get();
            log.write().push((c.origin, c.destination));
        });

        let runs_before = form.sync_runs();
        form.swap_route();

        assert_eq!(form.sync_runs(), runs_before + 1);
        let seen = seen.read();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].0.as_ref().map(AirportCode::as_str), Some("SEA"));
        assert_eq!(seen[1].1.as_ref().map(AirportCode::as_str), Some("SFO"));
    }

    #[test]
    fn small_signals_isolate_readers() {
        let form = FlightSearchForm::new();
        let runs = Arc::new(RwLock::new(0));

        let (urgent, counter) = (form.urgent(), runs.clone());
        let _urgent_view = Effect::new(move || {
            let _ = urgent.get();
            *counter.write() += 1;
        });

        form.set_origin("SFO").unwrap();
        form.set_destination("JFK").unwrap();
        assert_eq!(*runs.read(), 1);

        form.set_urgent(true);
        assert_eq!(*runs.read(), 2);
    }

    #[test]
    fn urgent_view_follows_setter() {
        let form = FlightSearchForm::new();
        let urgent = form.urgent();
        assert!(!urgent.get());

        form.set_urgent(true);
        assert!(urgent.get());
        assert!(form.criteria().get().urgent);

        // `set` always notifies; the sync effect re-runs but writes nothing new.
        let runs = form.sync_runs();
        form.set_urgent(true);
        assert_eq!(form.sync_runs(), runs + 1);
        assert_eq!(form.summary().get(), "? -> ? (urgent)");
    }

    #[test]
    fn to_patch_validates_route() {
        let form = FlightSearchForm::new();
        form.set_origin("SFO").unwrap();
        form.set_destination("SFO").unwrap();
        assert!(matches!(
            form.to_patch(),
            Err(FlightError::SameOriginAndDestination(_))
        ));

        form.clear();
        let patch = form.to_patch().unwrap();
        assert_eq!(patch.origin, None);
        assert_eq!(patch.urgent, Some(false));
    }
}
