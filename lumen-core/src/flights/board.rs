//! Nested signals.
//!
//! `FlightBoard` keeps its rows in a `Signal<Vec<FlightRow>>`, and every row
//! owns a `Signal<bool>` for its selection flag. Each level is tracked on
//! its own:
//!
//! - Reading the list subscribes to row insertions and removals only.
//! - Reading a row's flag subscribes to that row only.
//!
//! Toggling a row therefore re-runs nothing that only looked at the list.

use crate::reactive::{Memo, ReadSignal, Signal};

use super::error::FlightError;
use super::model::{Flight, FlightId};

/// One row of the board.
#[derive(Debug, Clone)]
pub struct FlightRow {
    flight: Flight,
    selected: Signal<bool>,
}

impl FlightRow {
    fn new(flight: Flight) -> Self {
        Self {
            flight,
            selected: Signal::new(false),
        }
    }

    pub fn flight(&self) -> &Flight {
        &self.flight
    }

    pub fn id(&self) -> FlightId {
        self.flight.id
    }

    /// The row's selection flag, tracked.
    pub fn is_selected(&self) -> bool {
        self.selected.get()
    }

    pub fn selected(&self) -> ReadSignal<bool> {
        self.selected.read_only()
    }

    /// Flip the selection flag and return the new value.
    pub fn toggle(&self) -> bool {
        self.selected.update(|selected| *selected = !*selected);
        self.selected.get_untracked()
    }
}

pub struct FlightBoard {
    rows: Signal<Vec<FlightRow>>,
    selected_ids: Memo<Vec<FlightId>>,
}

impl FlightBoard {
    pub fn new() -> Self {
        let rows: Signal<Vec<FlightRow>> = Signal::new(Vec::new());

        let selected_ids = {
            let rows = rows.clone();
            Memo::new(move || {
                rows.with(|rows| {
                    rows.iter()
                        .filter(|row| row.is_selected())
                        .map(FlightRow::id)
                        .collect()
                })
            })
        };

        Self { rows, selected_ids }
    }

    /// Replace the rows.
    ///
    /// Flights already on the board keep their row, including its selection
    /// flag; new flights start unselected.
    pub fn load(&self, flights: Vec<Flight>) {
        let previous = self.rows.get_untracked();
        let rows = flights
            .into_iter()
            .map(|flight| {
                match previous.iter().find(|row| row.id() == flight.id) {
                    Some(existing) => FlightRow {
                        flight,
                        selected: existing.selected.clone(),
                    },
                    None => FlightRow::new(flight),
                }
            })
            .collect();
        self.rows.set(rows);
    }

    pub fn rows(&self) -> ReadSignal<Vec<FlightRow>> {
        self.rows.read_only()
    }

    pub fn len(&self) -> usize {
        self.rows.with(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find a row, tracking the list.
    pub fn row(&self, id: FlightId) -> Option<FlightRow> {
        self.rows
            .with(|rows| rows.iter().find(|row| row.id() == id).cloned())
    }

    pub fn toggle(&self, id: FlightId) -> Result<bool, FlightError> {
        let row = self
            .rows
            .with_untracked(|rows| rows.iter().find(|row| row.id() == id).cloned())
            .ok_or(FlightError::UnknownFlight(id))?;
        Ok(row.toggle())
    }

    /// Selected flight ids in board order.
    pub fn selected_ids(&self) -> Memo<Vec<FlightId>> {
        self.selected_ids.clone()
    }
}

impl Default for FlightBoard {
    fn default() -> Self {
        Self::new()
    }
}
