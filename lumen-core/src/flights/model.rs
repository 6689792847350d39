//! Flight search data model.

use std::fmt;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use super::error::FlightError;

/// A three-letter IATA airport code, stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AirportCode(String);

impl AirportCode {
    /// Parse an airport code. Lowercase letters are accepted and uppercased.
    pub fn parse(input: &str) -> Result<Self, FlightError> {
        let trimmed = input.trim();
        if trimmed.len() == 3 && trimmed.bytes().all(|b| b.is_ascii_alphabetic()) {
            Ok(Self(trimmed.to_ascii_uppercase()))
        } else {
            Err(FlightError::InvalidAirport(input.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AirportCode {
    type Error = FlightError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AirportCode> for String {
    fn from(code: AirportCode) -> Self {
        code.0
    }
}

impl fmt::Display for AirportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlightId(pub u32);

impl fmt::Display for FlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FL{:04}", self.0)
    }
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub id: FlightId,
    pub origin: AirportCode,
    pub destination: AirportCode,
    /// RFC 3339 departure time, as reported by the search backend.
    pub departs_at: String,
    pub price_cents: u32,
    pub seats_left: u16,
}

/// What the user is searching for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub origin: Option<AirportCode>,
    pub destination: Option<AirportCode>,
    pub urgent: bool,
}

impl SearchCriteria {
    /// Check the criteria's own invariant: origin and destination differ.
    pub fn validate(&self) -> Result<(), FlightError> {
        match (&self.origin, &self.destination) {
            (Some(origin), Some(destination)) if origin == destination => {
                Err(FlightError::SameOriginAndDestination(origin.clone()))
            }
            _ => Ok(()),
        }
    }

    /// Both ends of the route, if both are set.
    pub fn route(&self) -> Option<(&AirportCode, &AirportCode)> {
        Some((self.origin.as_ref()?, self.destination.as_ref()?))
    }

    /// Whether a flight serves this route.
    pub fn matches(&self, flight: &Flight) -> bool {
        self.route()
            .is_some_and(|(o, d)| flight.origin == *o && flight.destination == *d)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// Everything the search screen shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightSearchState {
    pub criteria: SearchCriteria,
    pub results: Vec<Flight>,
    /// Selected flights, in selection order. Always a subset of `results`.
    pub selected: IndexSet<FlightId>,
    pub status: SearchStatus,
}

impl FlightSearchState {
    pub fn validate(&self) -> Result<(), FlightError> {
        self.criteria.validate()?;
        if let Some(missing) = self
            .selected
            .iter()
            .find(|id| !self.results.iter().any(|f| f.id == **id))
        {
            return Err(FlightError::UnknownFlight(*missing));
        }
        Ok(())
    }

    pub fn find(&self, id: FlightId) -> Option<&Flight> {
        self.results.iter().find(|f| f.id == id)
    }
}

/// A partial update to the search criteria.
///
/// Absent fields leave the current value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatePatch {
    #[serde(default)]
    pub origin: Option<AirportCode>,
    #[serde(default)]
    pub destination: Option<AirportCode>,
    #[serde(default)]
    pub urgent: Option<bool>,
}

impl StatePatch {
    pub fn from_json(value: serde_json::Value) -> Result<Self, FlightError> {
        serde_json::from_value(value).map_err(FlightError::InvalidPatch)
    }

    pub fn is_empty(&self) -> bool {
        self.origin.is_none() && self.destination.is_none() && self.urgent.is_none()
    }

    /// Merge into `criteria` and validate the result.
    ///
    /// `criteria` may be left partially merged on error; callers apply
    /// patches through [`Signal::try_update`](crate::reactive::Signal::try_update),
    /// which discards the draft.
    pub fn apply_to(self, criteria: &mut SearchCriteria) -> Result<(), FlightError> {
        if let Some(origin) = self.origin {
            criteria.origin = Some(origin);
        }
        if let Some(destination) = self.destination {
            criteria.destination = Some(destination);
        }
        if let Some(urgent) = self.urgent {
            criteria.urgent = urgent;
        }
        criteria.validate()
    }
}
