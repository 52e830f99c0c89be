//! Error taxonomy for leg computations.

use chrono::{DateTime, Utc};
use thiserror::Error;

use linkplan_core::{SatelliteId, Transport};

/// Fatal for one leg: no partial timeline is produced.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ComputationError {
    #[error("route has no waypoints")]
    EmptyRoute,
    #[error("route lacks resolvable {0} timing")]
    MissingTiming(&'static str),
    #[error("mission window is empty: end {end} is not after start {start}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("route timing cannot be represented: {0}")]
    InvalidTiming(String),
    #[error("invalid engine settings: {0}")]
    InvalidSettings(String),
}

/// A single constraint that could not be resolved; its events are skipped.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConstraintError {
    #[error("satellite `{0}` is not in the catalog")]
    UnknownSatellite(SatelliteId),
    #[error("satellite `{satellite}` belongs to {actual}, expected {expected}")]
    WrongTransport {
        satellite: SatelliteId,
        expected: Transport,
        actual: Transport,
    },
    #[error("satellite `{0}` has no fixed longitude")]
    MissingLongitude(SatelliteId),
    #[error("waypoint `{0}` is not on the route")]
    UnresolvedWaypoint(String),
    #[error("transition `{0}` trigger could not be placed on the route")]
    UnresolvedTrigger(String),
    #[error("outage `{0}` ends before it starts")]
    InvalidOutageWindow(String),
    #[error("outage `{id}` targets {transport}, which does not accept manual outages")]
    UnsupportedOutageTransport { id: String, transport: Transport },
    #[error("refueling window `{0}` ends before it starts")]
    InvalidRefuelingWindow(String),
}
