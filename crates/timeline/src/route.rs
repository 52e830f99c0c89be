//! Route temporal projection: waypoint timing, mission window, and minute samples.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::warn;

use linkplan_config::{TimedRoute, Waypoint};
use linkplan_core::units::normalize_degrees;
use linkplan_coverage::{RouteSample, SatelliteCatalog};
use linkplan_geometry::{haversine_distance_m, initial_bearing_deg, intermediate_point};

use crate::error::ComputationError;

const MIN_SEGMENT_LENGTH_M: f64 = 1.0;

/// Departure and arrival instants of one leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MissionWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MissionWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ComputationError> {
        if end <= start {
            return Err(ComputationError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Clamp an instant into the window.
    pub fn clamp(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        at.clamp(self.start, self.end)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

/// Waypoint with its resolved time and distance along the route.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedWaypoint {
    pub name: Option<String>,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
    pub distance_m: f64,
    pub time: DateTime<Utc>,
}

/// Route projected onto the mission window.
#[derive(Debug, Clone)]
pub struct ProjectedRoute {
    pub window: MissionWindow,
    pub waypoints: Vec<TimedWaypoint>,
    pub samples: Vec<RouteSample>,
}

impl ProjectedRoute {
    /// Resolved time of a named waypoint (case-insensitive, first match).
    pub fn waypoint_time(&self, name: &str) -> Option<DateTime<Utc>> {
        self.waypoints
            .iter()
            .find(|wp| {
                wp.name
                    .as_deref()
                    .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name))
            })
            .map(|wp| wp.time)
    }

    /// Sample closest (great-circle) to the given position.
    pub fn closest_sample(&self, latitude_deg: f64, longitude_deg: f64) -> Option<&RouteSample> {
        self.samples.iter().min_by(|a, b| {
            let da = haversine_distance_m(
                latitude_deg,
                longitude_deg,
                a.latitude_deg,
                a.longitude_deg,
            );
            let db = haversine_distance_m(
                latitude_deg,
                longitude_deg,
                b.latitude_deg,
                b.longitude_deg,
            );
            da.total_cmp(&db)
        })
    }

    pub fn total_distance_m(&self) -> f64 {
        self.waypoints.last().map(|wp| wp.distance_m).unwrap_or(0.0)
    }
}

fn shift(route: &TimedRoute) -> Result<Duration, ComputationError> {
    let minutes = route.timing.adjusted_departure_minutes.unwrap_or(0);
    Duration::try_minutes(minutes).ok_or_else(|| {
        ComputationError::InvalidTiming(format!(
            "adjusted departure of {minutes} minutes is out of range"
        ))
    })
}

/// Derive the mission window from the timing profile, falling back to the
/// first/last waypoint ETA. The adjusted-departure shift moves both ends.
pub fn mission_window(route: &TimedRoute) -> Result<MissionWindow, ComputationError> {
    let first = route.waypoints.first().ok_or(ComputationError::EmptyRoute)?;
    let last = route.waypoints.last().ok_or(ComputationError::EmptyRoute)?;
    let departure = route
        .timing
        .departure
        .or(first.eta)
        .ok_or(ComputationError::MissingTiming("departure"))?;
    let arrival = route
        .timing
        .arrival
        .or(last.eta)
        .ok_or(ComputationError::MissingTiming("arrival"))?;
    let delta = shift(route)?;
    let shifted = |at: DateTime<Utc>| {
        at.checked_add_signed(delta).ok_or_else(|| {
            ComputationError::InvalidTiming(format!(
                "adjusted departure of {} minutes moves {at} out of range",
                delta.num_minutes()
            ))
        })
    };
    MissionWindow::new(shifted(departure)?, shifted(arrival)?)
}

/// Project a timed route onto samples every `interval_seconds`, plus one at
/// the mission end, attaching each sample's covering set from the catalog.
pub fn project_route(
    route: &TimedRoute,
    catalog: &SatelliteCatalog,
    interval_seconds: u32,
) -> Result<ProjectedRoute, ComputationError> {
    if interval_seconds == 0 {
        return Err(ComputationError::InvalidSettings(
            "sampling interval must be positive".to_string(),
        ));
    }
    let window = mission_window(route)?;
    let waypoints = time_waypoints(&route.waypoints, window, shift(route)?);

    let step = Duration::seconds(i64::from(interval_seconds));
    let mut samples = Vec::new();
    let mut at = window.start;
    while at < window.end {
        samples.push(sample_at(&waypoints, at, catalog));
        match at.checked_add_signed(step) {
            Some(next) => at = next,
            None => break,
        }
    }
    samples.push(sample_at(&waypoints, window.end, catalog));

    Ok(ProjectedRoute {
        window,
        waypoints,
        samples,
    })
}

fn time_waypoints(
    waypoints: &[Waypoint],
    window: MissionWindow,
    delta: Duration,
) -> Vec<TimedWaypoint> {
    let mut distances = Vec::with_capacity(waypoints.len());
    let mut total = 0.0;
    for (index, wp) in waypoints.iter().enumerate() {
        if index > 0 {
            let prev = &waypoints[index - 1];
            total += haversine_distance_m(
                prev.latitude_deg,
                prev.longitude_deg,
                wp.latitude_deg,
                wp.longitude_deg,
            );
        }
        distances.push(total);
    }

    let last_index = waypoints.len() - 1;
    let mut anchors: Vec<(usize, DateTime<Utc>)> = vec![(0, window.start)];
    for (index, wp) in waypoints.iter().enumerate().take(last_index).skip(1) {
        let Some(eta) = wp.eta.and_then(|eta| eta.checked_add_signed(delta)) else {
            continue;
        };
        let previous = anchors[anchors.len() - 1].1;
        if eta > previous && eta < window.end {
            anchors.push((index, eta));
        } else {
            warn!(
                waypoint = wp.name.as_deref().unwrap_or("<unnamed>"),
                %eta,
                "waypoint ETA is out of order; interpolating instead"
            );
        }
    }
    if last_index > 0 {
        anchors.push((last_index, window.end));
    }

    let mut timed = Vec::with_capacity(waypoints.len());
    let mut anchor = 0;
    for (index, wp) in waypoints.iter().enumerate() {
        while anchor + 1 < anchors.len() && anchors[anchor + 1].0 < index {
            anchor += 1;
        }
        let (ia, ta) = anchors[anchor];
        let time = match anchors.get(anchor + 1) {
            Some(&(ib, tb)) if index > ia => {
                let span = distances[ib] - distances[ia];
                let fraction = if span > 0.0 {
                    (distances[index] - distances[ia]) / span
                } else {
                    (index - ia) as f64 / (ib - ia) as f64
                };
                ta + scale(tb - ta, fraction)
            }
            _ => ta,
        };
        timed.push(TimedWaypoint {
            name: wp.name.clone(),
            latitude_deg: wp.latitude_deg,
            longitude_deg: wp.longitude_deg,
            altitude_m: wp.altitude_m,
            distance_m: distances[index],
            time,
        });
    }
    timed
}

fn scale(duration: Duration, fraction: f64) -> Duration {
    let millis = duration.num_milliseconds() as f64 * fraction.clamp(0.0, 1.0);
    Duration::milliseconds(millis.round() as i64)
}

fn sample_at(
    waypoints: &[TimedWaypoint],
    at: DateTime<Utc>,
    catalog: &SatelliteCatalog,
) -> RouteSample {
    let (latitude_deg, longitude_deg, altitude_m, distance_m, heading_deg) =
        position_at(waypoints, at);
    RouteSample {
        distance_m,
        timestamp: at,
        latitude_deg,
        longitude_deg,
        altitude_m,
        heading_deg,
        covering: catalog.covering_satellites(latitude_deg, longitude_deg, altitude_m),
    }
}

fn position_at(
    waypoints: &[TimedWaypoint],
    at: DateTime<Utc>,
) -> (f64, f64, f64, f64, Option<f64>) {
    let first = &waypoints[0];
    if waypoints.len() == 1 {
        return (first.latitude_deg, first.longitude_deg, first.altitude_m, 0.0, None);
    }

    // index of the segment [i, i + 1] containing `at`
    let upper = waypoints.partition_point(|wp| wp.time <= at);
    let i = upper.saturating_sub(1).min(waypoints.len() - 2);
    let a = &waypoints[i];
    let b = &waypoints[i + 1];

    let span_ms = (b.time - a.time).num_milliseconds();
    let fraction = if span_ms > 0 {
        ((at - a.time).num_milliseconds() as f64 / span_ms as f64).clamp(0.0, 1.0)
    } else {
        1.0
    };

    let (lat, lon) = intermediate_point(
        a.latitude_deg,
        a.longitude_deg,
        b.latitude_deg,
        b.longitude_deg,
        fraction,
    );
    let altitude = a.altitude_m + (b.altitude_m - a.altitude_m) * fraction;
    let segment_length = b.distance_m - a.distance_m;
    let distance = a.distance_m + segment_length * fraction;

    let heading = if segment_length < MIN_SEGMENT_LENGTH_M {
        None
    } else if haversine_distance_m(lat, lon, b.latitude_deg, b.longitude_deg)
        > MIN_SEGMENT_LENGTH_M
    {
        Some(initial_bearing_deg(lat, lon, b.latitude_deg, b.longitude_deg))
    } else {
        // at the segment end: reverse of the bearing back towards its start
        let back = initial_bearing_deg(
            b.latitude_deg,
            b.longitude_deg,
            a.latitude_deg,
            a.longitude_deg,
        );
        Some(normalize_degrees(back + 180.0))
    };

    (lat, lon, altitude, distance, heading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use linkplan_config::TimingProfile;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
    }

    fn waypoint(name: &str, lat: f64, lon: f64) -> Waypoint {
        Waypoint {
            name: Some(name.to_string()),
            latitude_deg: lat,
            longitude_deg: lon,
            altitude_m: 10_000.0,
            eta: None,
        }
    }

    fn eastbound(hours: i64) -> TimedRoute {
        TimedRoute {
            waypoints: vec![
                waypoint("A", 0.0, 0.0),
                waypoint("B", 0.0, 10.0),
                waypoint("C", 0.0, 20.0),
            ],
            timing: TimingProfile {
                departure: Some(t0()),
                arrival: Some(t0() + Duration::hours(hours)),
                adjusted_departure_minutes: None,
            },
        }
    }

    #[test]
    fn missing_timing_is_fatal() {
        let mut route = eastbound(2);
        route.timing.arrival = None;
        assert_eq!(
            mission_window(&route),
            Err(ComputationError::MissingTiming("arrival"))
        );

        let empty = TimedRoute {
            waypoints: vec![],
            timing: TimingProfile::default(),
        };
        assert_eq!(mission_window(&empty), Err(ComputationError::EmptyRoute));
    }

    #[test]
    fn inverted_window_is_fatal() {
        let mut route = eastbound(2);
        route.timing.arrival = Some(t0());
        assert!(matches!(
            mission_window(&route),
            Err(ComputationError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn adjusted_departure_preserves_duration() {
        let mut route = eastbound(2);
        route.timing.adjusted_departure_minutes = Some(45);
        let window = mission_window(&route).unwrap();
        assert_eq!(window.start, t0() + Duration::minutes(45));
        assert_eq!(window.duration(), Duration::hours(2));
    }

    #[test]
    fn out_of_range_shift_is_fatal() {
        let mut route = eastbound(2);
        route.timing.adjusted_departure_minutes = Some(i64::MAX / 2);
        assert!(matches!(
            mission_window(&route),
            Err(ComputationError::InvalidTiming(_))
        ));

        // representable as a duration, but past the last representable instant
        route.timing.adjusted_departure_minutes = Some(10_000_000_000_000);
        assert!(matches!(
            mission_window(&route),
            Err(ComputationError::InvalidTiming(_))
        ));
        assert!(matches!(
            project_route(&route, &SatelliteCatalog::default(), 60),
            Err(ComputationError::InvalidTiming(_))
        ));
    }

    #[test]
    fn eta_falls_back_to_waypoints() {
        let mut route = eastbound(2);
        route.timing = TimingProfile::default();
        route.waypoints[0].eta = Some(t0());
        route.waypoints[2].eta = Some(t0() + Duration::hours(3));
        let window = mission_window(&route).unwrap();
        assert_eq!(window.duration(), Duration::hours(3));
    }

    #[test]
    fn samples_cover_window_at_cadence() {
        let route = eastbound(2);
        let projected = project_route(&route, &SatelliteCatalog::default(), 60).unwrap();
        assert_eq!(projected.samples.len(), 121);
        assert_eq!(projected.samples[0].timestamp, t0());
        assert_eq!(projected.samples[120].timestamp, t0() + Duration::hours(2));

        let mid = &projected.samples[60];
        assert!((mid.longitude_deg - 10.0).abs() < 1e-6);
        assert!((mid.heading_deg.unwrap() - 90.0).abs() < 1e-6);
        let last = projected.samples.last().unwrap();
        assert!((last.longitude_deg - 20.0).abs() < 1e-6);
        assert!((last.heading_deg.unwrap() - 90.0).abs() < 1e-6);
    }

    #[test]
    fn uneven_cadence_ends_exactly_at_arrival() {
        let route = eastbound(1);
        let projected = project_route(&route, &SatelliteCatalog::default(), 7 * 60).unwrap();
        let times: Vec<_> = projected.samples.iter().map(|s| s.timestamp).collect();
        assert_eq!(times.len(), 10);
        assert_eq!(*times.last().unwrap(), t0() + Duration::hours(1));
    }

    #[test]
    fn waypoint_times_follow_distance() {
        let route = eastbound(2);
        let projected = project_route(&route, &SatelliteCatalog::default(), 60).unwrap();
        assert_eq!(projected.waypoint_time("b"), Some(t0() + Duration::hours(1)));
        assert_eq!(projected.waypoint_time("missing"), None);
    }

    #[test]
    fn explicit_eta_is_an_anchor() {
        let mut route = eastbound(2);
        route.waypoints[1].eta = Some(t0() + Duration::minutes(90));
        let projected = project_route(&route, &SatelliteCatalog::default(), 60).unwrap();
        assert_eq!(projected.waypoint_time("B"), Some(t0() + Duration::minutes(90)));
        // the second half is flown faster, so the 100-minute point is past B
        let sample = &projected.samples[100];
        assert!(sample.longitude_deg > 10.0);
    }

    #[test]
    fn stationary_route_has_no_heading() {
        let mut route = eastbound(1);
        route.waypoints.truncate(1);
        route.timing.arrival = Some(t0() + Duration::minutes(5));
        let projected = project_route(&route, &SatelliteCatalog::default(), 60).unwrap();
        assert!(projected.samples.iter().all(|s| s.heading_deg.is_none()));
    }

    #[test]
    fn closest_sample_finds_trigger_position() {
        let route = eastbound(2);
        let projected = project_route(&route, &SatelliteCatalog::default(), 60).unwrap();
        let sample = projected.closest_sample(1.0, 15.0).unwrap();
        assert_eq!(sample.timestamp, t0() + Duration::minutes(90));
    }
}
