//! Leg orchestration: one synchronous pipeline per leg, many legs on a bounded pool.

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use linkplan_config::{EngineSettings, MissionManifest};
use linkplan_coverage::{SatelliteCatalog, sample_route_coverage};

use crate::error::ComputationError;
use crate::route::project_route;
use crate::rules::{RuleContext, generate_events};
use crate::segments::build_segments;
use crate::state::build_intervals;
use crate::timeline::MissionTimeline;

/// Compute the availability timeline of a single leg.
///
/// Pure and synchronous: the catalog is only read, every intermediate value
/// is owned by this call. Fails before sampling when the settings or the
/// route timing cannot produce a mission window.
pub fn compute_leg(
    manifest: &MissionManifest,
    catalog: &SatelliteCatalog,
    settings: &EngineSettings,
) -> Result<MissionTimeline, ComputationError> {
    settings
        .validate()
        .map_err(|err| ComputationError::InvalidSettings(err.to_string()))?;

    let route = project_route(&manifest.route, catalog, settings.sampling_interval_seconds)?;
    let transitions = sample_route_coverage(&route.samples, settings.sampling_interval_seconds);
    debug!(
        mission = %manifest.mission_id,
        samples = route.samples.len(),
        coverage_transitions = transitions.len(),
        "projected route"
    );

    let rules = generate_events(&RuleContext {
        manifest,
        route: &route,
        catalog,
        settings,
    });
    let intervals = build_intervals(&rules.events, &route.window);
    let segments = build_segments(&manifest.mission_id, &intervals, &route.window);
    let timeline = MissionTimeline::assemble(
        manifest.mission_id.clone(),
        route.window,
        segments,
        intervals,
        rules.events,
        rules.advisories,
    );

    debug!(
        mission = %timeline.mission_id,
        segments = timeline.segments.len(),
        nominal_s = timeline.statistics.nominal_seconds,
        degraded_s = timeline.statistics.degraded_seconds,
        critical_s = timeline.statistics.critical_seconds,
        "computed leg timeline"
    );
    Ok(timeline)
}

/// Options for [`compute_legs`].
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Worker threads; `None` lets rayon size the pool.
    pub max_workers: Option<usize>,
}

/// Outcome of one leg in a batch.
#[derive(Debug, Clone)]
pub struct LegOutcome {
    pub mission_id: String,
    pub result: Result<MissionTimeline, ComputationError>,
}

impl LegOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Compute many independent legs on a bounded worker pool.
///
/// Outcomes keep the input order. A failed leg only yields its own error.
pub fn compute_legs(
    manifests: &[MissionManifest],
    catalog: &SatelliteCatalog,
    settings: &EngineSettings,
    options: &BatchOptions,
) -> Result<Vec<LegOutcome>, BatchError> {
    let mut builder = ThreadPoolBuilder::new();
    if let Some(workers) = options.max_workers {
        builder = builder.num_threads(workers.max(1));
    }
    let pool = builder.build()?;

    let outcomes: Vec<LegOutcome> = pool.install(|| {
        manifests
            .par_iter()
            .map(|manifest| LegOutcome {
                mission_id: manifest.mission_id.clone(),
                result: compute_leg(manifest, catalog, settings),
            })
            .collect()
    });

    let failed = outcomes.iter().filter(|outcome| !outcome.is_ok()).count();
    for outcome in &outcomes {
        if let Err(err) = &outcome.result {
            warn!(mission = %outcome.mission_id, error = %err, "leg computation failed");
        }
    }
    info!(
        legs = outcomes.len(),
        failed,
        workers = pool.current_num_threads(),
        "batch complete"
    );
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use linkplan_config::{TimedRoute, TimingProfile, Waypoint};

    fn manifest(id: &str, arrival_minutes: Option<i64>) -> MissionManifest {
        let t0: DateTime<Utc> = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        MissionManifest {
            mission_id: id.into(),
            route: TimedRoute {
                waypoints: vec![
                    Waypoint {
                        name: Some("ORIG".into()),
                        latitude_deg: 50.0,
                        longitude_deg: 8.0,
                        altitude_m: 0.0,
                        eta: None,
                    },
                    Waypoint {
                        name: Some("DEST".into()),
                        latitude_deg: 52.0,
                        longitude_deg: 13.0,
                        altitude_m: 0.0,
                        eta: None,
                    },
                ],
                timing: TimingProfile {
                    departure: Some(t0),
                    arrival: arrival_minutes.map(|m| t0 + Duration::minutes(m)),
                    adjusted_departure_minutes: None,
                },
            },
            transports: Default::default(),
        }
    }

    #[test]
    fn leg_without_arrival_fails() {
        let result = compute_leg(
            &manifest("LEG", None),
            &SatelliteCatalog::default(),
            &EngineSettings::default(),
        );
        assert_eq!(result.unwrap_err(), ComputationError::MissingTiming("arrival"));
    }

    #[test]
    fn invalid_settings_fail_the_leg() {
        let settings = EngineSettings {
            sampling_interval_seconds: 0,
            ..EngineSettings::default()
        };
        let result = compute_leg(
            &manifest("LEG", Some(60)),
            &SatelliteCatalog::default(),
            &settings,
        );
        assert!(matches!(result, Err(ComputationError::InvalidSettings(_))));
    }

    #[test]
    fn leg_near_the_end_of_time_saturates_buffers() {
        let mut leg = manifest("LATE", Some(60));
        let departure = leg.route.timing.departure.unwrap();
        let room = DateTime::<Utc>::MAX_UTC - departure - Duration::days(1);
        leg.route.timing.adjusted_departure_minutes = Some(room.num_minutes());
        let settings = EngineSettings {
            takeoff_buffer_minutes: u32::MAX,
            transition_buffer_minutes: u32::MAX,
            ..EngineSettings::default()
        };
        let timeline = compute_leg(&leg, &SatelliteCatalog::default(), &settings)
            .expect("leg computes");
        assert_eq!(timeline.statistics.total_seconds(), 60 * 60);
        assert_eq!(timeline.statistics.next_conflict_seconds, Some(0));
    }

    #[test]
    fn unrepresentable_shift_fails_only_its_leg() {
        let mut shifted = manifest("SHIFTED", Some(60));
        shifted.route.timing.adjusted_departure_minutes = Some(i64::MAX / 2);
        let manifests = vec![manifest("A", Some(60)), shifted, manifest("C", Some(60))];
        let outcomes = compute_legs(
            &manifests,
            &SatelliteCatalog::default(),
            &EngineSettings::default(),
            &BatchOptions {
                max_workers: Some(2),
            },
        )
        .unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(matches!(
            outcomes[1].result,
            Err(ComputationError::InvalidTiming(_))
        ));
        assert!(outcomes[0].is_ok());
        assert!(outcomes[2].is_ok());
    }

    #[test]
    fn batch_isolates_failures_and_keeps_order() {
        let manifests = vec![
            manifest("A", Some(60)),
            manifest("B", None),
            manifest("C", Some(90)),
        ];
        let outcomes = compute_legs(
            &manifests,
            &SatelliteCatalog::default(),
            &EngineSettings::default(),
            &BatchOptions {
                max_workers: Some(2),
            },
        )
        .unwrap();
        let ids: Vec<_> = outcomes.iter().map(|o| o.mission_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert!(outcomes[0].is_ok());
        assert!(!outcomes[1].is_ok());
        let timeline = outcomes[2].result.as_ref().unwrap();
        assert_eq!(timeline.statistics.total_seconds(), 90 * 60);
    }
}
