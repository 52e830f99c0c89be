//! Constraint and event rule engine.
//!
//! Each generator appends to one flat, unsorted event list. A constraint that
//! cannot be resolved is logged, recorded as an advisory, and skipped; the
//! remaining generators always run.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use linkplan_config::{EngineSettings, MissionManifest, PlannedTransition, TransitionTrigger};
use linkplan_core::units::km_to_m;
use linkplan_core::{SatelliteId, Severity, Transport};
use linkplan_coverage::{SatelliteCatalog, analyze_gaps};
use linkplan_geometry::{BearingRange, look_angles, relative_bearing};

use crate::error::ConstraintError;
use crate::events::{CoverageEdge, Edge, EventKind, LandingStage, MissionEvent};
use crate::route::ProjectedRoute;
use crate::timeline::Advisory;

/// Read-only inputs shared by every generator.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub manifest: &'a MissionManifest,
    pub route: &'a ProjectedRoute,
    pub catalog: &'a SatelliteCatalog,
    pub settings: &'a EngineSettings,
}

#[derive(Debug, Default)]
pub struct RuleOutput {
    pub events: Vec<MissionEvent>,
    pub advisories: Vec<Advisory>,
    pub skipped: Vec<ConstraintError>,
}

impl RuleOutput {
    fn skip(
        &mut self,
        ctx: &RuleContext<'_>,
        transport: Option<Transport>,
        error: ConstraintError,
    ) {
        warn!(
            mission = %ctx.manifest.mission_id,
            error = %error,
            "skipping unresolvable constraint"
        );
        self.advisories.push(Advisory::new(
            ctx.route.window.start,
            transport,
            Severity::Warning,
            format!("constraint skipped: {error}"),
        ));
        self.skipped.push(error);
    }
}

/// Satellite assigned to the steerable transport from `from` onwards.
#[derive(Debug, Clone)]
struct Assignment {
    from: DateTime<Utc>,
    satellite: SatelliteId,
}

#[derive(Debug, Clone)]
struct RefuelingSpan {
    id: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl RefuelingSpan {
    fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

/// Run every generator in a fixed order.
pub fn generate_events(ctx: &RuleContext<'_>) -> RuleOutput {
    let mut out = RuleOutput::default();
    check_initial_assignment(ctx, &mut out);
    let schedule = transition_events(ctx, &mut out);
    buffer_events(ctx, &mut out);
    let refueling = resolve_refueling(ctx);
    let spans: Vec<RefuelingSpan> = refueling
        .iter()
        .filter_map(|span| span.as_ref().ok())
        .cloned()
        .collect();
    azimuth_events(ctx, &schedule, &spans, &mut out);
    coverage_events(ctx, &mut out);
    outage_events(ctx, &mut out);
    refueling_events(ctx, refueling, &mut out);
    debug!(
        mission = %ctx.manifest.mission_id,
        events = out.events.len(),
        skipped = out.skipped.len(),
        "generated mission events"
    );
    out
}

fn check_initial_assignment(ctx: &RuleContext<'_>, out: &mut RuleOutput) {
    for transport in Transport::ALL {
        let Some(id) = ctx.manifest.transports.initial.for_transport(transport) else {
            continue;
        };
        if let Err(error) = expect_transport(ctx.catalog, id, transport) {
            out.skip(ctx, Some(transport), error);
        }
    }
}

fn expect_transport(
    catalog: &SatelliteCatalog,
    id: &SatelliteId,
    expected: Transport,
) -> Result<(), ConstraintError> {
    let satellite = catalog
        .get(id)
        .ok_or_else(|| ConstraintError::UnknownSatellite(id.clone()))?;
    if satellite.transport != expected {
        return Err(ConstraintError::WrongTransport {
            satellite: id.clone(),
            expected,
            actual: satellite.transport,
        });
    }
    Ok(())
}

fn resolve_trigger(
    ctx: &RuleContext<'_>,
    transition: &PlannedTransition,
) -> Result<DateTime<Utc>, ConstraintError> {
    expect_transport(ctx.catalog, &transition.target_satellite, Transport::X)?;
    let unresolved = || ConstraintError::UnresolvedTrigger(transition.id.clone());
    match &transition.trigger {
        TransitionTrigger::Waypoint { name } => ctx
            .route
            .waypoint_time(name)
            .ok_or_else(|| ConstraintError::UnresolvedWaypoint(name.clone())),
        TransitionTrigger::Position {
            latitude_deg,
            longitude_deg,
        } => {
            if !(latitude_deg.is_finite() && longitude_deg.is_finite()) {
                return Err(unresolved());
            }
            ctx.route
                .closest_sample(*latitude_deg, *longitude_deg)
                .map(|sample| sample.timestamp)
                .ok_or_else(unresolved)
        }
        TransitionTrigger::Time { at } if ctx.route.window.contains(*at) => Ok(*at),
        TransitionTrigger::Time { .. } => Err(unresolved()),
    }
}

/// `at - offset`, saturating at the earliest representable instant.
fn before(at: DateTime<Utc>, offset: Duration) -> DateTime<Utc> {
    at.checked_sub_signed(offset).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// `at + offset`, saturating at the latest representable instant.
fn after(at: DateTime<Utc>, offset: Duration) -> DateTime<Utc> {
    at.checked_add_signed(offset).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Planned re-points of the steerable transport. Returns the assignment
/// schedule used by the azimuth evaluator.
fn transition_events(ctx: &RuleContext<'_>, out: &mut RuleOutput) -> Vec<Assignment> {
    let buffer = Duration::minutes(i64::from(ctx.settings.transition_buffer_minutes));
    let mut schedule = Vec::new();
    if let Some(initial) = &ctx.manifest.transports.initial.x {
        schedule.push(Assignment {
            from: ctx.route.window.start,
            satellite: initial.clone(),
        });
    }

    for transition in &ctx.manifest.transports.transitions {
        let planned = match resolve_trigger(ctx, transition) {
            Ok(planned) => planned,
            Err(error) => {
                out.skip(ctx, Some(Transport::X), error);
                continue;
            }
        };
        let target = &transition.target_satellite;
        let reason = format!("X transition {} to {target}", transition.id);
        let edges = [
            (Edge::Start, before(planned, buffer)),
            (Edge::End, after(planned, buffer)),
        ];
        for (edge, at) in edges {
            out.events.push(
                MissionEvent::new(
                    at,
                    EventKind::Transition {
                        edge,
                        transition_id: transition.id.clone(),
                        target: target.clone(),
                    },
                    Transport::X,
                    Severity::Warning,
                    reason.clone(),
                )
                .with_satellite(Some(target.clone()))
                .with_metadata("planned_time", planned.to_rfc3339()),
            );
        }
        out.advisories.push(Advisory::new(
            planned,
            Some(Transport::X),
            Severity::Info,
            format!("planned {reason}"),
        ));
        schedule.push(Assignment {
            from: planned,
            satellite: target.clone(),
        });
    }

    schedule.sort_by_key(|assignment| assignment.from);
    schedule
}

/// Takeoff degrade window and the landing warning / offline pair.
fn buffer_events(ctx: &RuleContext<'_>, out: &mut RuleOutput) {
    let window = ctx.route.window;
    let settings = ctx.settings;

    let takeoff = Duration::minutes(i64::from(settings.takeoff_buffer_minutes));
    if takeoff > Duration::zero() {
        for (edge, at) in [
            (Edge::Start, before(window.start, takeoff)),
            (Edge::End, after(window.start, takeoff)),
        ] {
            out.events.push(
                MissionEvent::new(
                    at,
                    EventKind::TakeoffBuffer { edge },
                    Transport::X,
                    Severity::Warning,
                    "takeoff buffer",
                )
                .with_metadata("departure", window.start.to_rfc3339()),
            );
        }
    }

    let stages = [
        (
            LandingStage::Warning,
            settings.landing_warning_minutes,
            Severity::Warning,
            "landing buffer",
        ),
        (
            LandingStage::Critical,
            settings.landing_offline_minutes,
            Severity::Critical,
            "landing: steerable link offline until arrival",
        ),
    ];
    for (stage, lead_minutes, severity, reason) in stages {
        let at = before(window.end, Duration::minutes(i64::from(lead_minutes)));
        out.events.push(
            MissionEvent::new(
                at,
                EventKind::LandingBuffer { stage },
                Transport::X,
                severity,
                reason,
            )
            .with_metadata("arrival", window.end.to_rfc3339())
            .with_metadata("lead_minutes", lead_minutes),
        );
    }
}

fn resolve_refueling(ctx: &RuleContext<'_>) -> Vec<Result<RefuelingSpan, ConstraintError>> {
    let waypoint = |name: &str| {
        ctx.route
            .waypoint_time(name)
            .ok_or_else(|| ConstraintError::UnresolvedWaypoint(name.to_string()))
    };
    ctx.manifest
        .transports
        .refueling_windows
        .iter()
        .map(|window| {
            let start = waypoint(&window.start_waypoint)?;
            let end = waypoint(&window.end_waypoint)?;
            if end <= start {
                return Err(ConstraintError::InvalidRefuelingWindow(window.id.clone()));
            }
            Ok(RefuelingSpan {
                id: window.id.clone(),
                start,
                end,
            })
        })
        .collect()
}

fn steerable_longitude(
    catalog: &SatelliteCatalog,
    id: &SatelliteId,
) -> Result<f64, ConstraintError> {
    expect_transport(catalog, id, Transport::X)?;
    catalog
        .get(id)
        .and_then(|satellite| satellite.longitude_deg)
        .filter(|longitude| longitude.is_finite())
        .ok_or_else(|| ConstraintError::MissingLongitude(id.clone()))
}

struct Violation {
    satellite: SatelliteId,
    relative_bearing_deg: f64,
    cone: BearingRange,
    refueling: bool,
}

struct OpenRun {
    satellite: SatelliteId,
    last_bearing_deg: f64,
    refueling: bool,
}

/// Forbidden-cone checks at every sample with a heading. Consecutive
/// violating samples against one satellite in one cone mode form a single
/// start/end run; a mode change ends the run and starts a new one.
fn azimuth_events(
    ctx: &RuleContext<'_>,
    schedule: &[Assignment],
    refueling: &[RefuelingSpan],
    out: &mut RuleOutput,
) {
    if schedule.is_empty() {
        return;
    }
    let satellite_altitude_m = km_to_m(ctx.settings.geostationary_altitude_km);
    let mut reported: BTreeSet<SatelliteId> = BTreeSet::new();
    let mut open: Option<OpenRun> = None;

    for sample in &ctx.route.samples {
        let assigned = schedule
            .iter()
            .rev()
            .find(|assignment| assignment.from <= sample.timestamp)
            .map(|assignment| &assignment.satellite);

        let violation = match (assigned, sample.heading_deg) {
            (Some(id), Some(heading)) => match steerable_longitude(ctx.catalog, id) {
                Ok(longitude) => {
                    let angles = look_angles(
                        sample.latitude_deg,
                        sample.longitude_deg,
                        sample.altitude_m,
                        longitude,
                        satellite_altitude_m,
                    );
                    let relative = relative_bearing(angles.azimuth_deg, heading);
                    let in_refueling = refueling.iter().any(|span| span.contains(sample.timestamp));
                    let cone = if in_refueling {
                        ctx.settings.refueling_forbidden_cone
                    } else {
                        ctx.settings.normal_forbidden_cone
                    };
                    cone.contains(relative).then(|| Violation {
                        satellite: id.clone(),
                        relative_bearing_deg: relative,
                        cone,
                        refueling: in_refueling,
                    })
                }
                Err(error) => {
                    if reported.insert(id.clone()) {
                        out.skip(ctx, Some(Transport::X), error);
                    }
                    None
                }
            },
            _ => None,
        };

        if let (Some(run), Some(found)) = (open.as_mut(), &violation) {
            if run.satellite == found.satellite && run.refueling == found.refueling {
                run.last_bearing_deg = found.relative_bearing_deg;
                continue;
            }
        }

        if let Some(OpenRun {
            satellite,
            last_bearing_deg: last_bearing,
            ..
        }) = open.take()
        {
            out.events.push(
                MissionEvent::new(
                    sample.timestamp,
                    EventKind::AzimuthViolation {
                        edge: Edge::End,
                        satellite: satellite.clone(),
                        relative_bearing_deg: last_bearing,
                    },
                    Transport::X,
                    Severity::Info,
                    format!("X bearing to {satellite} clear of forbidden cone"),
                )
                .with_satellite(Some(satellite)),
            );
        }
        if let Some(found) = violation {
            let mode = if found.refueling { "refueling" } else { "normal" };
            let reason = format!(
                "X azimuth violation: relative bearing {:.1} deg to {} inside {mode} forbidden cone {:.0}-{:.0} deg",
                found.relative_bearing_deg, found.satellite, found.cone.min_deg, found.cone.max_deg
            );
            out.events.push(
                MissionEvent::new(
                    sample.timestamp,
                    EventKind::AzimuthViolation {
                        edge: Edge::Start,
                        satellite: found.satellite.clone(),
                        relative_bearing_deg: found.relative_bearing_deg,
                    },
                    Transport::X,
                    Severity::Warning,
                    reason,
                )
                .with_satellite(Some(found.satellite.clone()))
                .with_metadata("mode", mode),
            );
            open = Some(OpenRun {
                satellite: found.satellite,
                last_bearing_deg: found.relative_bearing_deg,
                refueling: found.refueling,
            });
        }
    }
}

/// Coverage gaps for every transport with a coverage model, plus swap and
/// antimeridian advisories.
fn coverage_events(ctx: &RuleContext<'_>, out: &mut RuleOutput) {
    for transport in [Transport::Ka, Transport::Ku] {
        if !ctx.catalog.has_coverage_model(transport) {
            continue;
        }
        let candidates = ctx.catalog.satellites_of(transport);
        let analysis = analyze_gaps(
            &ctx.route.samples,
            &candidates,
            ctx.settings.antimeridian_swing_deg,
        );

        for (gap_index, gap) in analysis.gaps.iter().enumerate() {
            let lost = gap.lost.as_ref().map_or("unknown", SatelliteId::as_str);
            let reason = format!("{transport} coverage gap after leaving {lost}");
            out.events.push(
                MissionEvent::new(
                    gap.start,
                    EventKind::Coverage {
                        edge: CoverageEdge::Exit,
                        gap_index,
                    },
                    transport,
                    Severity::Warning,
                    reason.clone(),
                )
                .with_satellite(gap.lost.clone())
                .with_metadata("longitude_deg", format!("{:.3}", gap.start_longitude_deg)),
            );
            if let Some(end) = gap.end {
                out.events.push(
                    MissionEvent::new(
                        end,
                        EventKind::Coverage {
                            edge: CoverageEdge::Entry,
                            gap_index,
                        },
                        transport,
                        Severity::Info,
                        reason,
                    )
                    .with_satellite(gap.regained.clone()),
                );
            }
        }

        for gap in &analysis.suppressed {
            let satellite = gap.lost.as_ref().map_or("unknown", SatelliteId::as_str);
            out.advisories.push(Advisory::new(
                gap.start,
                Some(transport),
                Severity::Info,
                format!("{transport} coverage flicker on {satellite} across the antimeridian ignored"),
            ));
        }
        for swap in &analysis.swaps {
            out.advisories.push(Advisory::new(
                swap.midpoint,
                Some(transport),
                Severity::Info,
                format!("recommended {transport} swap {} -> {}", swap.from, swap.to),
            ));
        }
    }
}

/// Operator outage windows keyed by id; repeated ids are dropped.
fn outage_events(ctx: &RuleContext<'_>, out: &mut RuleOutput) {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for outage in &ctx.manifest.transports.outages {
        if !seen.insert(outage.id.as_str()) {
            debug!(outage = %outage.id, "duplicate outage id ignored");
            continue;
        }
        if outage.transport == Transport::X {
            out.skip(
                ctx,
                Some(outage.transport),
                ConstraintError::UnsupportedOutageTransport {
                    id: outage.id.clone(),
                    transport: outage.transport,
                },
            );
            continue;
        }
        if outage.end <= outage.start {
            out.skip(
                ctx,
                Some(outage.transport),
                ConstraintError::InvalidOutageWindow(outage.id.clone()),
            );
            continue;
        }

        let reason = outage
            .reason
            .clone()
            .unwrap_or_else(|| format!("manual outage {}", outage.id));
        for (edge, at) in [(Edge::Start, outage.start), (Edge::End, outage.end)] {
            out.events.push(
                MissionEvent::new(
                    at,
                    EventKind::ManualOutage {
                        edge,
                        outage_id: outage.id.clone(),
                    },
                    outage.transport,
                    Severity::Critical,
                    reason.clone(),
                )
                .affecting(outage.affected_transport),
            );
        }
    }
}

fn refueling_events(
    ctx: &RuleContext<'_>,
    resolved: Vec<Result<RefuelingSpan, ConstraintError>>,
    out: &mut RuleOutput,
) {
    for span in resolved {
        let span = match span {
            Ok(span) => span,
            Err(error) => {
                out.skip(ctx, Some(Transport::X), error);
                continue;
            }
        };
        let reason = format!("air-to-air refueling window {}", span.id);
        for (edge, at) in [(Edge::Start, span.start), (Edge::End, span.end)] {
            out.events.push(MissionEvent::new(
                at,
                EventKind::RefuelingWindow {
                    edge,
                    window_id: span.id.clone(),
                },
                Transport::X,
                Severity::Safety,
                reason.clone(),
            ));
        }
    }
}
