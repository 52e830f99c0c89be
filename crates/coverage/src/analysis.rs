//! Coverage transitions, gaps, and swap opportunities along a sampled route.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use linkplan_core::SatelliteId;

/// One interpolated point of a timed route with its covering satellites.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSample {
    pub distance_m: f64,
    pub timestamp: DateTime<Utc>,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
    pub heading_deg: Option<f64>,
    pub covering: BTreeSet<SatelliteId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Entered,
    Exited,
}

/// A satellite entering or leaving the covering set between two samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageTransition {
    pub timestamp: DateTime<Utc>,
    pub satellite: SatelliteId,
    pub kind: TransitionKind,
}

/// Diff the covering sets of samples spaced at least `interval_seconds` apart.
///
/// The first retained sample is diffed against an empty set, so satellites
/// covering the departure point appear as entries.
pub fn sample_route_coverage(
    samples: &[RouteSample],
    interval_seconds: u32,
) -> Vec<CoverageTransition> {
    let interval = Duration::seconds(i64::from(interval_seconds.max(1)));
    let mut transitions = Vec::new();
    let mut previous: BTreeSet<SatelliteId> = BTreeSet::new();
    let mut last_time: Option<DateTime<Utc>> = None;

    for sample in samples {
        if let Some(last) = last_time {
            if sample.timestamp - last < interval {
                continue;
            }
        }
        last_time = Some(sample.timestamp);

        for satellite in previous.difference(&sample.covering) {
            transitions.push(CoverageTransition {
                timestamp: sample.timestamp,
                satellite: satellite.clone(),
                kind: TransitionKind::Exited,
            });
        }
        for satellite in sample.covering.difference(&previous) {
            transitions.push(CoverageTransition {
                timestamp: sample.timestamp,
                satellite: satellite.clone(),
                kind: TransitionKind::Entered,
            });
        }
        previous = sample.covering.clone();
    }
    transitions
}

/// Span during which none of the candidate satellites covered the route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageGap {
    pub start: DateTime<Utc>,
    /// `None` when coverage never returned before the last sample.
    pub end: Option<DateTime<Utc>>,
    pub lost: Option<SatelliteId>,
    pub regained: Option<SatelliteId>,
    pub start_longitude_deg: f64,
    pub end_longitude_deg: Option<f64>,
}

/// Window where exactly two candidate satellites overlap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapOpportunity {
    pub from: SatelliteId,
    pub to: SatelliteId,
    pub overlap_start: DateTime<Utc>,
    pub overlap_end: DateTime<Utc>,
    /// Recommended swap instant.
    pub midpoint: DateTime<Utc>,
}

/// Gap and swap findings for one transport's satellites.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GapAnalysis {
    pub gaps: Vec<CoverageGap>,
    /// Gaps discarded as antimeridian sampling artifacts.
    pub suppressed: Vec<CoverageGap>,
    pub swaps: Vec<SwapOpportunity>,
}

struct OpenOverlap {
    start: DateTime<Utc>,
    pair: (SatelliteId, SatelliteId),
    from: Option<SatelliteId>,
}

/// Scan consecutive samples restricted to `candidates`.
///
/// A gap opens when the filtered covering set empties after being non-empty
/// and closes when coverage returns. The lost satellite is the last one that
/// served alone, when it was still covering. A gap that regains any
/// satellite covering just before it opened, across a longitude swing above
/// `swing_threshold_deg`, is moved to [`GapAnalysis::suppressed`].
pub fn analyze_gaps(
    samples: &[RouteSample],
    candidates: &BTreeSet<SatelliteId>,
    swing_threshold_deg: f64,
) -> GapAnalysis {
    let mut analysis = GapAnalysis::default();
    let mut previous: BTreeSet<SatelliteId> = BTreeSet::new();
    let mut open_gap: Option<CoverageGap> = None;
    let mut lost_set: BTreeSet<SatelliteId> = BTreeSet::new();
    let mut overlap: Option<OpenOverlap> = None;
    let mut last_single: Option<SatelliteId> = None;

    for sample in samples {
        let current: BTreeSet<SatelliteId> = sample
            .covering
            .intersection(candidates)
            .cloned()
            .collect();

        match open_gap.take() {
            None if current.is_empty() && !previous.is_empty() => {
                let lost = last_single
                    .clone()
                    .filter(|id| previous.contains(id))
                    .or_else(|| previous.iter().next().cloned());
                lost_set = previous.clone();
                open_gap = Some(CoverageGap {
                    start: sample.timestamp,
                    end: None,
                    lost,
                    regained: None,
                    start_longitude_deg: sample.longitude_deg,
                    end_longitude_deg: None,
                });
            }
            Some(mut gap) if !current.is_empty() => {
                let regained = gap
                    .lost
                    .clone()
                    .filter(|lost| current.contains(lost))
                    .or_else(|| lost_set.intersection(&current).next().cloned())
                    .or_else(|| current.iter().next().cloned());
                let same_satellite = regained.as_ref().is_some_and(|id| lost_set.contains(id));
                if same_satellite {
                    gap.lost = regained.clone();
                }
                gap.end = Some(sample.timestamp);
                gap.regained = regained;
                gap.end_longitude_deg = Some(sample.longitude_deg);

                let swing = (sample.longitude_deg - gap.start_longitude_deg).abs();
                if same_satellite && swing > swing_threshold_deg {
                    analysis.suppressed.push(gap);
                } else {
                    analysis.gaps.push(gap);
                }
            }
            other => open_gap = other,
        }

        let members: Vec<SatelliteId> = current.iter().cloned().collect();
        if let [a, b] = members.as_slice() {
            let pair = (a.clone(), b.clone());
            let same_pair = overlap.as_ref().is_some_and(|open| open.pair == pair);
            if !same_pair {
                if let Some(open) = overlap.take() {
                    analysis.swaps.push(close_overlap(open, sample.timestamp));
                }
                overlap = Some(OpenOverlap {
                    start: sample.timestamp,
                    pair,
                    from: last_single.clone(),
                });
            }
        } else if let Some(open) = overlap.take() {
            analysis.swaps.push(close_overlap(open, sample.timestamp));
        }

        if current.len() == 1 {
            last_single = current.iter().next().cloned();
        }
        previous = current;
    }

    if let Some(gap) = open_gap {
        analysis.gaps.push(gap);
    }
    if let (Some(open), Some(last)) = (overlap, samples.last()) {
        if last.timestamp > open.start {
            analysis.swaps.push(close_overlap(open, last.timestamp));
        }
    }
    analysis
}

fn close_overlap(open: OpenOverlap, end: DateTime<Utc>) -> SwapOpportunity {
    let (a, b) = open.pair;
    let (from, to) = match open.from {
        Some(from) if from == b => (b, a),
        _ => (a, b),
    };
    SwapOpportunity {
        from,
        to,
        overlap_start: open.start,
        overlap_end: end,
        midpoint: open.start + (end - open.start) / 2,
    }
}
