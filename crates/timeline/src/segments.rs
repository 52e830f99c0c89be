//! Cross-transport timeline segments.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use linkplan_core::{TimelineStatus, Transport, TransportState};

use crate::route::MissionWindow;
use crate::state::AvailabilityIntervals;

/// Span during which no transport changes state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineSegment {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: TimelineStatus,
    pub states: BTreeMap<Transport, TransportState>,
    pub reasons: Vec<String>,
    pub impacted: Vec<Transport>,
    pub metadata: BTreeMap<String, String>,
}

impl TimelineSegment {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn is_nominal(&self) -> bool {
        self.status == TimelineStatus::Nominal
    }
}

/// Merge the three interval sequences into ordered segments.
///
/// Boundaries are the de-duplicated union of every interval boundary inside
/// the window. Each segment takes the state each transport holds at its
/// start instant. Inputs are only read, so repeated calls agree.
pub fn build_segments(
    mission_id: &str,
    intervals: &AvailabilityIntervals,
    window: &MissionWindow,
) -> Vec<TimelineSegment> {
    let mut boundaries: BTreeSet<DateTime<Utc>> = BTreeSet::new();
    boundaries.insert(window.start);
    boundaries.insert(window.end);
    for transport in Transport::ALL {
        for interval in intervals.get(transport) {
            boundaries.insert(interval.start);
            if let Some(end) = interval.end {
                boundaries.insert(end);
            }
        }
    }
    let boundaries: Vec<DateTime<Utc>> = boundaries
        .into_iter()
        .filter(|at| window.contains(*at))
        .collect();

    let mut segments = Vec::with_capacity(boundaries.len().saturating_sub(1));
    for pair in boundaries.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        if end <= start {
            continue;
        }

        let mut states = BTreeMap::new();
        let mut impacted = Vec::new();
        let mut reasons: Vec<String> = Vec::new();
        for transport in Transport::ALL {
            let interval = intervals.at(transport, start);
            let state = interval.map(|i| i.state).unwrap_or_default();
            states.insert(transport, state);
            if state != TransportState::Available {
                impacted.push(transport);
            }
            for reason in interval.into_iter().flat_map(|i| i.reasons.iter()) {
                if !reasons.contains(reason) {
                    reasons.push(reason.clone());
                }
            }
        }

        let mut metadata = BTreeMap::new();
        metadata.insert(
            "duration_seconds".to_string(),
            (end - start).num_seconds().to_string(),
        );
        segments.push(TimelineSegment {
            id: format!("{mission_id}-seg-{:03}", segments.len() + 1),
            start,
            end,
            status: TimelineStatus::from_impacted(impacted.len()),
            states,
            reasons,
            impacted,
            metadata,
        });
    }
    segments
}
