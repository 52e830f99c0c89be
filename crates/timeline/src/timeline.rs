//! Assembled mission timeline with advisories and aggregate statistics.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use linkplan_core::{Severity, TimelineStatus, Transport};

use crate::events::MissionEvent;
use crate::route::MissionWindow;
use crate::segments::TimelineSegment;
use crate::state::AvailabilityIntervals;

/// Human-readable, timestamped annotation outside the interval state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advisory {
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<Transport>,
    pub severity: Severity,
    pub message: String,
}

impl Advisory {
    pub fn new(
        timestamp: DateTime<Utc>,
        transport: Option<Transport>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            transport,
            severity,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimelineStatistics {
    pub nominal_seconds: i64,
    pub degraded_seconds: i64,
    pub critical_seconds: i64,
    /// Seconds from mission start to the first non-nominal segment.
    pub next_conflict_seconds: Option<i64>,
}

impl TimelineStatistics {
    pub fn from_segments(segments: &[TimelineSegment], window: &MissionWindow) -> Self {
        let mut stats = Self::default();
        for segment in segments {
            let seconds = segment.duration().num_seconds();
            match segment.status {
                TimelineStatus::Nominal => stats.nominal_seconds += seconds,
                TimelineStatus::Degraded => stats.degraded_seconds += seconds,
                TimelineStatus::Critical => stats.critical_seconds += seconds,
            }
        }
        stats.next_conflict_seconds = segments
            .iter()
            .find(|segment| !segment.is_nominal())
            .map(|segment| (segment.start - window.start).num_seconds());
        stats
    }

    pub fn total_seconds(&self) -> i64 {
        self.nominal_seconds + self.degraded_seconds + self.critical_seconds
    }
}

/// Result of one leg computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionTimeline {
    pub mission_id: String,
    pub window: MissionWindow,
    pub segments: Vec<TimelineSegment>,
    pub intervals: AvailabilityIntervals,
    /// Generated events in timestamp order.
    pub events: Vec<MissionEvent>,
    pub advisories: Vec<Advisory>,
    pub statistics: TimelineStatistics,
}

impl MissionTimeline {
    pub fn assemble(
        mission_id: impl Into<String>,
        window: MissionWindow,
        segments: Vec<TimelineSegment>,
        intervals: AvailabilityIntervals,
        mut events: Vec<MissionEvent>,
        mut advisories: Vec<Advisory>,
    ) -> Self {
        events.sort_by_key(|event| event.timestamp);
        advisories.extend(conflict_advisories(&segments));
        advisories.sort_by_key(|advisory| advisory.timestamp);
        let statistics = TimelineStatistics::from_segments(&segments, &window);
        Self {
            mission_id: mission_id.into(),
            window,
            segments,
            intervals,
            events,
            advisories,
            statistics,
        }
    }

    /// Time until the next non-nominal segment still running at or after `now`.
    ///
    /// Zero while a conflict is in progress; `None` when none remain.
    pub fn next_conflict_after(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.segments
            .iter()
            .find(|segment| !segment.is_nominal() && segment.end > now)
            .map(|segment| (segment.start - now).max(Duration::zero()))
    }

    pub fn status_at(&self, at: DateTime<Utc>) -> Option<TimelineStatus> {
        self.segments
            .iter()
            .find(|segment| at >= segment.start && at < segment.end)
            .map(|segment| segment.status)
    }
}

/// One advisory at the start of each run of consecutive non-nominal segments.
fn conflict_advisories(segments: &[TimelineSegment]) -> Vec<Advisory> {
    let mut advisories = Vec::new();
    let mut index = 0;
    while index < segments.len() {
        if segments[index].is_nominal() {
            index += 1;
            continue;
        }
        let run_start = index;
        while index < segments.len() && !segments[index].is_nominal() {
            index += 1;
        }
        let run = &segments[run_start..index];
        let worst = run
            .iter()
            .map(|segment| segment.status)
            .max()
            .unwrap_or(TimelineStatus::Degraded);
        let mut impacted: Vec<Transport> = Vec::new();
        let mut reasons: Vec<&str> = Vec::new();
        for segment in run {
            for transport in &segment.impacted {
                if !impacted.contains(transport) {
                    impacted.push(*transport);
                }
            }
            for reason in &segment.reasons {
                if !reasons.contains(&reason.as_str()) {
                    reasons.push(reason.as_str());
                }
            }
        }
        let labels: Vec<&str> = impacted.iter().map(|t| t.label()).collect();
        let severity = match worst {
            TimelineStatus::Critical => Severity::Critical,
            _ => Severity::Warning,
        };
        let first = &run[0];
        let last = &run[run.len() - 1];
        advisories.push(Advisory::new(
            first.start,
            None,
            severity,
            format!(
                "{worst} from {} to {} on {}: {}",
                first.start.format("%H:%MZ"),
                last.end.format("%H:%MZ"),
                labels.join(", "),
                reasons.join("; ")
            ),
        ));
    }
    advisories
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn segment(start: i64, end: i64, status: TimelineStatus) -> TimelineSegment {
        let impacted = match status {
            TimelineStatus::Nominal => vec![],
            TimelineStatus::Degraded => vec![Transport::X],
            TimelineStatus::Critical => vec![Transport::X, Transport::Ka],
        };
        TimelineSegment {
            id: format!("seg-{start}"),
            start: at(start),
            end: at(end),
            status,
            states: BTreeMap::new(),
            reasons: vec!["landing".to_string()],
            impacted,
            metadata: BTreeMap::new(),
        }
    }

    fn timeline() -> MissionTimeline {
        let window = MissionWindow::new(at(0), at(120)).unwrap();
        let segments = vec![
            segment(0, 30, TimelineStatus::Nominal),
            segment(30, 45, TimelineStatus::Degraded),
            segment(45, 60, TimelineStatus::Critical),
            segment(60, 90, TimelineStatus::Nominal),
            segment(90, 120, TimelineStatus::Degraded),
        ];
        MissionTimeline::assemble(
            "LEG",
            window,
            segments,
            AvailabilityIntervals::default(),
            Vec::new(),
            Vec::new(),
        )
    }

    #[test]
    fn statistics_partition_the_window() {
        let stats = timeline().statistics;
        assert_eq!(stats.nominal_seconds, 60 * 60);
        assert_eq!(stats.degraded_seconds, 45 * 60);
        assert_eq!(stats.critical_seconds, 15 * 60);
        assert_eq!(stats.total_seconds(), 120 * 60);
        assert_eq!(stats.next_conflict_seconds, Some(30 * 60));
    }

    #[test]
    fn one_advisory_per_conflict_run() {
        let timeline = timeline();
        assert_eq!(timeline.advisories.len(), 2);
        assert_eq!(timeline.advisories[0].timestamp, at(30));
        assert_eq!(timeline.advisories[0].severity, Severity::Critical);
        assert!(timeline.advisories[0].message.contains("X, Ka"));
        assert_eq!(timeline.advisories[1].severity, Severity::Warning);
    }

    #[test]
    fn countdown_to_next_conflict() {
        let timeline = timeline();
        assert_eq!(timeline.next_conflict_after(at(10)), Some(Duration::minutes(20)));
        assert_eq!(timeline.next_conflict_after(at(40)), Some(Duration::zero()));
        assert_eq!(timeline.next_conflict_after(at(70)), Some(Duration::minutes(20)));
        assert_eq!(timeline.next_conflict_after(at(120)), None);
        assert_eq!(timeline.status_at(at(50)), Some(TimelineStatus::Critical));
    }
}
