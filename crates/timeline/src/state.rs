//! Per-transport availability state machine.
//!
//! Each transport keeps three keyed condition registries (offline, degraded,
//! safety). Events are sorted once, then applied in a single pass; interval
//! boundaries are cut whenever the derived state or its active reasons change.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use linkplan_core::{Transport, TransportState};

use crate::events::{CoverageEdge, Edge, EventKind, LandingStage, MissionEvent};
use crate::route::MissionWindow;

/// Contiguous span in which one transport holds a single state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransportInterval {
    pub transport: Transport,
    pub state: TransportState,
    pub start: DateTime<Utc>,
    /// `None` only while the interval is still open.
    pub end: Option<DateTime<Utc>>,
    pub reasons: Vec<String>,
}

impl TransportInterval {
    pub fn duration(&self) -> Option<Duration> {
        self.end.map(|end| end - self.start)
    }

    /// Whether `at` falls in `[start, end)`; an open interval extends forever.
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && self.end.is_none_or(|end| at < end)
    }
}

/// Interval sequences for all three transports.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AvailabilityIntervals {
    pub x: Vec<TransportInterval>,
    pub ka: Vec<TransportInterval>,
    pub ku: Vec<TransportInterval>,
}

impl AvailabilityIntervals {
    pub fn get(&self, transport: Transport) -> &[TransportInterval] {
        match transport {
            Transport::X => &self.x,
            Transport::Ka => &self.ka,
            Transport::Ku => &self.ku,
        }
    }

    fn get_mut(&mut self, transport: Transport) -> &mut Vec<TransportInterval> {
        match transport {
            Transport::X => &mut self.x,
            Transport::Ka => &mut self.ka,
            Transport::Ku => &mut self.ku,
        }
    }

    /// Interval of `transport` covering `at`.
    pub fn at(&self, transport: Transport, at: DateTime<Utc>) -> Option<&TransportInterval> {
        self.get(transport)
            .iter()
            .find(|interval| interval.covers(at))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Registry {
    Offline,
    Degraded,
    Safety,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Update {
    Activate(Registry, String),
    Deactivate(Registry, String),
}

fn toggle(edge: Edge, registry: Registry, key: String) -> Update {
    match edge {
        Edge::Start => Update::Activate(registry, key),
        Edge::End => Update::Deactivate(registry, key),
    }
}

/// Registry updates an event requests.
fn updates_for(kind: &EventKind) -> Vec<Update> {
    match kind {
        EventKind::Transition { edge, target, .. } => {
            vec![toggle(*edge, Registry::Degraded, format!("transition:{target}"))]
        }
        EventKind::TakeoffBuffer { edge } => {
            vec![toggle(*edge, Registry::Degraded, "takeoff".to_string())]
        }
        EventKind::LandingBuffer {
            stage: LandingStage::Warning,
        } => vec![Update::Activate(Registry::Degraded, "landing".to_string())],
        EventKind::LandingBuffer {
            stage: LandingStage::Critical,
        } => vec![
            Update::Deactivate(Registry::Degraded, "landing".to_string()),
            Update::Activate(Registry::Offline, "landing".to_string()),
        ],
        EventKind::AzimuthViolation {
            edge, satellite, ..
        } => vec![toggle(
            *edge,
            Registry::Degraded,
            format!("azimuth:{satellite}"),
        )],
        EventKind::Coverage { edge, gap_index } => {
            let key = format!("coverage:{gap_index}");
            match edge {
                CoverageEdge::Exit => vec![Update::Activate(Registry::Degraded, key)],
                CoverageEdge::Entry => vec![Update::Deactivate(Registry::Degraded, key)],
            }
        }
        EventKind::ManualOutage { edge, outage_id } => {
            vec![toggle(*edge, Registry::Offline, format!("outage:{outage_id}"))]
        }
        EventKind::RefuelingWindow { edge, window_id } => {
            vec![toggle(*edge, Registry::Safety, format!("aar:{window_id}"))]
        }
    }
}

/// Keyed, insertion-ordered set of active conditions.
#[derive(Debug, Default)]
struct ConditionRegistry {
    entries: Vec<(String, String)>,
}

impl ConditionRegistry {
    fn activate(&mut self, key: String, reason: &str) -> bool {
        if self.entries.iter().any(|(existing, _)| *existing == key) {
            return false;
        }
        self.entries.push((key, reason.to_string()));
        true
    }

    fn deactivate(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| existing != key);
        self.entries.len() != before
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn reasons(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, reason)| reason.as_str())
    }
}

struct TransportTrack {
    transport: Transport,
    offline: ConditionRegistry,
    degraded: ConditionRegistry,
    safety: ConditionRegistry,
    intervals: Vec<TransportInterval>,
}

impl TransportTrack {
    fn new(transport: Transport, start: DateTime<Utc>) -> Self {
        Self {
            transport,
            offline: ConditionRegistry::default(),
            degraded: ConditionRegistry::default(),
            safety: ConditionRegistry::default(),
            intervals: vec![TransportInterval {
                transport,
                state: TransportState::Available,
                start,
                end: None,
                reasons: Vec::new(),
            }],
        }
    }

    fn registry(&mut self, registry: Registry) -> &mut ConditionRegistry {
        match registry {
            Registry::Offline => &mut self.offline,
            Registry::Degraded => &mut self.degraded,
            Registry::Safety => &mut self.safety,
        }
    }

    /// Apply an event's updates; `false` when the registries are unchanged.
    fn apply(&mut self, event: &MissionEvent) -> bool {
        let mut changed = false;
        for update in updates_for(&event.kind) {
            changed |= match update {
                Update::Activate(registry, key) => {
                    self.registry(registry).activate(key, &event.reason)
                }
                Update::Deactivate(registry, key) => self.registry(registry).deactivate(&key),
            };
        }
        changed
    }

    fn derive(&self) -> (TransportState, Vec<String>) {
        let (state, sources) = if !self.offline.is_empty() {
            (
                TransportState::Offline,
                vec![&self.offline, &self.degraded, &self.safety],
            )
        } else if !self.degraded.is_empty() {
            (
                TransportState::Degraded,
                vec![&self.degraded, &self.safety],
            )
        } else {
            (TransportState::Available, vec![&self.safety])
        };
        let mut reasons = Vec::new();
        for registry in sources {
            merge_reasons(&mut reasons, registry.reasons());
        }
        (state, reasons)
    }

    fn transition(&mut self, at: DateTime<Utc>) {
        let (state, reasons) = self.derive();
        let Some(open) = self.intervals.last_mut() else {
            return;
        };
        if open.state == state && open.reasons == reasons {
            return;
        }

        if open.start == at {
            // zero-width: drop it and resume the previous interval if it matches
            self.intervals.pop();
            if let Some(previous) = self.intervals.last_mut() {
                if previous.state == state && previous.reasons == reasons {
                    previous.end = None;
                    return;
                }
            }
        } else {
            open.end = Some(at);
        }
        self.intervals.push(TransportInterval {
            transport: self.transport,
            state,
            start: at,
            end: None,
            reasons,
        });
    }

    fn close(mut self, end: DateTime<Utc>) -> Vec<TransportInterval> {
        if let Some(open) = self.intervals.last_mut() {
            open.end = Some(end);
        }
        self.intervals
    }
}

fn merge_reasons<'a>(into: &mut Vec<String>, reasons: impl Iterator<Item = &'a str>) {
    for reason in reasons {
        if !into.iter().any(|existing| existing == reason) {
            into.push(reason.to_string());
        }
    }
}

/// Consume the unsorted event list and tile the mission window per transport.
///
/// Events before the window apply at its start; events at or after its end
/// are ignored. Every returned interval is closed and has positive duration.
pub fn build_intervals(events: &[MissionEvent], window: &MissionWindow) -> AvailabilityIntervals {
    let mut ordered: Vec<&MissionEvent> = events.iter().collect();
    ordered.sort_by_key(|event| event.timestamp);

    let mut tracks = Transport::ALL.map(|transport| TransportTrack::new(transport, window.start));
    for event in ordered {
        if event.timestamp >= window.end {
            continue;
        }
        let at = window.clamp(event.timestamp);
        let track = &mut tracks[event.target_transport().index()];
        if track.apply(event) {
            track.transition(at);
        }
    }

    let mut intervals = AvailabilityIntervals::default();
    for track in tracks {
        let transport = track.transport;
        *intervals.get_mut(transport) = track.close(window.end);
    }
    intervals
}
