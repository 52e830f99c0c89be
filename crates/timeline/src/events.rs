//! Closed set of timeline events produced by the rule generators.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use linkplan_core::{SatelliteId, Severity, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LandingStage {
    /// Approach begins; the steerable link is degraded.
    Warning,
    /// The steerable link goes offline for the rest of the leg.
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageEdge {
    /// Route leaves every footprint of the transport.
    Exit,
    /// Route re-enters a footprint.
    Entry,
}

/// What happened, with only the fields each kind needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    Transition {
        edge: Edge,
        transition_id: String,
        target: SatelliteId,
    },
    TakeoffBuffer {
        edge: Edge,
    },
    LandingBuffer {
        stage: LandingStage,
    },
    AzimuthViolation {
        edge: Edge,
        satellite: SatelliteId,
        relative_bearing_deg: f64,
    },
    Coverage {
        edge: CoverageEdge,
        gap_index: usize,
    },
    ManualOutage {
        edge: Edge,
        outage_id: String,
    },
    RefuelingWindow {
        edge: Edge,
        window_id: String,
    },
}

/// One timestamped event owned by a transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
    pub transport: Transport,
    /// Transport whose registries the event updates, when not `transport`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_transport: Option<Transport>,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub satellite: Option<SatelliteId>,
    pub reason: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl MissionEvent {
    pub fn new(
        timestamp: DateTime<Utc>,
        kind: EventKind,
        transport: Transport,
        severity: Severity,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            kind,
            transport,
            affected_transport: None,
            severity,
            satellite: None,
            reason: reason.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn affecting(mut self, transport: Option<Transport>) -> Self {
        self.affected_transport = transport;
        self
    }

    pub fn with_satellite(mut self, satellite: Option<SatelliteId>) -> Self {
        self.satellite = satellite;
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl ToString) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    /// Transport whose availability this event changes.
    pub fn target_transport(&self) -> Transport {
        self.affected_transport.unwrap_or(self.transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn affected_transport_overrides_owner() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let event = MissionEvent::new(
            at,
            EventKind::ManualOutage {
                edge: Edge::Start,
                outage_id: "OUT-1".into(),
            },
            Transport::Ku,
            Severity::Critical,
            "maintenance",
        );
        assert_eq!(event.target_transport(), Transport::Ku);
        let event = event.affecting(Some(Transport::Ka));
        assert_eq!(event.target_transport(), Transport::Ka);
    }

    #[test]
    fn serializes_kind_inline() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let event = MissionEvent::new(
            at,
            EventKind::LandingBuffer {
                stage: LandingStage::Critical,
            },
            Transport::X,
            Severity::Critical,
            "landing",
        )
        .with_metadata("lead_minutes", 15);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "landing_buffer");
        assert_eq!(json["stage"], "critical");
        assert_eq!(json["metadata"]["lead_minutes"], "15");
        assert!(json.get("satellite").is_none());
    }
}
