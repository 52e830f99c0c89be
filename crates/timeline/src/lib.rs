//! Link availability timelines: route projection, event rules, the
//! per-transport state machine, segment building, and batch execution.

pub mod error;
pub mod events;
pub mod facade;
pub mod mission;
pub mod route;
pub mod rules;
pub mod segments;
pub mod state;
pub mod timeline;

pub use error::{ComputationError, ConstraintError};
pub use events::{CoverageEdge, Edge, EventKind, LandingStage, MissionEvent};
pub use mission::{BatchError, BatchOptions, LegOutcome, compute_leg, compute_legs};
pub use route::{MissionWindow, ProjectedRoute, TimedWaypoint, mission_window, project_route};
pub use rules::{RuleContext, RuleOutput, generate_events};
pub use segments::{TimelineSegment, build_segments};
pub use state::{AvailabilityIntervals, TransportInterval, build_intervals};
pub use timeline::{Advisory, MissionTimeline, TimelineStatistics};
