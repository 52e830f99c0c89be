//! Pre-flight link availability planning for aircraft served by three
//! independent radio transports.
//!
//! The engine lives in the member crates; this crate re-exports them so
//! front-ends (CLI, services) depend on a single library.

pub use linkplan_config as config;
pub use linkplan_coverage as coverage;
pub use linkplan_export as export;
pub use linkplan_geometry as geometry;
pub use linkplan_timeline as timeline;

pub use linkplan_core::{
    SatelliteId, Severity, TimelineStatus, Transport, TransportState, constants, units, vector,
};
