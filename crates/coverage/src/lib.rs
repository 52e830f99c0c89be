//! Coverage sampling: polygon footprints, the satellite catalog, and gap/swap analysis.

pub mod analysis;
pub mod catalog;
pub mod ring;

pub use analysis::{
    CoverageGap, CoverageTransition, GapAnalysis, RouteSample, SwapOpportunity, TransitionKind,
    analyze_gaps, sample_route_coverage,
};
pub use catalog::{Footprint, HorizonModel, Satellite, SatelliteCatalog, SatelliteSpec};
pub use ring::{CoverageRing, GeometryError, point_in_polygon};
