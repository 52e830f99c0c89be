//! Immutable satellite catalog shared read-only across concurrent leg computations.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use linkplan_core::constants::GEOSTATIONARY_ALTITUDE_KM;
use linkplan_core::units::km_to_m;
use linkplan_core::{SatelliteId, Transport};
use linkplan_geometry::look_angles;

use crate::ring::CoverageRing;

/// How a satellite's coverage is decided.
#[derive(Debug, Clone, PartialEq)]
pub enum Footprint {
    /// Explicit coverage rings; any containing ring means coverage.
    Polygons(Vec<CoverageRing>),
    /// No rings but a fixed longitude: covered when the elevation clears the horizon model.
    Horizon { longitude_deg: f64 },
    /// Nothing to evaluate (a constellation entry without a coverage feed).
    Empty,
    /// Geometry was rejected at load time; never covers.
    Unusable { reason: String },
}

/// Elevation threshold used by the math-only fallback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizonModel {
    pub min_elevation_deg: f64,
    pub satellite_altitude_m: f64,
}

impl Default for HorizonModel {
    fn default() -> Self {
        Self {
            min_elevation_deg: 5.0,
            satellite_altitude_m: km_to_m(GEOSTATIONARY_ALTITUDE_KM),
        }
    }
}

/// Raw satellite description handed over by the catalog loader.
#[derive(Debug, Clone)]
pub struct SatelliteSpec {
    pub id: SatelliteId,
    pub transport: Transport,
    pub longitude_deg: Option<f64>,
    pub rings: Vec<Vec<(f64, f64)>>,
}

/// Validated catalog entry.
#[derive(Debug, Clone)]
pub struct Satellite {
    pub id: SatelliteId,
    pub transport: Transport,
    pub longitude_deg: Option<f64>,
    pub footprint: Footprint,
}

impl Satellite {
    /// Coverage test for a point; the first containing ring short-circuits.
    pub fn covers(
        &self,
        latitude_deg: f64,
        longitude_deg: f64,
        altitude_m: f64,
        horizon: &HorizonModel,
    ) -> bool {
        match &self.footprint {
            Footprint::Polygons(rings) => rings
                .iter()
                .any(|ring| ring.contains(longitude_deg, latitude_deg)),
            Footprint::Horizon {
                longitude_deg: satellite_longitude,
            } => {
                let angles = look_angles(
                    latitude_deg,
                    longitude_deg,
                    altitude_m,
                    *satellite_longitude,
                    horizon.satellite_altitude_m,
                );
                angles.elevation_deg >= horizon.min_elevation_deg
            }
            Footprint::Empty | Footprint::Unusable { .. } => false,
        }
    }
}

/// Read-only lookup of satellites and their footprints.
#[derive(Debug, Clone, Default)]
pub struct SatelliteCatalog {
    satellites: BTreeMap<SatelliteId, Satellite>,
    horizon: HorizonModel,
}

impl SatelliteCatalog {
    /// Build the catalog, validating every ring.
    ///
    /// Malformed geometry is logged and leaves that satellite without coverage;
    /// it never fails the catalog. Duplicate ids keep the first entry.
    pub fn new(specs: Vec<SatelliteSpec>) -> Self {
        Self::with_horizon(specs, HorizonModel::default())
    }

    pub fn with_horizon(specs: Vec<SatelliteSpec>, horizon: HorizonModel) -> Self {
        let mut satellites = BTreeMap::new();
        for spec in specs {
            if satellites.contains_key(&spec.id) {
                warn!(satellite = %spec.id, "duplicate satellite id in catalog; keeping first entry");
                continue;
            }
            let footprint = build_footprint(&spec);
            satellites.insert(
                spec.id.clone(),
                Satellite {
                    id: spec.id,
                    transport: spec.transport,
                    longitude_deg: spec.longitude_deg,
                    footprint,
                },
            );
        }
        Self {
            satellites,
            horizon,
        }
    }

    pub fn get(&self, id: &SatelliteId) -> Option<&Satellite> {
        self.satellites.get(id)
    }

    pub fn len(&self) -> usize {
        self.satellites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.satellites.is_empty()
    }

    pub fn horizon(&self) -> &HorizonModel {
        &self.horizon
    }

    pub fn iter(&self) -> impl Iterator<Item = &Satellite> {
        self.satellites.values()
    }

    /// Ids of every satellite owned by `transport`.
    pub fn satellites_of(&self, transport: Transport) -> BTreeSet<SatelliteId> {
        self.satellites
            .values()
            .filter(|sat| sat.transport == transport)
            .map(|sat| sat.id.clone())
            .collect()
    }

    /// Whether any satellite of `transport` can ever report coverage.
    pub fn has_coverage_model(&self, transport: Transport) -> bool {
        self.satellites.values().any(|sat| {
            sat.transport == transport
                && matches!(
                    sat.footprint,
                    Footprint::Polygons(_) | Footprint::Horizon { .. }
                )
        })
    }

    /// Satellites covering a sea-level point.
    pub fn check_coverage_at_point(
        &self,
        latitude_deg: f64,
        longitude_deg: f64,
    ) -> BTreeSet<SatelliteId> {
        self.covering_satellites(latitude_deg, longitude_deg, 0.0)
    }

    /// Satellites covering a point at the given altitude.
    pub fn covering_satellites(
        &self,
        latitude_deg: f64,
        longitude_deg: f64,
        altitude_m: f64,
    ) -> BTreeSet<SatelliteId> {
        self.satellites
            .values()
            .filter(|sat| sat.covers(latitude_deg, longitude_deg, altitude_m, &self.horizon))
            .map(|sat| sat.id.clone())
            .collect()
    }
}

fn build_footprint(spec: &SatelliteSpec) -> Footprint {
    if spec.rings.is_empty() {
        return match spec.longitude_deg {
            Some(longitude_deg) if longitude_deg.is_finite() => Footprint::Horizon { longitude_deg },
            Some(_) => {
                warn!(satellite = %spec.id, "non-finite satellite longitude; treating as no coverage");
                Footprint::Unusable {
                    reason: "non-finite longitude".to_string(),
                }
            }
            None => Footprint::Empty,
        };
    }

    let mut rings = Vec::with_capacity(spec.rings.len());
    for (index, vertices) in spec.rings.iter().enumerate() {
        match CoverageRing::new(vertices.clone()) {
            Ok(ring) => rings.push(ring),
            Err(err) => {
                warn!(
                    satellite = %spec.id,
                    ring = index,
                    error = %err,
                    "unsupported coverage geometry; satellite will never cover"
                );
                return Footprint::Unusable {
                    reason: format!("ring {index}: {err}"),
                };
            }
        }
    }
    Footprint::Polygons(rings)
}
