//! Closed polygon boundaries in (longitude, latitude) degrees.

use thiserror::Error;

/// Errors raised while validating coverage geometry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("ring has {0} distinct vertices; at least 3 are required")]
    TooFewVertices(usize),
    #[error("vertex {index} is not finite")]
    NonFiniteVertex { index: usize },
    #[error("vertex {index} latitude {latitude} is outside [-90, 90]")]
    LatitudeOutOfRange { index: usize, latitude: f64 },
    #[error("vertex {index} longitude {longitude} is outside [-180, 180]")]
    LongitudeOutOfRange { index: usize, longitude: f64 },
    #[error("ring crosses the antimeridian without closing (encircles a pole)")]
    DegenerateRing,
}

/// One closed coverage boundary.
///
/// Rings that cross the antimeridian are stored unwrapped: consecutive
/// vertices never differ by more than 180° of longitude, so some longitudes
/// may lie outside `[-180, 180]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageRing {
    vertices: Vec<(f64, f64)>,
    crosses_antimeridian: bool,
}

impl CoverageRing {
    /// Validate and normalise a ring. A repeated closing vertex is dropped.
    pub fn new(vertices: Vec<(f64, f64)>) -> Result<Self, GeometryError> {
        for (index, &(longitude, latitude)) in vertices.iter().enumerate() {
            if !longitude.is_finite() || !latitude.is_finite() {
                return Err(GeometryError::NonFiniteVertex { index });
            }
            if !(-90.0..=90.0).contains(&latitude) {
                return Err(GeometryError::LatitudeOutOfRange { index, latitude });
            }
            if !(-180.0..=180.0).contains(&longitude) {
                return Err(GeometryError::LongitudeOutOfRange { index, longitude });
            }
        }

        let mut vertices = vertices;
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        if vertices.len() < 3 {
            return Err(GeometryError::TooFewVertices(vertices.len()));
        }

        let crosses_antimeridian = vertices
            .iter()
            .zip(vertices.iter().cycle().skip(1))
            .any(|(a, b)| (b.0 - a.0).abs() > 180.0);

        if crosses_antimeridian {
            vertices = unwrap_longitudes(&vertices)?;
        }

        Ok(Self {
            vertices,
            crosses_antimeridian,
        })
    }

    pub fn vertices(&self) -> &[(f64, f64)] {
        &self.vertices
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.crosses_antimeridian
    }

    /// Whether the ring contains the point, probing the shifted longitude
    /// copies so unwrapped rings match points on either side of ±180°.
    pub fn contains(&self, longitude_deg: f64, latitude_deg: f64) -> bool {
        if point_in_polygon((longitude_deg, latitude_deg), &self.vertices) {
            return true;
        }
        self.crosses_antimeridian
            && [longitude_deg + 360.0, longitude_deg - 360.0]
                .iter()
                .any(|&lon| point_in_polygon((lon, latitude_deg), &self.vertices))
    }
}

fn unwrap_longitudes(vertices: &[(f64, f64)]) -> Result<Vec<(f64, f64)>, GeometryError> {
    let mut unwrapped = Vec::with_capacity(vertices.len());
    let mut offset = 0.0;
    let mut previous = vertices[0].0;
    unwrapped.push(vertices[0]);
    for &(longitude, latitude) in &vertices[1..] {
        let delta = longitude - previous;
        if delta > 180.0 {
            offset -= 360.0;
        } else if delta < -180.0 {
            offset += 360.0;
        }
        previous = longitude;
        unwrapped.push((longitude + offset, latitude));
    }

    // closing edge must land back on the starting copy
    let first = unwrapped[0].0;
    let last = unwrapped[unwrapped.len() - 1].0;
    if (first - last).abs() > 180.0 {
        return Err(GeometryError::DegenerateRing);
    }
    Ok(unwrapped)
}

/// Ray-casting point-in-polygon test over `(x, y)` = `(longitude, latitude)`.
///
/// Horizontal edges never toggle the crossing count. The ring is implicitly
/// closed between its last and first vertex.
pub fn point_in_polygon(point: (f64, f64), ring: &[(f64, f64)]) -> bool {
    let (x, y) = point;
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if yi != yj && ((yi > y) != (yj > y)) {
            let x_cross = (xj - xi) * (y - yi) / (yj - yi) + xi;
            if x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
