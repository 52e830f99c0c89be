//! Geodetic conversions, look angles, and great-circle helpers.
//!
//! Every function here is pure: no validation and no failure modes. Latitudes
//! outside `[-90, 90]` produce meaningless but finite output; callers validate.

use serde::{Deserialize, Serialize};

use linkplan_core::constants::{EARTH_MEAN_RADIUS_M, WGS84_A_M, WGS84_E2};
use linkplan_core::units::{normalize_degrees, normalize_longitude};
use linkplan_core::vector::{self, Vector3};

const GEODETIC_REFINEMENT_PASSES: usize = 12;

/// Geodetic position on the WGS84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geodetic {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

/// Azimuth (clockwise from true north) and elevation above the local horizon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookAngles {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
}

impl LookAngles {
    /// Negative elevation means the target is below the horizon.
    pub fn is_visible(&self) -> bool {
        self.elevation_deg >= 0.0
    }
}

/// Closed bearing range in degrees; wraps through north when `min_deg > max_deg`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BearingRange {
    pub min_deg: f64,
    pub max_deg: f64,
}

impl BearingRange {
    pub const fn new(min_deg: f64, max_deg: f64) -> Self {
        Self { min_deg, max_deg }
    }

    pub fn contains(&self, bearing_deg: f64) -> bool {
        is_in_azimuth_range(bearing_deg, self.min_deg, self.max_deg)
    }
}

/// Convert geodetic coordinates (degrees, metres) to Earth-centred Earth-fixed metres.
pub fn ecef_from_geodetic(latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> Vector3 {
    let lat = latitude_deg.to_radians();
    let lon = longitude_deg.to_radians();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();
    let n = WGS84_A_M / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
    [
        (n + altitude_m) * cos_lat * cos_lon,
        (n + altitude_m) * cos_lat * sin_lon,
        (n * (1.0 - WGS84_E2) + altitude_m) * sin_lat,
    ]
}

/// Iterative inverse of [`ecef_from_geodetic`].
///
/// Converges to sub-metre accuracy for terrestrial and orbital altitudes.
pub fn geodetic_from_ecef(ecef: &Vector3) -> Geodetic {
    let [x, y, z] = *ecef;
    let p = (x * x + y * y).sqrt();
    let longitude_deg = y.atan2(x).to_degrees();

    if p < 1e-9 {
        let polar_radius = WGS84_A_M * (1.0 - WGS84_E2).sqrt();
        return Geodetic {
            latitude_deg: if z >= 0.0 { 90.0 } else { -90.0 },
            longitude_deg,
            altitude_m: z.abs() - polar_radius,
        };
    }

    let mut lat = z.atan2(p * (1.0 - WGS84_E2));
    let mut alt = 0.0;
    for _ in 0..GEODETIC_REFINEMENT_PASSES {
        let sin_lat = lat.sin();
        let n = WGS84_A_M / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        alt = p / lat.cos() - n;
        lat = z.atan2(p * (1.0 - WGS84_E2 * n / (n + alt)));
    }

    Geodetic {
        latitude_deg: lat.to_degrees(),
        longitude_deg,
        altitude_m: alt,
    }
}

/// Look angles from an observer to a geostationary point at `satellite_longitude_deg`.
///
/// The observer→target vector is rotated into the local south-east-zenith frame.
pub fn look_angles(
    observer_lat_deg: f64,
    observer_lon_deg: f64,
    observer_alt_m: f64,
    satellite_longitude_deg: f64,
    satellite_altitude_m: f64,
) -> LookAngles {
    let observer = ecef_from_geodetic(observer_lat_deg, observer_lon_deg, observer_alt_m);
    let target = ecef_from_geodetic(0.0, satellite_longitude_deg, satellite_altitude_m);
    let range = vector::sub(&target, &observer);
    let distance = vector::norm(&range);
    if distance == 0.0 {
        return LookAngles {
            azimuth_deg: 0.0,
            elevation_deg: 90.0,
        };
    }

    let lat = observer_lat_deg.to_radians();
    let lon = observer_lon_deg.to_radians();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();

    let south = sin_lat * cos_lon * range[0] + sin_lat * sin_lon * range[1] - cos_lat * range[2];
    let east = -sin_lon * range[0] + cos_lon * range[1];
    let zenith = cos_lat * cos_lon * range[0] + cos_lat * sin_lon * range[1] + sin_lat * range[2];

    LookAngles {
        azimuth_deg: normalize_degrees(east.atan2(-south).to_degrees()),
        elevation_deg: (zenith / distance).clamp(-1.0, 1.0).asin().to_degrees(),
    }
}

/// Membership test for a bearing range that may wrap through 0°/360° (`min > max`).
pub fn is_in_azimuth_range(azimuth_deg: f64, min_deg: f64, max_deg: f64) -> bool {
    let azimuth = normalize_degrees(azimuth_deg);
    let min = normalize_degrees(min_deg);
    let max = normalize_degrees(max_deg);
    if min <= max {
        azimuth >= min && azimuth <= max
    } else {
        azimuth >= min || azimuth <= max
    }
}

/// Bearing of a target relative to the aircraft nose, in `[0, 360)`.
pub fn relative_bearing(azimuth_deg: f64, heading_deg: f64) -> f64 {
    normalize_degrees(azimuth_deg - heading_deg)
}

/// Great-circle distance on the mean sphere (m).
pub fn haversine_distance_m(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64) -> f64 {
    let phi1 = lat1_deg.to_radians();
    let phi2 = lat2_deg.to_radians();
    let d_phi = phi2 - phi1;
    let d_lambda = (lon2_deg - lon1_deg).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_MEAN_RADIUS_M * a.sqrt().clamp(0.0, 1.0).asin()
}

/// Initial true bearing of the great circle from point 1 towards point 2, in `[0, 360)`.
pub fn initial_bearing_deg(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64) -> f64 {
    let phi1 = lat1_deg.to_radians();
    let phi2 = lat2_deg.to_radians();
    let d_lambda = (lon2_deg - lon1_deg).to_radians();
    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();
    normalize_degrees(y.atan2(x).to_degrees())
}

/// Point at `fraction` of the way along the great circle between two points.
///
/// Returns `(latitude, longitude)` with longitude wrapped into `[-180, 180)`.
pub fn intermediate_point(
    lat1_deg: f64,
    lon1_deg: f64,
    lat2_deg: f64,
    lon2_deg: f64,
    fraction: f64,
) -> (f64, f64) {
    let fraction = fraction.clamp(0.0, 1.0);
    let delta = haversine_distance_m(lat1_deg, lon1_deg, lat2_deg, lon2_deg) / EARTH_MEAN_RADIUS_M;
    if delta < 1e-12 {
        return (lat1_deg, normalize_longitude(lon1_deg));
    }

    let phi1 = lat1_deg.to_radians();
    let phi2 = lat2_deg.to_radians();
    let lambda1 = lon1_deg.to_radians();
    let lambda2 = lon2_deg.to_radians();

    let a = ((1.0 - fraction) * delta).sin() / delta.sin();
    let b = (fraction * delta).sin() / delta.sin();
    let x = a * phi1.cos() * lambda1.cos() + b * phi2.cos() * lambda2.cos();
    let y = a * phi1.cos() * lambda1.sin() + b * phi2.cos() * lambda2.sin();
    let z = a * phi1.sin() + b * phi2.sin();

    let lat = z.atan2((x * x + y * y).sqrt()).to_degrees();
    let lon = y.atan2(x).to_degrees();
    (lat, normalize_longitude(lon))
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkplan_core::constants::GEOSTATIONARY_ALTITUDE_KM;
    use linkplan_core::units::km_to_m;

    fn geo_altitude_m() -> f64 {
        km_to_m(GEOSTATIONARY_ALTITUDE_KM)
    }

    #[test]
    fn azimuth_range_handles_wrap_through_north() {
        assert!(is_in_azimuth_range(0.0, 315.0, 45.0));
        assert!(!is_in_azimuth_range(180.0, 315.0, 45.0));
        assert!(is_in_azimuth_range(180.0, 135.0, 225.0));
        assert!(is_in_azimuth_range(359.9, 315.0, 45.0));
        assert!(is_in_azimuth_range(-10.0, 315.0, 45.0));
        assert!(!is_in_azimuth_range(90.0, 135.0, 225.0));
        assert!(BearingRange::new(135.0, 225.0).contains(135.0));
    }

    #[test]
    fn ecef_round_trip_is_sub_metre() {
        let cases = [
            (0.0, 0.0, 0.0),
            (51.4775, -0.4614, 11_000.0),
            (-33.9, 151.2, 250.0),
            (64.8, -147.9, 12_500.0),
            (0.0, 120.0, geo_altitude_m()),
        ];
        for (lat, lon, alt) in cases {
            let ecef = ecef_from_geodetic(lat, lon, alt);
            let back = geodetic_from_ecef(&ecef);
            let again = ecef_from_geodetic(back.latitude_deg, back.longitude_deg, back.altitude_m);
            let error = vector::norm(&vector::sub(&ecef, &again));
            assert!(error < 1.0, "round trip error {error} m for ({lat}, {lon}, {alt})");
            assert!((back.altitude_m - alt).abs() < 1.0);
        }
    }

    #[test]
    fn sub_satellite_point_sees_zenith() {
        let angles = look_angles(0.0, 25.0, 0.0, 25.0, geo_altitude_m());
        assert!((angles.elevation_deg - 90.0).abs() < 1e-6);
    }

    #[test]
    fn northern_observer_looks_south() {
        let angles = look_angles(45.0, 10.0, 10_000.0, 10.0, geo_altitude_m());
        assert!((angles.azimuth_deg - 180.0).abs() < 1e-6);
        assert!(angles.elevation_deg > 30.0 && angles.elevation_deg < 45.0);
        assert!(angles.is_visible());
    }

    #[test]
    fn satellite_east_of_equatorial_observer_is_due_east() {
        let angles = look_angles(0.0, 0.0, 0.0, 40.0, geo_altitude_m());
        assert!((angles.azimuth_deg - 90.0).abs() < 1e-6);
    }

    #[test]
    fn antipodal_satellite_is_below_horizon() {
        let angles = look_angles(10.0, 0.0, 0.0, 180.0, geo_altitude_m());
        assert!(angles.elevation_deg < 0.0);
        assert!(!angles.is_visible());
    }

    #[test]
    fn relative_bearing_wraps() {
        assert!((relative_bearing(10.0, 350.0) - 20.0).abs() < 1e-12);
        assert!((relative_bearing(350.0, 10.0) - 340.0).abs() < 1e-12);
    }

    #[test]
    fn great_circle_helpers_agree() {
        // one degree of longitude on the equator
        let d = haversine_distance_m(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111_195.0).abs() < 10.0);
        assert!((initial_bearing_deg(0.0, 0.0, 0.0, 1.0) - 90.0).abs() < 1e-9);
        assert!(initial_bearing_deg(0.0, 0.0, 1.0, 0.0).abs() < 1e-9);

        let (lat, lon) = intermediate_point(0.0, 170.0, 0.0, -170.0, 0.5);
        assert!(lat.abs() < 1e-9);
        assert!((lon.abs() - 180.0).abs() < 1e-6);
    }
}
