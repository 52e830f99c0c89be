//! Core units, constants, and shared domain types for the link availability planner.

/// Physical and geodetic constants expressed in SI units (unless stated otherwise).
pub mod constants {
    /// WGS84 semi-major axis (m).
    pub const WGS84_A_M: f64 = 6_378_137.0;
    /// WGS84 flattening.
    pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
    /// WGS84 first eccentricity squared.
    pub const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);
    /// Mean Earth radius used for great-circle work (m).
    pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_008.8;
    /// Nominal geostationary altitude above the equator (km).
    pub const GEOSTATIONARY_ALTITUDE_KM: f64 = 35_786.0;
}

/// Basic unit conversion helpers.
pub mod units {
    /// Convert kilometres to metres.
    #[inline]
    pub fn km_to_m(v: f64) -> f64 {
        v * 1_000.0
    }

    /// Wrap an angle in degrees into `[0, 360)`.
    #[inline]
    pub fn normalize_degrees(v: f64) -> f64 {
        let wrapped = v.rem_euclid(360.0);
        // rem_euclid can round up to exactly 360 for tiny negative inputs
        if wrapped >= 360.0 { 0.0 } else { wrapped }
    }

    /// Wrap a longitude in degrees into `[-180, 180)`.
    #[inline]
    pub fn normalize_longitude(v: f64) -> f64 {
        normalize_degrees(v + 180.0) - 180.0
    }
}

/// Minimal vector helpers to avoid ad-hoc `[f64; 3]` math everywhere.
pub mod vector {
    /// Alias for a 3D vector in metres.
    pub type Vector3 = [f64; 3];

    /// Euclidean norm of a vector.
    #[inline]
    pub fn norm(v: &Vector3) -> f64 {
        dot(v, v).sqrt()
    }

    /// Dot product of two vectors.
    #[inline]
    pub fn dot(a: &Vector3, b: &Vector3) -> f64 {
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
    }

    /// Vector subtraction.
    #[inline]
    pub fn sub(a: &Vector3, b: &Vector3) -> Vector3 {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }
}

/// Closed domain enumerations shared by every crate in the workspace.
pub mod domain {
    use std::fmt;

    use serde::{Deserialize, Serialize};

    /// One of the three independent communication transports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum Transport {
        /// Steerable narrow-beam geostationary link.
        X,
        /// Wide-beam geostationary link with regional footprints.
        Ka,
        /// Low-earth-orbit constellation link.
        Ku,
    }

    impl Transport {
        /// Every transport in reporting order.
        pub const ALL: [Transport; 3] = [Transport::X, Transport::Ka, Transport::Ku];

        /// Stable array index for per-transport tables.
        pub fn index(self) -> usize {
            match self {
                Transport::X => 0,
                Transport::Ka => 1,
                Transport::Ku => 2,
            }
        }

        pub fn label(self) -> &'static str {
            match self {
                Transport::X => "X",
                Transport::Ka => "Ka",
                Transport::Ku => "Ku",
            }
        }
    }

    impl fmt::Display for Transport {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.label())
        }
    }

    /// Availability of one transport. Ordered by severity: `Available < Degraded < Offline`.
    #[derive(
        Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
    )]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum TransportState {
        #[default]
        Available,
        Degraded,
        Offline,
    }

    impl fmt::Display for TransportState {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(match self {
                TransportState::Available => "AVAILABLE",
                TransportState::Degraded => "DEGRADED",
                TransportState::Offline => "OFFLINE",
            })
        }
    }

    /// Severity tag attached to mission events and advisories.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Severity {
        Info,
        Warning,
        Critical,
        Safety,
    }

    /// Overall status of a timeline segment across all transports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum TimelineStatus {
        Nominal,
        Degraded,
        Critical,
    }

    impl TimelineStatus {
        /// Status derived from the number of impacted transports.
        pub fn from_impacted(count: usize) -> Self {
            match count {
                0 => TimelineStatus::Nominal,
                1 => TimelineStatus::Degraded,
                _ => TimelineStatus::Critical,
            }
        }
    }

    impl fmt::Display for TimelineStatus {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(match self {
                TimelineStatus::Nominal => "NOMINAL",
                TimelineStatus::Degraded => "DEGRADED",
                TimelineStatus::Critical => "CRITICAL",
            })
        }
    }

    /// Catalog identifier of a satellite (or of a constellation coverage feed).
    #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct SatelliteId(pub String);

    impl SatelliteId {
        pub fn new(id: impl Into<String>) -> Self {
            Self(id.into())
        }

        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl fmt::Display for SatelliteId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<&str> for SatelliteId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }
}

pub use domain::{SatelliteId, Severity, TimelineStatus, Transport, TransportState};
