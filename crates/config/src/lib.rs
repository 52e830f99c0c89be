//! Configuration models and loaders for the link availability planner.
//!
//! Timestamps are RFC 3339 strings; in TOML they must be quoted.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use linkplan_core::{SatelliteId, Transport};
use linkplan_geometry::BearingRange;

/// Tunables shared by every leg computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Mission-elapsed seconds between route samples.
    pub sampling_interval_seconds: u32,
    /// Forbidden relative-bearing cone during normal operations.
    pub normal_forbidden_cone: BearingRange,
    /// Forbidden relative-bearing cone inside refueling windows.
    pub refueling_forbidden_cone: BearingRange,
    pub transition_buffer_minutes: u32,
    pub takeoff_buffer_minutes: u32,
    /// Lead before arrival at which the landing warning starts.
    pub landing_warning_minutes: u32,
    /// Lead before arrival at which the steerable link goes permanently offline.
    pub landing_offline_minutes: u32,
    /// Longitude swing above which a same-satellite gap is treated as an antimeridian artifact.
    pub antimeridian_swing_deg: f64,
    pub geostationary_altitude_km: f64,
    /// Elevation threshold for satellites without coverage rings.
    pub min_elevation_deg: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sampling_interval_seconds: 60,
            normal_forbidden_cone: BearingRange::new(135.0, 225.0),
            refueling_forbidden_cone: BearingRange::new(315.0, 45.0),
            transition_buffer_minutes: 15,
            takeoff_buffer_minutes: 15,
            landing_warning_minutes: 30,
            landing_offline_minutes: 15,
            antimeridian_swing_deg: 300.0,
            geostationary_altitude_km: linkplan_core::constants::GEOSTATIONARY_ALTITUDE_KM,
            min_elevation_deg: 5.0,
        }
    }
}

impl EngineSettings {
    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sampling_interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "sampling_interval_seconds must be a positive integer".to_string(),
            ));
        }
        let cones = [self.normal_forbidden_cone, self.refueling_forbidden_cone];
        if cones
            .iter()
            .any(|cone| !cone.min_deg.is_finite() || !cone.max_deg.is_finite())
        {
            return Err(ConfigError::Invalid(
                "forbidden cone bounds must be finite".to_string(),
            ));
        }
        if self.landing_offline_minutes > self.landing_warning_minutes {
            return Err(ConfigError::Invalid(format!(
                "landing_offline_minutes ({}) must not exceed landing_warning_minutes ({})",
                self.landing_offline_minutes, self.landing_warning_minutes
            )));
        }
        if !(self.geostationary_altitude_km.is_finite() && self.geostationary_altitude_km > 0.0) {
            return Err(ConfigError::Invalid(
                "geostationary_altitude_km must be positive".to_string(),
            ));
        }
        if !(self.antimeridian_swing_deg.is_finite() && self.antimeridian_swing_deg > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "antimeridian_swing_deg must be a positive number of degrees, got {}",
                self.antimeridian_swing_deg
            )));
        }
        if !(self.min_elevation_deg.is_finite() && (-90.0..=90.0).contains(&self.min_elevation_deg)) {
            return Err(ConfigError::Invalid(format!(
                "min_elevation_deg must lie within -90..=90, got {}",
                self.min_elevation_deg
            )));
        }
        Ok(())
    }
}

/// Catalog entry as written on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatelliteConfig {
    pub id: SatelliteId,
    pub transport: Transport,
    #[serde(default)]
    pub longitude_deg: Option<f64>,
    #[serde(default)]
    pub coverage: Option<RingSet>,
}

impl SatelliteConfig {
    /// Coverage rings normalised to a list of `(longitude, latitude)` rings.
    pub fn rings(&self) -> Vec<Vec<(f64, f64)>> {
        self.coverage
            .as_ref()
            .map(RingSet::normalized)
            .unwrap_or_default()
    }
}

/// Either one ring or a list of rings; both shapes are accepted on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RingSet {
    Single(Vec<[f64; 2]>),
    Multiple(Vec<Vec<[f64; 2]>>),
}

impl RingSet {
    pub fn normalized(&self) -> Vec<Vec<(f64, f64)>> {
        let to_ring = |ring: &Vec<[f64; 2]>| ring.iter().map(|v| (v[0], v[1])).collect::<Vec<_>>();
        match self {
            RingSet::Single(ring) if ring.is_empty() => Vec::new(),
            RingSet::Single(ring) => vec![to_ring(ring)],
            RingSet::Multiple(rings) => rings.iter().map(to_ring).collect(),
        }
    }
}

/// One route point supplied by the route collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waypoint {
    #[serde(default)]
    pub name: Option<String>,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    #[serde(default)]
    pub altitude_m: f64,
    #[serde(default)]
    pub eta: Option<DateTime<Utc>>,
}

/// Scheduled departure/arrival, optionally shifted as a block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimingProfile {
    #[serde(default)]
    pub departure: Option<DateTime<Utc>>,
    #[serde(default)]
    pub arrival: Option<DateTime<Utc>>,
    /// Shift applied to departure, arrival and every waypoint ETA.
    #[serde(default)]
    pub adjusted_departure_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedRoute {
    pub waypoints: Vec<Waypoint>,
    #[serde(default)]
    pub timing: TimingProfile,
}

/// Satellite each transport starts the leg on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitialAssignment {
    #[serde(default)]
    pub x: Option<SatelliteId>,
    #[serde(default)]
    pub ka: Option<SatelliteId>,
    #[serde(default)]
    pub ku: Option<SatelliteId>,
}

impl InitialAssignment {
    pub fn for_transport(&self, transport: Transport) -> Option<&SatelliteId> {
        match transport {
            Transport::X => self.x.as_ref(),
            Transport::Ka => self.ka.as_ref(),
            Transport::Ku => self.ku.as_ref(),
        }
    }
}

/// Where a steerable-transport re-point happens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransitionTrigger {
    Waypoint { name: String },
    Position { latitude_deg: f64, longitude_deg: f64 },
    Time { at: DateTime<Utc> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedTransition {
    pub id: String,
    pub target_satellite: SatelliteId,
    pub trigger: TransitionTrigger,
}

/// Operator-declared outage of the wide-beam or constellation transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutageWindow {
    pub id: String,
    pub transport: Transport,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub reason: Option<String>,
    /// Transport actually taken down, when it differs from `transport`.
    #[serde(default)]
    pub affected_transport: Option<Transport>,
}

/// Air-to-air refueling window bracketed by two named waypoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefuelingWindow {
    pub id: String,
    pub start_waypoint: String,
    pub end_waypoint: String,
}

/// Per-mission transport configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransportPlan {
    #[serde(default)]
    pub initial: InitialAssignment,
    #[serde(default)]
    pub transitions: Vec<PlannedTransition>,
    #[serde(default)]
    pub outages: Vec<OutageWindow>,
    #[serde(default)]
    pub refueling_windows: Vec<RefuelingWindow>,
}

/// One mission leg: route plus transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionManifest {
    pub mission_id: String,
    pub route: TimedRoute,
    #[serde(default)]
    pub transports: TransportPlan,
}

/// Errors that can occur while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Load engine settings from a TOML or YAML file and validate them.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<EngineSettings, ConfigError> {
    let settings: EngineSettings = load_single(path.as_ref())?;
    settings.validate()?;
    Ok(settings)
}

/// Load the satellite catalog: a YAML list, one TOML record, or a directory of TOML records.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Vec<SatelliteConfig>, ConfigError> {
    load_records(path)
}

/// Load mission manifests: a YAML list, one TOML record, or a directory of TOML records.
pub fn load_missions<P: AsRef<Path>>(path: P) -> Result<Vec<MissionManifest>, ConfigError> {
    load_records(path)
}

fn is_toml(path: &Path) -> bool {
    path.extension().map(|ext| ext == "toml").unwrap_or(false)
}

fn load_single<T>(path: &Path) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    if is_toml(path) {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    } else {
        let reader = File::open(path)?;
        Ok(serde_yaml::from_reader(reader)?)
    }
}

fn load_records<T, P>(path: P) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.is_dir() {
        read_dir_records(path)
    } else if is_toml(path) {
        let contents = std::fs::read_to_string(path)?;
        let record: T = toml::from_str(&contents)?;
        Ok(vec![record])
    } else {
        let reader = File::open(path)?;
        Ok(serde_yaml::from_reader(reader)?)
    }
}

fn read_dir_records<T>(dir: &Path) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    let mut records = Vec::new();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_toml(path))
        .collect();
    entries.sort();
    for path in entries {
        let contents = std::fs::read_to_string(&path)?;
        let record: T = toml::from_str(&contents)?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_operational_values() {
        let settings = EngineSettings::default();
        assert_eq!(settings.sampling_interval_seconds, 60);
        assert_eq!(settings.normal_forbidden_cone, BearingRange::new(135.0, 225.0));
        assert_eq!(settings.refueling_forbidden_cone, BearingRange::new(315.0, 45.0));
        assert_eq!(settings.transition_buffer_minutes, 15);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn zero_cadence_is_rejected() {
        let settings = EngineSettings {
            sampling_interval_seconds: 0,
            ..EngineSettings::default()
        };
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn non_finite_angles_are_rejected() {
        let swing = EngineSettings {
            antimeridian_swing_deg: f64::NAN,
            ..EngineSettings::default()
        };
        assert!(matches!(swing.validate(), Err(ConfigError::Invalid(_))));

        let elevation = EngineSettings {
            min_elevation_deg: f64::INFINITY,
            ..EngineSettings::default()
        };
        assert!(matches!(elevation.validate(), Err(ConfigError::Invalid(_))));

        let negative_swing = EngineSettings {
            antimeridian_swing_deg: -1.0,
            ..EngineSettings::default()
        };
        assert!(matches!(negative_swing.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn partial_toml_settings_fill_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("engine.toml");
        let mut file = File::create(&path).expect("create");
        writeln!(file, "sampling_interval_seconds = 30").unwrap();
        writeln!(file, "[refueling_forbidden_cone]").unwrap();
        writeln!(file, "min_deg = 300.0").unwrap();
        writeln!(file, "max_deg = 60.0").unwrap();

        let settings = load_settings(&path).expect("settings");
        assert_eq!(settings.sampling_interval_seconds, 30);
        assert_eq!(settings.refueling_forbidden_cone, BearingRange::new(300.0, 60.0));
        assert_eq!(settings.transition_buffer_minutes, 15);
    }

    #[test]
    fn single_and_multiple_rings_normalise_to_lists() {
        let yaml = r#"
- id: KA-EMEA
  transport: KA
  longitude_deg: 25.0
  coverage: [[-20.0, 20.0], [50.0, 20.0], [50.0, 60.0], [-20.0, 60.0]]
- id: KA-PAC
  transport: KA
  longitude_deg: 180.0
  coverage:
    - [[170.0, -20.0], [180.0, -20.0], [180.0, 20.0], [170.0, 20.0]]
    - [[-180.0, -20.0], [-160.0, -20.0], [-160.0, 20.0], [-180.0, 20.0]]
- id: X-1
  transport: X
  longitude_deg: 10.0
"#;
        let catalog: Vec<SatelliteConfig> = serde_yaml::from_str(yaml).expect("catalog yaml");
        assert_eq!(catalog[0].rings().len(), 1);
        assert_eq!(catalog[0].rings()[0][1], (50.0, 20.0));
        assert_eq!(catalog[1].rings().len(), 2);
        assert!(catalog[2].rings().is_empty());
        assert_eq!(catalog[2].transport, Transport::X);
    }

    #[test]
    fn mission_manifest_parses_triggers() {
        let yaml = r#"
- mission_id: LEG-1
  route:
    waypoints:
      - { name: ORIG, latitude_deg: 50.0, longitude_deg: 8.0 }
      - { name: DEST, latitude_deg: 40.0, longitude_deg: -74.0, altitude_m: 0.0 }
    timing:
      departure: 2026-03-01T08:00:00Z
      arrival: 2026-03-01T16:00:00Z
  transports:
    initial: { x: X-1, ka: KA-EMEA }
    transitions:
      - id: T1
        target_satellite: X-2
        trigger: { type: position, latitude_deg: 52.0, longitude_deg: -30.0 }
      - id: T2
        target_satellite: X-3
        trigger: { type: waypoint, name: DEST }
    outages:
      - id: OUT-1
        transport: KU
        start: 2026-03-01T10:00:00Z
        end: 2026-03-01T10:30:00Z
"#;
        let missions: Vec<MissionManifest> = serde_yaml::from_str(yaml).expect("mission yaml");
        let mission = &missions[0];
        assert_eq!(mission.route.waypoints.len(), 2);
        assert_eq!(mission.transports.transitions.len(), 2);
        assert!(matches!(
            mission.transports.transitions[0].trigger,
            TransitionTrigger::Position { .. }
        ));
        assert_eq!(
            mission.transports.initial.for_transport(Transport::Ka),
            Some(&SatelliteId::new("KA-EMEA"))
        );
        assert!(mission.transports.refueling_windows.is_empty());
    }
}
