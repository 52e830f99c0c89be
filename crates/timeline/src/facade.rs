//! Conversions from on-disk configuration into runtime engine inputs.

pub mod catalog {
    use linkplan_config::{EngineSettings, SatelliteConfig};
    use linkplan_core::units::km_to_m;
    use linkplan_coverage::{HorizonModel, SatelliteCatalog, SatelliteSpec};

    /// Convert a `SatelliteConfig` into the sampler's raw satellite description.
    pub fn spec_from_config(config: &SatelliteConfig) -> SatelliteSpec {
        SatelliteSpec {
            id: config.id.clone(),
            transport: config.transport,
            longitude_deg: config.longitude_deg,
            rings: config.rings(),
        }
    }

    /// Build the shared, read-only catalog with the horizon model from `settings`.
    pub fn from_config(configs: &[SatelliteConfig], settings: &EngineSettings) -> SatelliteCatalog {
        let horizon = HorizonModel {
            min_elevation_deg: settings.min_elevation_deg,
            satellite_altitude_m: km_to_m(settings.geostationary_altitude_km),
        };
        SatelliteCatalog::with_horizon(configs.iter().map(spec_from_config).collect(), horizon)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use linkplan_config::RingSet;
        use linkplan_core::{SatelliteId, Transport};

        #[test]
        fn converts_rings_and_horizon() {
            let configs = vec![
                SatelliteConfig {
                    id: SatelliteId::new("KA-1"),
                    transport: Transport::Ka,
                    longitude_deg: Some(25.0),
                    coverage: Some(RingSet::Single(vec![
                        [-10.0, -10.0],
                        [10.0, -10.0],
                        [10.0, 10.0],
                        [-10.0, 10.0],
                    ])),
                },
                SatelliteConfig {
                    id: SatelliteId::new("X-1"),
                    transport: Transport::X,
                    longitude_deg: Some(0.0),
                    coverage: None,
                },
            ];
            let settings = EngineSettings {
                min_elevation_deg: 20.0,
                ..EngineSettings::default()
            };
            let catalog = from_config(&configs, &settings);
            assert_eq!(catalog.len(), 2);
            assert_eq!(catalog.horizon().min_elevation_deg, 20.0);
            let covering = catalog.check_coverage_at_point(0.0, 0.0);
            assert!(covering.contains(&SatelliteId::new("KA-1")));
            assert!(covering.contains(&SatelliteId::new("X-1")));
            // far enough east that elevation drops below 20 degrees
            let covering = catalog.check_coverage_at_point(0.0, 75.0);
            assert!(covering.is_empty());
        }
    }
}
