use crate::generator::template::{station_sites, StationSite};
use anyhow::ensure;
use meteorcore::dataset::{AtmosphericData, Event, Observation, OrbitalData};
use meteorcore::filter::DEFAULT_START_TIME;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const DAY: f64 = 86_400.0;

/// Configuration for generating a synthetic meteor dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub event_count: usize,
    pub station_count: usize,
    pub seed: u64,
    pub center_lat: f64,
    pub center_lng: f64,
    pub spread_deg: f64,
    /// Unix seconds of the earliest event.
    pub start_time: f64,
    pub span_days: f64,
    /// Share of events without a trajectory solution.
    pub missing_trajectory: f64,
    /// Share of events without orbital elements.
    pub missing_orbit: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            event_count: 250,
            station_count: 12,
            seed: 0,
            center_lat: 59.9,
            center_lng: 10.75,
            spread_deg: 2.5,
            start_time: DEFAULT_START_TIME - 60.0 * DAY,
            span_days: 240.0,
            missing_trajectory: 0.1,
            missing_orbit: 0.2,
        }
    }
}

impl GeneratorConfig {
    fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.station_count > 0, "generator needs at least one station");
        ensure!(self.spread_deg > 0.0, "generator spread must be positive");
        ensure!(self.span_days > 0.0, "generator time span must be positive");
        ensure!(
            (0.0..=1.0).contains(&self.missing_trajectory)
                && (0.0..=1.0).contains(&self.missing_orbit),
            "generator missing-data shares must lie in [0, 1]"
        );
        ensure!(
            self.center_lat.abs() + self.spread_deg * 2.0 < 85.0,
            "generator area reaches polar latitudes"
        );
        Ok(())
    }
}

fn build_event<R: Rng>(
    rng: &mut R,
    config: &GeneratorConfig,
    sites: &[StationSite],
    index: usize,
) -> Event {
    let time = (config.start_time + rng.gen_range(0.0..config.span_days * DAY)).round();
    let observer_count = rng.gen_range(1..=sites.len().min(4));
    let observations = sites
        .choose_multiple(rng, observer_count)
        .map(|site| Observation {
            station_code: site.code.clone(),
            station_latitude: Some(site.latitude),
            station_longitude: Some(site.longitude),
            // A few cameras have no clock sync.
            observation_start_time: Some(if rng.gen_bool(0.05) {
                0.0
            } else {
                time + rng.gen_range(0.0..2.0)
            }),
        })
        .collect();

    let atmospheric_data = if rng.gen_bool(config.missing_trajectory) {
        None
    } else {
        let start_lat = config.center_lat + rng.gen_range(-config.spread_deg..config.spread_deg);
        let start_lng =
            config.center_lng + rng.gen_range(-config.spread_deg..config.spread_deg) * 2.0;
        let start_height = rng.gen_range(70.0..130.0);
        Some(AtmosphericData {
            start_position_north: Some(start_lat),
            start_position_east: Some(start_lng),
            end_position_north: Some(start_lat + rng.gen_range(-0.6..0.6)),
            end_position_east: Some(start_lng + rng.gen_range(-1.0..1.0)),
            start_height: Some(start_height),
            end_height: Some(rng.gen_range(20.0..start_height - 5.0)),
            ..Default::default()
        })
    };

    let orbital_data = if rng.gen_bool(config.missing_orbit) {
        None
    } else {
        Some(OrbitalData {
            eccentricity: Some(rng.gen_range(0.0..1.6)),
            ..Default::default()
        })
    };

    Event {
        id: format!("syn{}_{:05}", config.seed, index),
        observations,
        atmospheric_data,
        orbital_data,
    }
}

pub fn build_events(config: &GeneratorConfig) -> anyhow::Result<Vec<Event>> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let sites = station_sites(
        &mut rng,
        config.station_count,
        config.center_lat,
        config.center_lng,
        config.spread_deg,
    );

    Ok((0..config.event_count)
        .map(|index| build_event(&mut rng, config, &sites, index))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generator_builds_expected_event_count() {
        let events = build_events(&GeneratorConfig::default()).unwrap();
        assert_eq!(events.len(), 250);
        assert!(events.iter().all(|event| !event.observations.is_empty()));
    }

    #[test]
    fn generator_is_reproducible_for_a_seed() {
        let config = GeneratorConfig {
            event_count: 20,
            seed: 13,
            ..Default::default()
        };
        assert_eq!(build_events(&config).unwrap(), build_events(&config).unwrap());
    }

    #[test]
    fn stations_are_drawn_from_a_shared_pool() {
        let config = GeneratorConfig {
            event_count: 100,
            station_count: 5,
            ..Default::default()
        };
        let events = build_events(&config).unwrap();
        let codes: HashSet<&str> = events
            .iter()
            .flat_map(|event| event.observations.iter())
            .map(|observation| observation.station_code.as_str())
            .collect();
        assert!(codes.len() <= 5);
    }

    #[test]
    fn missing_shares_are_respected_at_the_extremes() {
        let config = GeneratorConfig {
            event_count: 30,
            missing_trajectory: 1.0,
            missing_orbit: 0.0,
            ..Default::default()
        };
        let events = build_events(&config).unwrap();
        assert!(events.iter().all(|event| event.atmospheric_data.is_none()));
        assert!(events.iter().all(|event| event.orbital_data.is_some()));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = GeneratorConfig {
            station_count: 0,
            ..Default::default()
        };
        assert!(build_events(&config).is_err());
    }
}
