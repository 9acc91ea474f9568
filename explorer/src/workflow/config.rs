use crate::generator::profile::GeneratorConfig;
use anyhow::Context;
use meteorcore::filter::{FilterDimension, FilterEngine, Range};
use meteorcore::throttle::DEFAULT_INTERVAL;
use meteorcore::CoreResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Ranges applied on top of the front-end default filters. Absent entries
/// keep the default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub time: Option<Range>,
    pub start_height: Option<Range>,
    pub end_height: Option<Range>,
    pub eccentricity: Option<Range>,
}

impl FilterSettings {
    pub fn overrides(&self) -> Vec<(FilterDimension, Range)> {
        [
            (FilterDimension::Time, self.time),
            (FilterDimension::StartHeight, self.start_height),
            (FilterDimension::EndHeight, self.end_height),
            (FilterDimension::Eccentricity, self.eccentricity),
        ]
        .into_iter()
        .filter_map(|(dimension, range)| range.map(|range| (dimension, range)))
        .collect()
    }

    pub fn set(&mut self, dimension: FilterDimension, range: Range) {
        let slot = match dimension {
            FilterDimension::Time => &mut self.time,
            FilterDimension::StartHeight => &mut self.start_height,
            FilterDimension::EndHeight => &mut self.end_height,
            FilterDimension::Eccentricity => &mut self.eccentricity,
        };
        *slot = Some(range);
    }

    pub fn apply_to(&self, engine: &mut FilterEngine) -> CoreResult<()> {
        for (dimension, range) in self.overrides() {
            engine.set_filter(dimension, range)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Meteor dataset; a synthetic one is generated when absent.
    pub dataset: Option<PathBuf>,
    pub throttle_ms: u64,
    pub bind: SocketAddr,
    pub filters: FilterSettings,
    pub generator: GeneratorConfig,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            dataset: None,
            throttle_ms: DEFAULT_INTERVAL.as_millis() as u64,
            bind: SocketAddr::from(([127, 0, 0, 1], 9000)),
            filters: FilterSettings::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl ExplorerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading explorer config {}", path_ref.display()))?;
        let config: ExplorerConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing explorer config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(dataset: Option<PathBuf>, throttle_ms: u64) -> Self {
        Self {
            dataset,
            throttle_ms,
            ..Default::default()
        }
    }

    pub fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}
