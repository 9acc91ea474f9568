use crate::generator::profile::build_events;
use crate::workflow::config::{ExplorerConfig, FilterSettings};
use anyhow::Context;
use meteorcore::dataset::{self, Event, TimeExtent};
use meteorcore::features::{self, FeatureSet, PointFeature};
use meteorcore::filter::{FilterEngine, FilterState};
use meteorcore::geometry::GeoPoint;
use std::sync::Arc;

pub struct WorkflowResult {
    pub event_count: usize,
    pub total_points: usize,
    pub total_stations: usize,
    pub visible_points: usize,
    pub visible_stations: usize,
    pub extent: Option<TimeExtent>,
    pub filter_state: FilterState,
    pub nearest: Option<PointFeature>,
}

#[derive(Clone)]
pub struct Runner {
    event_count: usize,
    features: Arc<FeatureSet>,
    settings: FilterSettings,
}

impl Runner {
    pub fn from_config(config: &ExplorerConfig) -> anyhow::Result<Self> {
        let events = match &config.dataset {
            Some(path) => dataset::load(path)
                .with_context(|| format!("loading dataset {}", path.display()))?,
            None => build_events(&config.generator).context("generating synthetic dataset")?,
        };
        Ok(Self::from_events(&events, config.filters.clone()))
    }

    pub fn from_events(events: &[Event], settings: FilterSettings) -> Self {
        Self {
            event_count: events.len(),
            features: Arc::new(features::build(events)),
            settings,
        }
    }

    pub fn features(&self) -> &Arc<FeatureSet> {
        &self.features
    }

    /// Engine seeded with the front-end defaults plus configured overrides.
    pub fn engine(&self) -> anyhow::Result<FilterEngine> {
        let defaults = FilterState::front_end_defaults(self.features.extent);
        let mut engine = FilterEngine::with_state(Arc::clone(&self.features), defaults)
            .context("applying default filters")?;
        self.settings
            .apply_to(&mut engine)
            .context("applying configured filters")?;
        Ok(engine)
    }

    pub fn execute(&self, nearest: Option<GeoPoint>) -> anyhow::Result<WorkflowResult> {
        let mut engine = self.engine()?;
        let visible = engine.recompute();

        let nearest = match nearest {
            Some(position) => engine
                .nearest_to(position)
                .context("looking up nearest event")?
                .cloned(),
            None => None,
        };

        Ok(WorkflowResult {
            event_count: self.event_count,
            total_points: self.features.points.len(),
            total_stations: self.features.stations.len(),
            visible_points: visible.point_count(),
            visible_stations: visible.station_count(),
            extent: self.features.extent,
            filter_state: *engine.state(),
            nearest,
        })
    }
}
