use crate::features::{FeatureSet, PointFeature, StationFeature, TrackFeature};
use crate::filter::state::{FilterDimension, FilterState, Range};
use crate::geometry::{try_project_to_plane, GeoPoint};
use crate::index::SpatialIndex;
use crate::prelude::{CoreError, CoreResult};
use crate::telemetry::{LogManager, MetricsSnapshot, RecomputeMetrics};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Features passing a filter state, as indices into a shared [`FeatureSet`].
#[derive(Debug, Clone)]
pub struct VisibleSet {
    features: Arc<FeatureSet>,
    state: FilterState,
    points: Vec<usize>,
    stations: Vec<usize>,
}

impl VisibleSet {
    pub fn features(&self) -> &Arc<FeatureSet> {
        &self.features
    }

    pub fn filter_state(&self) -> &FilterState {
        &self.state
    }

    pub fn point_indices(&self) -> &[usize] {
        &self.points
    }

    pub fn station_indices(&self) -> &[usize] {
        &self.stations
    }

    pub fn points(&self) -> impl Iterator<Item = &PointFeature> + '_ {
        self.points.iter().map(|&idx| &self.features.points[idx])
    }

    /// Tracks paired with the visible points, in the same order.
    pub fn tracks(&self) -> impl Iterator<Item = &TrackFeature> + '_ {
        self.points.iter().map(|&idx| &self.features.tracks[idx])
    }

    pub fn stations(&self) -> impl Iterator<Item = &StationFeature> + '_ {
        self.stations.iter().map(|&idx| &self.features.stations[idx])
    }

    pub fn station_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.stations().map(|station| station.key.as_str())
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }
}

impl PartialEq for VisibleSet {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.features, &other.features)
            && self.points == other.points
            && self.stations == other.stations
    }
}

/// Applies `state` to every point; tracks follow their point and stations
/// follow the points that reference them.
pub fn visible_subset(features: &Arc<FeatureSet>, state: &FilterState) -> VisibleSet {
    let points: Vec<usize> = features
        .points
        .iter()
        .enumerate()
        .filter(|(_, point)| state.admits(&point.attributes))
        .map(|(idx, _)| idx)
        .collect();

    let stations: BTreeSet<usize> = points
        .iter()
        .flat_map(|&idx| features.points[idx].stations.iter().copied())
        .collect();

    VisibleSet {
        features: Arc::clone(features),
        state: *state,
        points,
        stations: stations.into_iter().collect(),
    }
}

/// Owns the filter state and the spatial index over the visible points.
pub struct FilterEngine {
    features: Arc<FeatureSet>,
    state: FilterState,
    index: SpatialIndex,
    metrics: RecomputeMetrics,
    logger: LogManager,
}

impl FilterEngine {
    /// Engine with every filter open. The index stays empty until the first
    /// [`recompute`](Self::recompute).
    pub fn new(features: Arc<FeatureSet>) -> Self {
        Self {
            features,
            state: FilterState::unbounded(),
            index: SpatialIndex::new(),
            metrics: RecomputeMetrics::new(),
            logger: LogManager::new("filter"),
        }
    }

    pub fn with_state(features: Arc<FeatureSet>, state: FilterState) -> CoreResult<Self> {
        let mut engine = Self::new(features);
        for dimension in FilterDimension::ALL {
            engine.set_filter(dimension, state.get(dimension))?;
        }
        Ok(engine)
    }

    pub fn features(&self) -> &Arc<FeatureSet> {
        &self.features
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    /// Replaces one dimension's range. Invalid bounds leave the state untouched.
    pub fn set_filter(&mut self, dimension: FilterDimension, range: Range) -> CoreResult<()> {
        if !range.is_valid() {
            self.metrics.record_rejected();
            self.logger.warn(&format!(
                "rejected {} bounds [{}, {}]",
                dimension, range.lower, range.upper
            ));
            return Err(CoreError::InvalidBounds {
                dimension,
                lower: range.lower,
                upper: range.upper,
            });
        }
        self.state.set(dimension, range);
        Ok(())
    }

    /// Derives the visible set from scratch and rebuilds the index over it.
    pub fn recompute(&mut self) -> VisibleSet {
        let visible = visible_subset(&self.features, &self.state);
        self.index.rebuild(
            visible
                .point_indices()
                .iter()
                .map(|&idx| (idx, self.features.points[idx].planar)),
        );
        self.metrics.record_recompute();
        self.logger.detail(&format!(
            "recompute: {}/{} points, {}/{} stations",
            visible.point_count(),
            self.features.points.len(),
            visible.station_count(),
            self.features.stations.len()
        ));
        visible
    }

    /// Visible point closest to planar `(x, y)` as of the last recompute.
    pub fn nearest(&self, x: f64, y: f64) -> Option<&PointFeature> {
        self.index
            .nearest(x, y)
            .map(|neighbor| &self.features.points[neighbor.item])
    }

    /// Projects a clicked map position and looks up the nearest visible point.
    pub fn nearest_to(&self, position: GeoPoint) -> CoreResult<Option<&PointFeature>> {
        let planar = try_project_to_plane(position.lng, position.lat)?;
        Ok(self.nearest(planar.x, planar.y))
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub(crate) fn record_deferred(&self) {
        self.metrics.record_deferred();
    }
}
