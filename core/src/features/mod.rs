//! Derived map features: one point and one track per plottable event, and
//! one station per distinct observing site.

pub mod builder;

pub use builder::build;

use crate::dataset::{AtmosphericData, OrbitalData, TimeExtent};
use crate::geometry::{GeoPoint, PlanarPoint};
use serde::Serialize;

/// Filterable attributes shared by a point and its track.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAttributes {
    pub event_id: String,
    /// Earliest known observation time.
    pub observation_start_time: Option<f64>,
    /// Every known observation time of the event.
    #[serde(skip)]
    pub observation_times: Vec<f64>,
    pub bearing: f64,
    #[serde(flatten)]
    pub atmospheric: AtmosphericData,
    #[serde(flatten)]
    pub orbital: Option<OrbitalData>,
}

impl EventAttributes {
    pub fn start_height(&self) -> Option<f64> {
        self.atmospheric.start_height.filter(|h| h.is_finite())
    }

    pub fn end_height(&self) -> Option<f64> {
        self.atmospheric.end_height.filter(|h| h.is_finite())
    }

    pub fn eccentricity(&self) -> Option<f64> {
        self.orbital
            .as_ref()
            .and_then(|orbital| orbital.eccentricity)
            .filter(|e| e.is_finite())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointFeature {
    pub attributes: EventAttributes,
    /// End of the trajectory.
    pub position: GeoPoint,
    pub planar: PlanarPoint,
    /// Indices into [`FeatureSet::stations`] of the sites that observed the event.
    pub stations: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackFeature {
    pub attributes: EventAttributes,
    pub start: GeoPoint,
    pub end: GeoPoint,
    pub start_planar: PlanarPoint,
    pub end_planar: PlanarPoint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationFeature {
    /// `code|latitude|longitude`
    pub key: String,
    pub code: String,
    pub position: GeoPoint,
    pub planar: PlanarPoint,
}

/// Immutable output of the build pass.
///
/// `points[i]` and `tracks[i]` always derive from the same event.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    pub stations: Vec<StationFeature>,
    pub points: Vec<PointFeature>,
    pub tracks: Vec<TrackFeature>,
    pub extent: Option<TimeExtent>,
}

impl FeatureSet {
    pub fn find_station(&self, key: &str) -> Option<&StationFeature> {
        self.stations.iter().find(|station| station.key == key)
    }

    pub fn find_point(&self, event_id: &str) -> Option<&PointFeature> {
        self.points
            .iter()
            .find(|point| point.attributes.event_id == event_id)
    }
}
