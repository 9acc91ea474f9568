use crate::filter::FilterDimension;

/// Common error type for the meteor core.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("dataset unreadable: {0}")]
    DatasetIo(#[from] std::io::Error),
    #[error("dataset malformed: {0}")]
    DatasetParse(#[from] serde_json::Error),
    #[error("invalid {dimension} bounds [{lower}, {upper}]")]
    InvalidBounds {
        dimension: FilterDimension,
        lower: f64,
        upper: f64,
    },
    #[error("coordinate ({lng}, {lat}) cannot be projected")]
    InvalidCoordinate { lng: f64, lat: f64 },
    #[error("filter dispatcher has shut down")]
    DispatcherClosed,
}

pub type CoreResult<T> = Result<T, CoreError>;

pub use crate::dataset::{Event, TimeExtent};
pub use crate::features::{FeatureSet, PointFeature, StationFeature, TrackFeature};
pub use crate::filter::{FilterEngine, FilterState, Range, VisibleSet};
pub use crate::geometry::{GeoPoint, PlanarPoint};
