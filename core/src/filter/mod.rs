pub mod engine;
pub mod state;

pub use engine::{visible_subset, FilterEngine, VisibleSet};
pub use state::{FilterDimension, FilterState, Range, DEFAULT_START_TIME, ECCENTRICITY_STEPS};
