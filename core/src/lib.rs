//! Core of the meteor observation map.
//!
//! Turns a static list of meteor events into map features, filters them by
//! time window, trajectory heights and orbital eccentricity, and answers
//! "nearest visible event" queries on the Web Mercator plane. Rendering and
//! widget wiring live outside this crate.
//!
//! Pipeline: [`dataset::load`] -> [`features::build`] ->
//! [`filter::FilterEngine::recompute`] (which rebuilds the
//! [`index::SpatialIndex`]) -> [`filter::FilterEngine::nearest`].

pub mod dataset;
pub mod features;
pub mod filter;
pub mod format;
pub mod geojson;
pub mod geometry;
pub mod index;
pub mod prelude;
pub mod telemetry;
pub mod throttle;

pub use prelude::{CoreError, CoreResult};
