pub mod bearing;
pub mod projection;

pub use bearing::bearing;
pub use projection::{
    project_to_plane, try_project_to_plane, unproject_from_plane, GeoPoint, PlanarPoint,
    HALF_CIRCUMFERENCE,
};
