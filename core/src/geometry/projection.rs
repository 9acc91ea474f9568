use crate::prelude::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Half the equatorial circumference in meters (Web Mercator extent).
pub const HALF_CIRCUMFERENCE: f64 = 20037508.34;

/// Geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

/// Position on the Web Mercator plane, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarPoint {
    pub x: f64,
    pub y: f64,
}

impl PlanarPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance_squared(&self, other: &PlanarPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Forward Web Mercator projection of a WGS-84 coordinate.
///
/// Polar latitudes produce non-finite output; use [`try_project_to_plane`]
/// when the input is not known to be valid.
pub fn project_to_plane(lng: f64, lat: f64) -> PlanarPoint {
    let x = lng * HALF_CIRCUMFERENCE / 180.0;
    let y = ((90.0 + lat) * PI / 360.0).tan().ln() / (PI / 180.0) * HALF_CIRCUMFERENCE / 180.0;
    PlanarPoint { x, y }
}

/// Checked projection that rejects polar and non-finite coordinates.
pub fn try_project_to_plane(lng: f64, lat: f64) -> CoreResult<PlanarPoint> {
    if !lng.is_finite() || !lat.is_finite() || lat.abs() >= 90.0 {
        return Err(CoreError::InvalidCoordinate { lng, lat });
    }
    let projected = project_to_plane(lng, lat);
    if !projected.is_finite() {
        return Err(CoreError::InvalidCoordinate { lng, lat });
    }
    Ok(projected)
}

/// Inverse of [`project_to_plane`].
pub fn unproject_from_plane(x: f64, y: f64) -> GeoPoint {
    let lng = x * 180.0 / HALF_CIRCUMFERENCE;
    let lat = (y * 180.0 / HALF_CIRCUMFERENCE * PI / 180.0).exp().atan() * 360.0 / PI - 90.0;
    GeoPoint { lng, lat }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn origin_maps_to_origin() {
        let p = project_to_plane(0.0, 0.0);
        assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn antimeridian_maps_to_half_circumference() {
        let p = project_to_plane(180.0, 0.0);
        assert_abs_diff_eq!(p.x, HALF_CIRCUMFERENCE, epsilon = 1e-6);
    }

    #[test]
    fn projection_round_trips_for_non_polar_inputs() {
        for &(lng, lat) in &[(10.75, 59.9), (-122.4, 37.8), (151.2, -33.9), (0.0, 85.0)] {
            let p = project_to_plane(lng, lat);
            let back = unproject_from_plane(p.x, p.y);
            assert_abs_diff_eq!(back.lng, lng, epsilon = 1e-6);
            assert_abs_diff_eq!(back.lat, lat, epsilon = 1e-6);
        }
    }

    #[test]
    fn checked_projection_rejects_poles() {
        assert!(try_project_to_plane(10.0, 90.0).is_err());
        assert!(try_project_to_plane(10.0, -90.0).is_err());
        assert!(try_project_to_plane(f64::NAN, 10.0).is_err());
        assert!(try_project_to_plane(10.0, 60.0).is_ok());
    }
}
