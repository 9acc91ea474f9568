/// Initial great-circle bearing from start to end, in degrees within `[0, 360)`.
///
/// Used to orient markers; never used as a distance.
pub fn bearing(start_lat: f64, start_lng: f64, end_lat: f64, end_lng: f64) -> f64 {
    let lat1 = start_lat.to_radians();
    let lat2 = end_lat.to_radians();
    let delta_lng = (end_lng - start_lng).to_radians();

    let y = delta_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lng.cos();
    let degrees = y.atan2(x).to_degrees();
    (degrees + 360.0) % 360.0
}
