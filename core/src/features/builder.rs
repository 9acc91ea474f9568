use crate::dataset::{self, Event, Observation};
use crate::features::{EventAttributes, FeatureSet, PointFeature, StationFeature, TrackFeature};
use crate::geometry::{bearing, try_project_to_plane, GeoPoint};
use crate::telemetry::LogManager;
use std::collections::HashMap;

pub fn station_key(code: &str, position: GeoPoint) -> String {
    format!("{}|{}|{}", code, position.lat, position.lng)
}

/// Derives stations, points and tracks from the raw events in one pass.
///
/// Never fails: events without a usable trajectory contribute only their
/// stations, and observations without coordinates are ignored.
pub fn build(events: &[Event]) -> FeatureSet {
    let logger = LogManager::new("features");
    let mut set = FeatureSet {
        extent: dataset::time_extent(events),
        ..Default::default()
    };
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut skipped = 0usize;

    for event in events {
        let mut observed_by: Vec<usize> = event
            .observations
            .iter()
            .filter_map(|observation| register_station(&mut set, &mut seen, observation))
            .collect();
        observed_by.sort_unstable();
        observed_by.dedup();

        match derive_point_and_track(event, observed_by) {
            Some((point, track)) => {
                set.points.push(point);
                set.tracks.push(track);
            }
            None => skipped += 1,
        }
    }

    logger.detail(&format!(
        "built {} points, {} stations from {} events ({} without trajectory)",
        set.points.len(),
        set.stations.len(),
        events.len(),
        skipped
    ));
    set
}

fn register_station(
    set: &mut FeatureSet,
    seen: &mut HashMap<String, usize>,
    observation: &Observation,
) -> Option<usize> {
    let position = observation.station_position()?;
    let key = station_key(&observation.station_code, position);
    if let Some(&index) = seen.get(&key) {
        return Some(index);
    }

    let planar = try_project_to_plane(position.lng, position.lat).ok()?;
    let index = set.stations.len();
    set.stations.push(StationFeature {
        key: key.clone(),
        code: observation.station_code.clone(),
        position,
        planar,
    });
    seen.insert(key, index);
    Some(index)
}

fn derive_point_and_track(
    event: &Event,
    stations: Vec<usize>,
) -> Option<(PointFeature, TrackFeature)> {
    let atmospheric = event.atmospheric_data.as_ref()?;
    let (start, end) = atmospheric.trajectory()?;
    let start_planar = try_project_to_plane(start.lng, start.lat).ok()?;
    let end_planar = try_project_to_plane(end.lng, end.lat).ok()?;

    let observation_times = event.known_times();
    let observation_start_time = observation_times.iter().copied().reduce(f64::min);

    let attributes = EventAttributes {
        event_id: event.id.clone(),
        observation_start_time,
        observation_times,
        bearing: bearing(start.lat, start.lng, end.lat, end.lng),
        atmospheric: atmospheric.clone(),
        orbital: event.orbital_data.clone(),
    };

    let point = PointFeature {
        attributes: attributes.clone(),
        position: end,
        planar: end_planar,
        stations,
    };
    let track = TrackFeature {
        attributes,
        start,
        end,
        start_planar,
        end_planar,
    };
    Some((point, track))
}
