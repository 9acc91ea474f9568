use meteorcore::dataset::{self, AtmosphericData, Event, Observation, OrbitalData};
use meteorcore::features;
use meteorcore::filter::{FilterDimension, FilterEngine, FilterState, Range};
use meteorcore::geometry::project_to_plane;
use std::sync::Arc;

const T: f64 = 1_740_000_000.0;

fn observation(code: &str, lat: f64, lng: f64, time: f64) -> Observation {
    Observation {
        station_code: code.into(),
        station_latitude: Some(lat),
        station_longitude: Some(lng),
        observation_start_time: Some(time),
    }
}

fn trajectory(end_lng: f64, start_height: f64, end_height: f64) -> AtmosphericData {
    AtmosphericData {
        start_position_north: Some(60.4),
        start_position_east: Some(end_lng - 0.4),
        end_position_north: Some(60.1),
        end_position_east: Some(end_lng),
        start_height: Some(start_height),
        end_height: Some(end_height),
        ..Default::default()
    }
}

fn orbit(eccentricity: f64) -> Option<OrbitalData> {
    Some(OrbitalData {
        eccentricity: Some(eccentricity),
        ..Default::default()
    })
}

/// One fully observed event at `T`, one far outside the time window and one
/// without a trajectory. OSL is shared by the first two.
fn three_events() -> Vec<Event> {
    vec![
        Event {
            id: "20250219_211320".into(),
            observations: vec![
                observation("OSL", 59.91, 10.75, T),
                observation("HAM", 60.79, 11.07, T + 0.5),
            ],
            atmospheric_data: Some(trajectory(10.9, 96.0, 72.0)),
            orbital_data: orbit(0.6),
        },
        Event {
            id: "20250301_010101".into(),
            observations: vec![
                observation("OSL", 59.91, 10.75, T + 900_000.0),
                observation("TRD", 63.43, 10.39, T + 900_000.0),
            ],
            atmospheric_data: Some(trajectory(10.2, 101.0, 80.0)),
            orbital_data: orbit(0.9),
        },
        Event {
            id: "20250219_211400".into(),
            observations: vec![observation("BRG", 60.39, 5.32, T)],
            atmospheric_data: None,
            orbital_data: None,
        },
    ]
}

fn mixed_events() -> Vec<Event> {
    (0..40)
        .map(|i| {
            let f = i as f64;
            Event {
                id: format!("m{i}"),
                observations: vec![observation(
                    &format!("S{}", i % 7),
                    59.0 + (i % 7) as f64 * 0.3,
                    9.0 + (i % 7) as f64 * 0.4,
                    T + f * 3600.0,
                )],
                atmospheric_data: Some(trajectory(8.0 + (f * 0.37) % 5.0, 80.0 + f, 40.0 + f)),
                orbital_data: if i % 5 == 0 { None } else { orbit((f * 0.13) % 2.5) },
            }
        })
        .collect()
}

#[test]
fn end_to_end_single_match() {
    let features = Arc::new(features::build(&three_events()));
    assert_eq!(features.stations.len(), 4);

    let mut engine = FilterEngine::new(features);
    engine
        .set_filter(FilterDimension::Time, Range::new(T - 1.0, T + 1.0))
        .unwrap();
    engine
        .set_filter(FilterDimension::Eccentricity, Range::new(0.5, 1.0))
        .unwrap();
    let visible = engine.recompute();

    let points: Vec<&str> = visible
        .points()
        .map(|p| p.attributes.event_id.as_str())
        .collect();
    assert_eq!(points, vec!["20250219_211320"]);
    assert_eq!(visible.tracks().count(), 1);

    let mut stations: Vec<&str> = visible.stations().map(|s| s.code.as_str()).collect();
    stations.sort_unstable();
    assert_eq!(stations, vec!["HAM", "OSL"]);
}

#[test]
fn recompute_and_nearest_are_deterministic() {
    let features = Arc::new(features::build(&mixed_events()));
    let mut engine = FilterEngine::new(features);
    engine
        .set_filter(FilterDimension::StartHeight, Range::new(85.0, 110.0))
        .unwrap();

    let first = engine.recompute();
    let query = project_to_plane(10.0, 60.0);
    let first_hit = engine.nearest(query.x, query.y).map(|p| p.attributes.event_id.clone());

    for _ in 0..3 {
        assert_eq!(engine.recompute(), first);
        let hit = engine.nearest(query.x, query.y).map(|p| p.attributes.event_id.clone());
        assert_eq!(hit, first_hit);
    }
    assert!(first_hit.is_some());
}

#[test]
fn narrowing_a_range_never_adds_points() {
    let features = Arc::new(features::build(&mixed_events()));
    let ranges = [
        (FilterDimension::Time, Range::new(T, T + 39.0 * 3600.0)),
        (FilterDimension::Time, Range::new(T + 3600.0, T + 20.0 * 3600.0)),
        (FilterDimension::StartHeight, Range::new(82.0, 115.0)),
        (FilterDimension::EndHeight, Range::new(45.0, 70.0)),
        (FilterDimension::Eccentricity, Range::new(0.0, 2.0)),
        (FilterDimension::Eccentricity, Range::new(0.25, 1.0)),
        (FilterDimension::Eccentricity, Range::new(0.5, 0.75)),
    ];

    let mut engine = FilterEngine::new(features);
    let mut previous = engine.recompute().point_count();
    for (dimension, range) in ranges {
        engine.set_filter(dimension, range).unwrap();
        let count = engine.recompute().point_count();
        assert!(count <= previous, "{dimension} narrowed to {range:?} grew {previous} -> {count}");
        previous = count;
    }
}

#[test]
fn missing_eccentricity_hidden_by_any_narrowing() {
    let events = vec![Event {
        id: "no-orbit".into(),
        observations: vec![observation("OSL", 59.91, 10.75, T)],
        atmospheric_data: Some(trajectory(10.9, 96.0, 72.0)),
        orbital_data: None,
    }];
    let features = Arc::new(features::build(&events));

    let mut engine = FilterEngine::with_state(features, FilterState::unbounded()).unwrap();
    engine
        .set_filter(FilterDimension::Eccentricity, Range::at_least(0.0))
        .unwrap();
    assert_eq!(engine.recompute().point_count(), 1);

    engine
        .set_filter(FilterDimension::Eccentricity, Range::new(0.0, 0.5))
        .unwrap();
    let visible = engine.recompute();
    assert_eq!(visible.point_count(), 0);
    assert_eq!(visible.station_count(), 0);
}

#[test]
fn shared_station_yields_one_feature() {
    let features = features::build(&three_events());
    let osl: Vec<_> = features
        .stations
        .iter()
        .filter(|station| station.code == "OSL")
        .collect();
    assert_eq!(osl.len(), 1);
    assert_eq!(features.points[0].stations[0], features.points[1].stations[0]);
}

#[test]
fn front_end_defaults_apply_to_loaded_dataset() {
    let events = three_events();
    let extent = dataset::time_extent(&events);
    let features = Arc::new(features::build(&events));
    let mut engine =
        FilterEngine::with_state(features, FilterState::front_end_defaults(extent)).unwrap();
    let visible = engine.recompute();
    assert_eq!(visible.point_count(), 2);
}

#[test]
fn events_without_heights_show_under_front_end_defaults() {
    let mut atmospheric = trajectory(10.9, 0.0, 0.0);
    atmospheric.start_height = None;
    atmospheric.end_height = None;
    let events = vec![Event {
        id: "no-heights".into(),
        observations: vec![observation("OSL", 59.91, 10.75, T)],
        atmospheric_data: Some(atmospheric),
        orbital_data: orbit(0.7),
    }];
    let extent = dataset::time_extent(&events);
    let features = Arc::new(features::build(&events));
    let mut engine =
        FilterEngine::with_state(features, FilterState::front_end_defaults(extent)).unwrap();

    let visible = engine.recompute();
    assert_eq!(visible.point_count(), 1);
    assert_eq!(visible.station_count(), 1);
}
