//! GeoJSON rendering of a visible set. Coordinates are `[lng, lat]`.

use crate::features::{FeatureSet, PointFeature, StationFeature, TrackFeature};
use crate::filter::VisibleSet;
use crate::format::event_url;
use crate::geometry::GeoPoint;
use crate::telemetry::LogManager;
use serde::Serialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: [f64; 2] },
    LineString { coordinates: Vec<[f64; 2]> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    pub id: String,
    pub geometry: Geometry,
    pub properties: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: "FeatureCollection",
            features,
        }
    }
}

/// The three map layers for one visible set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapLayers {
    pub points: FeatureCollection,
    pub tracks: FeatureCollection,
    pub stations: FeatureCollection,
}

pub fn layers(visible: &VisibleSet) -> MapLayers {
    let set = visible.features();
    MapLayers {
        points: FeatureCollection::new(visible.points().map(|p| point_feature(p, set)).collect()),
        tracks: FeatureCollection::new(visible.tracks().map(track_feature).collect()),
        stations: FeatureCollection::new(visible.stations().map(station_feature).collect()),
    }
}

fn coordinates(position: GeoPoint) -> [f64; 2] {
    [position.lng, position.lat]
}

/// Feature properties, or an empty object (logged) if they do not serialize.
fn properties_of<T: Serialize>(attributes: &T) -> Value {
    serde_json::to_value(attributes).unwrap_or_else(|err| {
        LogManager::new("geojson").warn(&format!("unserializable feature properties: {}", err));
        Value::Object(Map::new())
    })
}

fn feature(id: String, geometry: Geometry, properties: Value) -> Feature {
    Feature {
        kind: "Feature",
        id,
        geometry,
        properties,
    }
}

pub fn point_feature(point: &PointFeature, set: &FeatureSet) -> Feature {
    let mut properties = properties_of(&point.attributes);
    if let Value::Object(map) = &mut properties {
        let observers: Vec<&str> = point
            .stations
            .iter()
            .filter_map(|&idx| set.stations.get(idx))
            .map(|station| station.code.as_str())
            .collect();
        map.insert("stationCodes".into(), json!(observers));
        map.insert("url".into(), json!(event_url(&point.attributes.event_id)));
        map.insert("x".into(), json!(point.planar.x));
        map.insert("y".into(), json!(point.planar.y));
    }
    feature(
        point.attributes.event_id.clone(),
        Geometry::Point {
            coordinates: coordinates(point.position),
        },
        properties,
    )
}

pub fn track_feature(track: &TrackFeature) -> Feature {
    feature(
        track.attributes.event_id.clone(),
        Geometry::LineString {
            coordinates: vec![coordinates(track.start), coordinates(track.end)],
        },
        properties_of(&track.attributes),
    )
}

pub fn station_feature(station: &StationFeature) -> Feature {
    feature(
        station.key.clone(),
        Geometry::Point {
            coordinates: coordinates(station.position),
        },
        json!({ "stationCode": station.code }),
    )
}
