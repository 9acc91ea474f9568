//! Raw meteor event records as published in the static dataset file.
//!
//! The file is a JSON array of events. A top-level read or parse failure is
//! fatal. An event without an `id` or `observations` list is skipped; a
//! malformed observation, `atmosphericData` or `orbitalData` section is
//! dropped on its own and the rest of the event is kept.

use crate::geometry::GeoPoint;
use crate::prelude::CoreResult;
use crate::telemetry::LogManager;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    #[serde(default)]
    pub station_code: String,
    #[serde(default)]
    pub station_latitude: Option<f64>,
    #[serde(default)]
    pub station_longitude: Option<f64>,
    /// Unix seconds; absent or zero means unknown.
    #[serde(default)]
    pub observation_start_time: Option<f64>,
}

impl Observation {
    pub fn known_start_time(&self) -> Option<f64> {
        self.observation_start_time
            .filter(|time| time.is_finite() && *time > 0.0)
    }

    pub fn station_position(&self) -> Option<GeoPoint> {
        match (self.station_longitude, self.station_latitude) {
            (Some(lng), Some(lat)) => Some(GeoPoint::new(lng, lat)),
            _ => None,
        }
    }
}

/// Trajectory solution. Positions are degrees, heights kilometers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtmosphericData {
    #[serde(default)]
    pub start_position_north: Option<f64>,
    #[serde(default)]
    pub start_position_east: Option<f64>,
    #[serde(default)]
    pub end_position_north: Option<f64>,
    #[serde(default)]
    pub end_position_east: Option<f64>,
    #[serde(default)]
    pub start_height: Option<f64>,
    #[serde(default)]
    pub end_height: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AtmosphericData {
    /// Start and end positions, if all four are present and non-zero.
    pub fn trajectory(&self) -> Option<(GeoPoint, GeoPoint)> {
        let start_lat = usable(self.start_position_north)?;
        let start_lng = usable(self.start_position_east)?;
        let end_lat = usable(self.end_position_north)?;
        let end_lng = usable(self.end_position_east)?;
        Some((
            GeoPoint::new(start_lng, start_lat),
            GeoPoint::new(end_lng, end_lat),
        ))
    }
}

fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v != 0.0)
}

/// Orbital elements; only eccentricity is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrbitalData {
    #[serde(default)]
    pub eccentricity: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub observations: Vec<Observation>,
    #[serde(default, deserialize_with = "lenient_section")]
    pub atmospheric_data: Option<AtmosphericData>,
    #[serde(default, deserialize_with = "lenient_section")]
    pub orbital_data: Option<OrbitalData>,
}

fn lenient_section<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match serde_json::from_value(value) {
        Ok(section) => Some(section),
        Err(err) => {
            LogManager::new("dataset").warn(&format!("dropping malformed section: {}", err));
            None
        }
    }))
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Vec::<Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(err) => {
                LogManager::new("dataset").warn(&format!("dropping malformed entry: {}", err));
                None
            }
        })
        .collect())
}

impl Event {
    pub fn known_times(&self) -> Vec<f64> {
        self.observations
            .iter()
            .filter_map(Observation::known_start_time)
            .collect()
    }

    pub fn eccentricity(&self) -> Option<f64> {
        self.orbital_data
            .as_ref()
            .and_then(|orbital| orbital.eccentricity)
            .filter(|e| e.is_finite())
    }
}

/// Range of known observation times across a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeExtent {
    pub min: f64,
    pub max: f64,
}

/// Parses the dataset, skipping events that do not match the schema.
pub fn parse(contents: &str) -> CoreResult<Vec<Event>> {
    let logger = LogManager::new("dataset");
    let raw: Vec<Value> = serde_json::from_str(contents)?;
    let total = raw.len();

    let events: Vec<Event> = raw
        .into_iter()
        .enumerate()
        .filter_map(|(position, value)| match serde_json::from_value::<Event>(value) {
            Ok(event) => Some(event),
            Err(err) => {
                logger.warn(&format!("skipping event #{}: {}", position, err));
                None
            }
        })
        .collect();

    logger.record(&format!("parsed {} of {} events", events.len(), total));
    Ok(events)
}

pub fn load<P: AsRef<Path>>(path: P) -> CoreResult<Vec<Event>> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse(&contents)
}

pub fn time_extent(events: &[Event]) -> Option<TimeExtent> {
    events
        .iter()
        .flat_map(|event| event.observations.iter())
        .filter_map(Observation::known_start_time)
        .fold(None, |extent: Option<TimeExtent>, time| {
            Some(match extent {
                Some(current) => TimeExtent {
                    min: current.min.min(time),
                    max: current.max.max(time),
                },
                None => TimeExtent {
                    min: time,
                    max: time,
                },
            })
        })
}
