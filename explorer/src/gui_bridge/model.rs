use meteorcore::dataset::TimeExtent;
use meteorcore::filter::{FilterDimension, Range, ECCENTRICITY_STEPS};
use meteorcore::format::{format_bound, format_timestamp};
use meteorcore::geojson::Feature;
use serde::{Deserialize, Serialize};

/// Body of `POST /filter`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterUpdate {
    pub dimension: FilterDimension,
    #[serde(flatten)]
    pub range: Range,
}

/// Query of `GET /nearest`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NearestQuery {
    pub lng: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NearestReply {
    pub feature: Option<Feature>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtentReply {
    pub extent: Option<TimeExtent>,
    pub min_label: String,
    pub max_label: String,
    /// Snap points of the eccentricity control, as displayed.
    pub eccentricity_steps: Vec<String>,
}

impl ExtentReply {
    pub fn new(extent: Option<TimeExtent>) -> Self {
        let label = |value: Option<f64>| value.map(format_timestamp).unwrap_or_else(|| "--".into());
        Self {
            extent,
            min_label: label(extent.map(|e| e.min)),
            max_label: label(extent.map(|e| e.max)),
            eccentricity_steps: ECCENTRICITY_STEPS.iter().map(|&step| format_bound(step)).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReply {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StatusReply {
    pub fn ok() -> Self {
        Self {
            status: "ok",
            reason: None,
        }
    }

    pub fn failed(status: &'static str, reason: String) -> Self {
        Self {
            status,
            reason: Some(reason),
        }
    }
}
