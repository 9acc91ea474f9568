use crate::dataset::TimeExtent;
use crate::features::EventAttributes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 2025-01-01T00:00:00Z, the initial lower bound of the time slider.
pub const DEFAULT_START_TIME: f64 = 1_735_689_600.0;

/// Default height slider span, kilometers.
pub const DEFAULT_HEIGHT_RANGE: Range = Range {
    lower: 0.0,
    upper: 150.0,
};

/// Snap points offered for eccentricity bounds.
pub const ECCENTRICITY_STEPS: [f64; 7] = [0.0, 0.25, 0.5, 0.75, 1.0, 2.0, f64::INFINITY];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterDimension {
    Time,
    StartHeight,
    EndHeight,
    Eccentricity,
}

impl FilterDimension {
    pub const ALL: [FilterDimension; 4] = [
        FilterDimension::Time,
        FilterDimension::StartHeight,
        FilterDimension::EndHeight,
        FilterDimension::Eccentricity,
    ];

    /// The widest range a control for this dimension can express.
    pub fn default_range(self) -> Range {
        match self {
            FilterDimension::Eccentricity => Range::new(0.0, f64::INFINITY),
            _ => Range::UNBOUNDED,
        }
    }

    /// Whether features lacking the attribute are hidden once the range is
    /// narrowed below [`default_range`](Self::default_range). Missing heights
    /// never fail a height bound.
    pub fn hides_missing(self) -> bool {
        !matches!(self, FilterDimension::StartHeight | FilterDimension::EndHeight)
    }
}

impl fmt::Display for FilterDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterDimension::Time => "time",
            FilterDimension::StartHeight => "start height",
            FilterDimension::EndHeight => "end height",
            FilterDimension::Eccentricity => "eccentricity",
        };
        f.write_str(name)
    }
}

/// Closed interval. An upper bound of `f64::MAX` or more is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RangeRepr", into = "RangeRepr")]
pub struct Range {
    pub lower: f64,
    pub upper: f64,
}

impl Range {
    pub const UNBOUNDED: Range = Range {
        lower: f64::NEG_INFINITY,
        upper: f64::INFINITY,
    };

    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn at_least(lower: f64) -> Self {
        Self::new(lower, f64::INFINITY)
    }

    pub fn is_valid(&self) -> bool {
        !self.lower.is_nan() && !self.upper.is_nan() && self.lower <= self.upper
    }

    pub fn is_upper_unbounded(&self) -> bool {
        self.upper >= f64::MAX
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && (self.is_upper_unbounded() || value <= self.upper)
    }

    pub fn covers(&self, other: &Range) -> bool {
        let upper_ok = self.is_upper_unbounded()
            || (!other.is_upper_unbounded() && self.upper >= other.upper);
        self.lower <= other.lower && upper_ok
    }
}

/// Wire form: absent bounds are open.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RangeRepr {
    #[serde(default)]
    lower: Option<f64>,
    #[serde(default)]
    upper: Option<f64>,
}

impl From<RangeRepr> for Range {
    fn from(repr: RangeRepr) -> Self {
        Range {
            lower: repr.lower.unwrap_or(f64::NEG_INFINITY),
            upper: repr.upper.unwrap_or(f64::INFINITY),
        }
    }
}

impl From<Range> for RangeRepr {
    fn from(range: Range) -> Self {
        RangeRepr {
            lower: Some(range.lower).filter(|lower| lower.is_finite()),
            upper: Some(range.upper).filter(|_| !range.is_upper_unbounded()),
        }
    }
}

/// The four range predicates applied to every event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub time: Range,
    pub start_height: Range,
    pub end_height: Range,
    pub eccentricity: Range,
}

impl FilterState {
    /// Every dimension at its default range; nothing is hidden.
    pub fn unbounded() -> Self {
        Self {
            time: FilterDimension::Time.default_range(),
            start_height: FilterDimension::StartHeight.default_range(),
            end_height: FilterDimension::EndHeight.default_range(),
            eccentricity: FilterDimension::Eccentricity.default_range(),
        }
    }

    /// Initial slider positions of the map front end.
    pub fn front_end_defaults(extent: Option<TimeExtent>) -> Self {
        let time = match extent {
            Some(extent) => Range::new(DEFAULT_START_TIME.clamp(extent.min, extent.max), extent.max),
            None => Range::at_least(DEFAULT_START_TIME),
        };
        Self {
            time,
            start_height: DEFAULT_HEIGHT_RANGE,
            end_height: DEFAULT_HEIGHT_RANGE,
            eccentricity: FilterDimension::Eccentricity.default_range(),
        }
    }

    pub fn get(&self, dimension: FilterDimension) -> Range {
        match dimension {
            FilterDimension::Time => self.time,
            FilterDimension::StartHeight => self.start_height,
            FilterDimension::EndHeight => self.end_height,
            FilterDimension::Eccentricity => self.eccentricity,
        }
    }

    pub(crate) fn set(&mut self, dimension: FilterDimension, range: Range) {
        match dimension {
            FilterDimension::Time => self.time = range,
            FilterDimension::StartHeight => self.start_height = range,
            FilterDimension::EndHeight => self.end_height = range,
            FilterDimension::Eccentricity => self.eccentricity = range,
        }
    }

    /// Single predicate used for points, tracks and, through points, stations.
    pub fn admits(&self, attributes: &EventAttributes) -> bool {
        self.admits_times(&attributes.observation_times)
            && self.admits_value(FilterDimension::StartHeight, attributes.start_height())
            && self.admits_value(FilterDimension::EndHeight, attributes.end_height())
            && self.admits_value(FilterDimension::Eccentricity, attributes.eccentricity())
    }

    // At least one known observation time must fall inside the window.
    fn admits_times(&self, times: &[f64]) -> bool {
        if times.is_empty() {
            return self.admits_missing(FilterDimension::Time);
        }
        times.iter().any(|&time| self.time.contains(time))
    }

    fn admits_value(&self, dimension: FilterDimension, value: Option<f64>) -> bool {
        match value {
            Some(value) => self.get(dimension).contains(value),
            None => self.admits_missing(dimension),
        }
    }

    fn admits_missing(&self, dimension: FilterDimension) -> bool {
        !dimension.hides_missing() || self.get(dimension).covers(&dimension.default_range())
    }
}

impl Default for FilterState {
    fn default() -> Self {
        Self::unbounded()
    }
}
