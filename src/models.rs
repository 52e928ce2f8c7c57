use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

/// One of the two physical site clusters a location belongs to.
///
/// The telemetry table encodes this as the binary `is_hill` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Campus {
    Valley,
    Hill,
}

impl Campus {
    pub fn from_flag(flag: i64) -> Option<Self> {
        match flag {
            0 => Some(Self::Valley),
            1 => Some(Self::Hill),
            _ => None,
        }
    }
}

impl fmt::Display for Campus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valley => f.write_str("valley"),
            Self::Hill => f.write_str("hill"),
        }
    }
}

impl FromStr for Campus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "valley" | "tal" | "0" => Ok(Self::Valley),
            "hill" | "berg" | "1" => Ok(Self::Hill),
            other => Err(format!("unknown campus '{other}' (expected valley or hill)")),
        }
    }
}

/// Coarse bucket of the hour of day an observation was taken in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    /// `[0,12)` is morning, `[12,17)` afternoon and everything later evening.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=11 => Self::Morning,
            12..=16 => Self::Afternoon,
            _ => Self::Evening,
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Morning => f.write_str("morning"),
            Self::Afternoon => f.write_str("afternoon"),
            Self::Evening => f.write_str("evening"),
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(Self::Morning),
            "afternoon" => Ok(Self::Afternoon),
            "evening" => Ok(Self::Evening),
            other => Err(format!(
                "unknown time of day '{other}' (expected morning, afternoon or evening)"
            )),
        }
    }
}

/// A single parsed occupancy observation with its temporal features.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyRecord {
    pub timestamp: NaiveDateTime,
    pub building_id: Option<i64>,
    pub location_id: i64,
    pub campus: Campus,
    /// Fraction of free capacity, clamped to `[0, 1]`.
    pub relative_availability: f64,
    pub location_name: Option<String>,
    pub weekday: Weekday,
    pub hour: u32,
    pub time_of_day: TimeOfDay,
    pub iso_week: u32,
}

impl OccupancyRecord {
    pub fn new(
        timestamp: NaiveDateTime,
        building_id: Option<i64>,
        location_id: i64,
        campus: Campus,
        relative_availability: f64,
        location_name: Option<String>,
    ) -> Self {
        let hour = timestamp.hour();
        Self {
            timestamp,
            building_id,
            location_id,
            campus,
            relative_availability: relative_availability.clamp(0.0, 1.0),
            location_name,
            weekday: timestamp.weekday(),
            hour,
            time_of_day: TimeOfDay::from_hour(hour),
            iso_week: timestamp.iso_week().week(),
        }
    }
}

/// Static comfort ratings of a location, each normalised to `[0.1, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorRatings {
    pub reach: f64,
    pub air: f64,
    pub light: f64,
    pub outlet: f64,
}

/// One ranked study location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRow {
    pub location_id: i64,
    pub location_name: String,
    pub building_name: String,
    pub final_score: f64,
    pub sas_score: f64,
    pub prior_score: f64,
    pub crowding_risk: f64,
    pub mean_availability: f64,
    pub variability_sigma: f64,
    pub distance_penalty: f64,
    pub observation_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildingSummary {
    pub building_name: String,
    pub location_count: usize,
    pub mean_final_score: f64,
}
