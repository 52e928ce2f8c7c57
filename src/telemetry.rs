//! Occupancy telemetry: reading the raw table, deriving temporal features and
//! narrowing the record set to the user's constraints.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Weekday};
use csv::StringRecord;
use flate2::read::MultiGzDecoder;
use tracing::{debug, info};

use crate::error::AdvisorError;
use crate::models::{Campus, OccupancyRecord, TimeOfDay};
use crate::parse::{parse_integer, parse_number};
use crate::priors::AccessibilityIndex;

pub const TIMESTAMP_COLUMN: &str = "t10";
pub const BUILDING_COLUMN: &str = "building_id";
pub const LOCATION_COLUMN: &str = "location_id";
pub const CAMPUS_COLUMN: &str = "is_hill";
pub const AVAILABILITY_COLUMN: &str = "relative_availability";
pub const NAME_COLUMN: &str = "longname";

pub const REQUIRED_COLUMNS: [&str; 5] = [
    TIMESTAMP_COLUMN,
    BUILDING_COLUMN,
    LOCATION_COLUMN,
    CAMPUS_COLUMN,
    AVAILABILITY_COLUMN,
];

/// ISO calendar weeks treated as exam period: 3–8 and 29–32.
pub fn is_exam_week(iso_week: u32) -> bool {
    matches!(iso_week, 3..=8 | 29..=32)
}

/// The telemetry table exactly as read, before any cell is interpreted.
#[derive(Debug, Clone, Default)]
pub struct TelemetryTable {
    headers: Vec<String>,
    rows: Vec<StringRecord>,
}

impl TelemetryTable {
    /// Read a telemetry CSV, transparently inflating `.gz` files.
    ///
    /// Every gzip member is decoded, so concatenated exports load in full.
    pub fn load(path: &Path) -> Result<Self, AdvisorError> {
        let file = File::open(path).map_err(|source| AdvisorError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let gzipped = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));
        let source: Box<dyn Read> = if gzipped {
            Box::new(MultiGzDecoder::new(BufReader::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        let table = Self::from_reader(source)?;
        info!(
            path = %path.display(),
            rows = table.len(),
            "loaded occupancy telemetry"
        );
        Ok(table)
    }

    pub fn from_reader<R: Read>(source: R) -> Result<Self, AdvisorError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(source);
        let headers = reader.headers()?.iter().map(str::to_owned).collect();
        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }
}

#[derive(Debug, Clone, Copy)]
struct TelemetryColumns {
    timestamp: usize,
    building: usize,
    location: usize,
    campus: usize,
    availability: usize,
    name: Option<usize>,
}

impl TelemetryColumns {
    fn resolve(table: &TelemetryTable) -> Result<Self, AdvisorError> {
        let positions = REQUIRED_COLUMNS.map(|name| table.column(name));
        if let [Some(timestamp), Some(building), Some(location), Some(campus), Some(availability)] =
            positions
        {
            return Ok(Self {
                timestamp,
                building,
                location,
                campus,
                availability,
                name: table.column(NAME_COLUMN),
            });
        }
        let mut missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .zip(positions)
            .filter(|(_, position)| position.is_none())
            .map(|(name, _)| (*name).to_owned())
            .collect();
        missing.sort();
        Err(AdvisorError::Schema { missing })
    }
}

/// Parse every usable row into an [`OccupancyRecord`].
///
/// Rows with an unparsable timestamp, availability, location id or campus
/// flag are dropped silently; a missing required column is a schema error.
pub fn prepare(table: &TelemetryTable) -> Result<Vec<OccupancyRecord>, AdvisorError> {
    let columns = TelemetryColumns::resolve(table)?;
    let mut records = Vec::with_capacity(table.len());
    let mut dropped = 0usize;

    for row in &table.rows {
        match parse_row(row, columns) {
            Some(record) => records.push(record),
            None => dropped += 1,
        }
    }

    debug!(kept = records.len(), dropped, "parsed telemetry rows");
    Ok(records)
}

fn parse_row(row: &StringRecord, columns: TelemetryColumns) -> Option<OccupancyRecord> {
    let cell = |index: usize| row.get(index).unwrap_or("");

    let timestamp = parse_timestamp(cell(columns.timestamp))?;
    let availability = parse_number(cell(columns.availability))?;
    let location_id = parse_integer(cell(columns.location))?;
    let campus = parse_integer(cell(columns.campus)).and_then(Campus::from_flag)?;
    let building_id = parse_integer(cell(columns.building));
    let location_name = columns
        .name
        .map(cell)
        .filter(|name| !name.is_empty())
        .map(str::to_owned);

    Some(OccupancyRecord::new(
        timestamp,
        building_id,
        location_id,
        campus,
        availability,
        location_name,
    ))
}

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a telemetry timestamp as local wall-clock time.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_local());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Constraints applied to the prepared record set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryFilter {
    pub campuses: Option<BTreeSet<Campus>>,
    pub weekday: Option<Weekday>,
    pub time_of_day: Option<TimeOfDay>,
    pub exam_period: bool,
    pub require_accessible: bool,
}

impl Default for TelemetryFilter {
    fn default() -> Self {
        Self {
            campuses: None,
            weekday: None,
            time_of_day: None,
            exam_period: true,
            require_accessible: false,
        }
    }
}

impl TelemetryFilter {
    /// Narrow `records` in order: campus, weekday, time of day, exam period,
    /// then accessibility.
    pub fn apply(
        &self,
        records: Vec<OccupancyRecord>,
        accessibility: Option<&AccessibilityIndex>,
    ) -> Result<Vec<OccupancyRecord>, AdvisorError> {
        let mut current = records;

        if let Some(campuses) = &self.campuses {
            current = narrow(current, |record| campuses.contains(&record.campus));
            debug!(rows = current.len(), "after campus filter");
        }
        if let Some(weekday) = self.weekday {
            current = narrow(current, |record| record.weekday == weekday);
            debug!(rows = current.len(), "after weekday filter");
        }
        if let Some(time_of_day) = self.time_of_day {
            current = narrow(current, |record| record.time_of_day == time_of_day);
            debug!(rows = current.len(), "after time of day filter");
        }

        current = filter_exam_period(current, self.exam_period);
        debug!(
            rows = current.len(),
            exam_period = self.exam_period,
            "after exam period filter"
        );

        if self.require_accessible {
            let index = accessibility.ok_or_else(|| {
                AdvisorError::configuration(
                    "accessible locations were requested but no accessibility data was loaded",
                )
            })?;
            current = narrow(current, |record| index.is_accessible(record.location_id));
            debug!(rows = current.len(), "after accessibility filter");
        }

        Ok(current)
    }
}

/// Keep exam-week rows when `exam_period` is set, otherwise the rest.
pub fn filter_exam_period(records: Vec<OccupancyRecord>, exam_period: bool) -> Vec<OccupancyRecord> {
    narrow(records, |record| is_exam_week(record.iso_week) == exam_period)
}

fn narrow<F>(records: Vec<OccupancyRecord>, keep: F) -> Vec<OccupancyRecord>
where
    F: Fn(&OccupancyRecord) -> bool,
{
    records.into_iter().filter(keep).collect()
}
