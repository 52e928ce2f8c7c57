//! Loader for the static location attributes table (`priors.csv`).
//!
//! Column headers vary between exports, so every logical field is resolved
//! once against an ordered list of accepted names before any row is read.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, info};

use crate::error::AdvisorError;
use crate::models::PriorRatings;
use crate::parse::{parse_integer, parse_number};

const ID_COLUMNS: &[&str] = &["location_id", "loc_id", "id", "location"];
const ACCESSIBLE_COLUMNS: &[&str] = &[
    "acc",
    "accessible",
    "is_accessible",
    "wheelchair",
    "barrierfree",
];
const REACH_COLUMNS: &[&str] = &["reach", "reachability", "bus", "accessibility_score"];
const AIR_COLUMNS: &[&str] = &["air", "airquality", "air_quality"];
const LIGHT_COLUMNS: &[&str] = &["light", "lighting"];
const OUTLET_COLUMNS: &[&str] = &["outlet", "outlets", "power", "sockets", "socket"];

/// Rating profiles keyed by location id.
///
/// A location whose row had any unparsable rating is stored as `None` and
/// scores with the neutral prior.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingProfiles {
    profiles: BTreeMap<i64, Option<PriorRatings>>,
}

impl RatingProfiles {
    /// Complete ratings for a location, if it has any.
    pub fn get(&self, location_id: i64) -> Option<&PriorRatings> {
        self.profiles.get(&location_id).and_then(Option::as_ref)
    }

    pub fn contains(&self, location_id: i64) -> bool {
        self.profiles.contains_key(&location_id)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl FromIterator<(i64, Option<PriorRatings>)> for RatingProfiles {
    fn from_iter<I: IntoIterator<Item = (i64, Option<PriorRatings>)>>(iter: I) -> Self {
        Self {
            profiles: iter.into_iter().collect(),
        }
    }
}

/// Wheelchair accessibility per location; unknown locations are inaccessible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessibilityIndex {
    flags: BTreeMap<i64, bool>,
}

impl AccessibilityIndex {
    pub fn is_accessible(&self, location_id: i64) -> bool {
        self.flags.get(&location_id).copied().unwrap_or(false)
    }
}

impl FromIterator<(i64, bool)> for AccessibilityIndex {
    fn from_iter<I: IntoIterator<Item = (i64, bool)>>(iter: I) -> Self {
        Self {
            flags: iter.into_iter().collect(),
        }
    }
}

/// Both lookups produced from one priors table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriorTables {
    pub profiles: RatingProfiles,
    pub accessibility: AccessibilityIndex,
}

/// Column positions of the six logical fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnMap {
    id: usize,
    accessible: usize,
    reach: usize,
    air: usize,
    light: usize,
    outlet: usize,
}

impl ColumnMap {
    fn resolve(headers: &StringRecord) -> Result<Self, AdvisorError> {
        let names: Vec<String> = headers
            .iter()
            .map(|header| header.trim().to_ascii_lowercase())
            .collect();
        let pick = |candidates: &[&str]| {
            candidates
                .iter()
                .find_map(|candidate| names.iter().position(|name| name == candidate))
        };

        let id = pick(ID_COLUMNS).ok_or_else(|| {
            AdvisorError::configuration(
                "priors table has no location id column (e.g. location_id / id)",
            )
        })?;
        let accessible = pick(ACCESSIBLE_COLUMNS).ok_or_else(|| {
            AdvisorError::configuration("priors table has no accessibility column (e.g. acc)")
        })?;
        match (
            pick(REACH_COLUMNS),
            pick(AIR_COLUMNS),
            pick(LIGHT_COLUMNS),
            pick(OUTLET_COLUMNS),
        ) {
            (Some(reach), Some(air), Some(light), Some(outlet)) => Ok(Self {
                id,
                accessible,
                reach,
                air,
                light,
                outlet,
            }),
            _ => Err(AdvisorError::configuration(
                "priors table needs columns for reach/air/light/outlet (names can vary)",
            )),
        }
    }
}

/// Load `priors.csv` from disk.
pub fn load_priors(path: &Path) -> Result<PriorTables, AdvisorError> {
    let file = File::open(path).map_err(|source| AdvisorError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let tables = read_priors(file)?;
    info!(
        path = %path.display(),
        locations = tables.profiles.len(),
        "loaded location priors"
    );
    Ok(tables)
}

/// Parse a priors table from any CSV source.
pub fn read_priors<R: Read>(source: R) -> Result<PriorTables, AdvisorError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);
    let columns = ColumnMap::resolve(reader.headers()?)?;

    let mut profiles = BTreeMap::new();
    let mut accessibility = BTreeMap::new();
    let mut dropped = 0usize;

    for result in reader.records() {
        let row = result?;
        let cell = |index: usize| row.get(index).unwrap_or("");

        let Some(location_id) = parse_integer(cell(columns.id)) else {
            dropped += 1;
            continue;
        };

        let profile = match (
            normalize_rating(cell(columns.reach)),
            normalize_rating(cell(columns.air)),
            normalize_rating(cell(columns.light)),
            normalize_rating(cell(columns.outlet)),
        ) {
            (Some(reach), Some(air), Some(light), Some(outlet)) => Some(PriorRatings {
                reach,
                air,
                light,
                outlet,
            }),
            _ => None,
        };
        profiles.insert(location_id, profile);
        accessibility.insert(location_id, is_accessible_flag(cell(columns.accessible)));
    }

    if dropped > 0 {
        debug!(dropped, "skipped priors rows without an integer location id");
    }

    Ok(PriorTables {
        profiles: RatingProfiles { profiles },
        accessibility: AccessibilityIndex {
            flags: accessibility,
        },
    })
}

/// Map a 1–10 rating onto `[0.1, 1.0]`.
fn normalize_rating(raw: &str) -> Option<f64> {
    parse_number(raw).map(|rating| rating.clamp(1.0, 10.0) / 10.0)
}

fn is_accessible_flag(raw: &str) -> bool {
    parse_number(raw) == Some(1.0)
}
