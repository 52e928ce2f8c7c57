//! The scoring entry point used by presentation layers.

use std::collections::BTreeSet;
use std::sync::atomic::AtomicBool;

use chrono::Weekday;
use tracing::info;

use crate::error::AdvisorError;
use crate::models::{Campus, OccupancyRecord, RecommendationRow, TimeOfDay};
use crate::priors::{AccessibilityIndex, RatingProfiles};
use crate::scorer::{
    self, ScoreOptions, DEFAULT_AVAILABILITY_THRESHOLD, DEFAULT_MIN_OBSERVATIONS,
};
use crate::telemetry::{self, TelemetryFilter, TelemetryTable};
use crate::weights::WeightVector;

/// Everything a user can ask of one recommendation run.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvisorQuery {
    pub campuses: Option<BTreeSet<Campus>>,
    pub weekday: Option<Weekday>,
    pub time_of_day: Option<TimeOfDay>,
    pub exam_period: bool,
    pub availability_threshold: f64,
    pub home_campus: Option<Campus>,
    pub require_accessible: bool,
    pub top_n: Option<usize>,
    pub min_observations: usize,
    /// Raw reach, air, light and outlet sliders; normalised per call.
    pub prior_weights: [f64; 4],
}

impl Default for AdvisorQuery {
    fn default() -> Self {
        Self {
            campuses: None,
            weekday: None,
            time_of_day: None,
            exam_period: true,
            availability_threshold: DEFAULT_AVAILABILITY_THRESHOLD,
            home_campus: None,
            require_accessible: false,
            top_n: None,
            min_observations: DEFAULT_MIN_OBSERVATIONS,
            prior_weights: [0.25; 4],
        }
    }
}

impl AdvisorQuery {
    pub fn weights(&self) -> WeightVector {
        let [reach, air, light, outlet] = self.prior_weights;
        WeightVector::normalize(reach, air, light, outlet)
    }

    pub fn filter(&self) -> TelemetryFilter {
        TelemetryFilter {
            campuses: self.campuses.clone(),
            weekday: self.weekday,
            time_of_day: self.time_of_day,
            exam_period: self.exam_period,
            require_accessible: self.require_accessible,
        }
    }

    pub fn score_options(&self) -> ScoreOptions {
        ScoreOptions {
            min_observations: self.min_observations,
            availability_threshold: self.availability_threshold,
            home_campus: self.home_campus,
            weights: self.weights(),
            top_n: self.top_n,
        }
    }
}

/// Rank study locations in `table` for `query`.
///
/// Returns an empty collection when nothing qualifies. Fails only on a
/// telemetry schema error or when accessibility is required without an
/// accessibility index.
pub fn recommend(
    table: &TelemetryTable,
    query: &AdvisorQuery,
    profiles: Option<&RatingProfiles>,
    accessibility: Option<&AccessibilityIndex>,
) -> Result<Vec<RecommendationRow>, AdvisorError> {
    let records = narrow(table, query, accessibility)?;
    let rows = scorer::score_locations(&records, &query.score_options(), profiles);
    info!(
        observations = records.len(),
        locations = rows.len(),
        "ranked study locations"
    );
    Ok(rows)
}

/// [`recommend`] with a caller-held flag that abandons the scoring pass.
pub fn recommend_cancellable(
    table: &TelemetryTable,
    query: &AdvisorQuery,
    profiles: Option<&RatingProfiles>,
    accessibility: Option<&AccessibilityIndex>,
    cancel: &AtomicBool,
) -> Result<Vec<RecommendationRow>, AdvisorError> {
    let records = narrow(table, query, accessibility)?;
    scorer::score_locations_cancellable(&records, &query.score_options(), profiles, cancel)
}

fn narrow(
    table: &TelemetryTable,
    query: &AdvisorQuery,
    accessibility: Option<&AccessibilityIndex>,
) -> Result<Vec<OccupancyRecord>, AdvisorError> {
    let records = telemetry::prepare(table)?;
    query.filter().apply(records, accessibility)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&str]) -> TelemetryTable {
        let csv = format!(
            "t10,building_id,location_id,is_hill,relative_availability\n{}\n",
            rows.join("\n")
        );
        TelemetryTable::from_reader(csv.as_bytes()).expect("csv table")
    }

    #[test]
    fn query_defaults_match_the_scorer() {
        let query = AdvisorQuery::default();
        assert_eq!(query.score_options(), ScoreOptions::default());
        assert!(query.filter().exam_period);
    }

    #[test]
    fn weights_are_normalised_from_raw_sliders() {
        let query = AdvisorQuery {
            prior_weights: [2.0, 0.0, 0.0, 0.0],
            ..AdvisorQuery::default()
        };
        assert_eq!(query.weights().reach(), 1.0);
    }

    #[test]
    fn schema_errors_surface_before_scoring() {
        let table = TelemetryTable::from_reader("t10,location_id\n".as_bytes()).expect("table");
        let err = recommend(&table, &AdvisorQuery::default(), None, None).expect_err("schema");
        assert!(matches!(err, AdvisorError::Schema { .. }));
    }

    #[test]
    fn narrows_then_scores() {
        // Week 3 (exam) versus week 10 (regular term).
        let table = table(&[
            "2024-01-17 10:00:00,1,1,0,0.9",
            "2024-01-17 11:00:00,1,1,0,0.7",
            "2024-03-06 10:00:00,2,2,1,0.9",
        ]);
        let query = AdvisorQuery {
            min_observations: 1,
            ..AdvisorQuery::default()
        };
        let rows = recommend(&table, &query, None, None).expect("recommend");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].location_id, 1);
        assert_eq!(rows[0].building_name, "Ammerbau");
        assert_eq!(rows[0].observation_count, 2);

        let off_term = AdvisorQuery {
            exam_period: false,
            ..query
        };
        let rows = recommend(&table, &off_term, None, None).expect("recommend");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].location_id, 2);
    }
}
