use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::error::AdvisorError;
use crate::models::{Campus, OccupancyRecord, RecommendationRow};
use crate::priors::RatingProfiles;
use crate::weights::WeightVector;

/// Fixed weights of the seat availability score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SasWeights {
    pub stress: f64,
    pub mean: f64,
    pub variability: f64,
    pub distance: f64,
}

pub const SAS_WEIGHTS: SasWeights = SasWeights {
    stress: 0.40,
    mean: 0.30,
    variability: 0.20,
    distance: 0.10,
};

/// Share of the final score taken by the static prior.
pub const PRIOR_BLEND: f64 = 0.25;
/// Prior used when a location has no complete rating profile.
pub const NEUTRAL_PRIOR: f64 = 0.5;

pub const DEFAULT_MIN_OBSERVATIONS: usize = 200;
pub const DEFAULT_AVAILABILITY_THRESHOLD: f64 = 0.15;

impl SasWeights {
    /// Each weight must lie in `[0, 1]` and together they must sum to one.
    pub const fn is_valid(&self) -> bool {
        let in_range = is_unit(self.stress)
            && is_unit(self.mean)
            && is_unit(self.variability)
            && is_unit(self.distance);
        let drift = self.stress + self.mean + self.variability + self.distance - 1.0;
        in_range && drift < 1e-9 && drift > -1e-9
    }
}

const fn is_unit(weight: f64) -> bool {
    weight >= 0.0 && weight <= 1.0
}

const _: () = assert!(
    SAS_WEIGHTS.is_valid(),
    "seat availability weights must lie in [0, 1] and sum to 1"
);

/// Parameters of one scoring pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreOptions {
    pub min_observations: usize,
    pub availability_threshold: f64,
    pub home_campus: Option<Campus>,
    pub weights: WeightVector,
    pub top_n: Option<usize>,
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self {
            min_observations: DEFAULT_MIN_OBSERVATIONS,
            availability_threshold: DEFAULT_AVAILABILITY_THRESHOLD,
            home_campus: None,
            weights: WeightVector::default(),
            top_n: None,
        }
    }
}

/// Score every location with enough observations and rank them.
pub fn score_locations(
    records: &[OccupancyRecord],
    options: &ScoreOptions,
    profiles: Option<&RatingProfiles>,
) -> Vec<RecommendationRow> {
    let never = AtomicBool::new(false);
    // Only a raised flag can fail the pass.
    score_locations_cancellable(records, options, profiles, &never).unwrap_or_default()
}

/// Like [`score_locations`], but gives up between location groups once
/// `cancel` is raised.
pub fn score_locations_cancellable(
    records: &[OccupancyRecord],
    options: &ScoreOptions,
    profiles: Option<&RatingProfiles>,
    cancel: &AtomicBool,
) -> Result<Vec<RecommendationRow>, AdvisorError> {
    let groups = group_by_location(records);
    let mut rows = Vec::new();
    for (location_id, group) in &groups {
        if cancel.load(Ordering::Relaxed) {
            debug!(location_id, "scoring cancelled");
            return Err(AdvisorError::Cancelled);
        }
        rows.extend(score_group(*location_id, group, options, profiles));
    }
    rank(&mut rows, options.top_n);
    Ok(rows)
}

/// Groups iterate in ascending location id.
fn group_by_location(records: &[OccupancyRecord]) -> BTreeMap<i64, Vec<&OccupancyRecord>> {
    let mut groups: BTreeMap<i64, Vec<&OccupancyRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.location_id).or_default().push(record);
    }
    groups
}

fn score_group(
    location_id: i64,
    group: &[&OccupancyRecord],
    options: &ScoreOptions,
    profiles: Option<&RatingProfiles>,
) -> Option<RecommendationRow> {
    let first = group.first()?;
    if group.len() < options.min_observations {
        debug!(
            location_id,
            observations = group.len(),
            "skipping location below observation minimum"
        );
        return None;
    }

    let availability: Vec<f64> = group.iter().map(|r| r.relative_availability).collect();
    let crowding_risk = crowding_risk(&availability, options.availability_threshold);
    let mean_availability = mean(&availability);
    let variability_sigma = sample_std_dev(&availability)
        .map(|std| (2.0 * std).min(1.0))
        .unwrap_or(0.0);
    let distance_penalty = match options.home_campus {
        Some(home) if first.campus != home => 1.0,
        _ => 0.0,
    };

    let sas_score = SAS_WEIGHTS.stress * (1.0 - crowding_risk)
        + SAS_WEIGHTS.mean * mean_availability
        - SAS_WEIGHTS.variability * variability_sigma
        - SAS_WEIGHTS.distance * distance_penalty;
    let prior_score = profiles
        .and_then(|profiles| profiles.get(location_id))
        .map(|ratings| {
            let w = options.weights;
            w.reach() * ratings.reach
                + w.air() * ratings.air
                + w.light() * ratings.light
                + w.outlet() * ratings.outlet
        })
        .unwrap_or(NEUTRAL_PRIOR);
    let final_score = (1.0 - PRIOR_BLEND) * sas_score + PRIOR_BLEND * prior_score;

    let location_name = first
        .location_name
        .clone()
        .unwrap_or_else(|| format!("Location {location_id}"));

    Some(RecommendationRow {
        location_id,
        location_name,
        building_name: building_name(first.building_id),
        final_score,
        sas_score,
        prior_score,
        crowding_risk,
        mean_availability,
        variability_sigma,
        distance_penalty,
        observation_count: group.len(),
    })
}

/// Stable descending sort, so equal scores keep their grouping order.
fn rank(rows: &mut Vec<RecommendationRow>, top_n: Option<usize>) {
    rows.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
    if let Some(limit) = top_n {
        rows.truncate(limit);
    }
}

/// Fraction of observations at or below `threshold`; 0 for an empty slice.
pub fn crowding_risk(availability: &[f64], threshold: f64) -> f64 {
    if availability.is_empty() {
        return 0.0;
    }
    let crowded = availability.iter().filter(|&&a| a <= threshold).count();
    crowded as f64 / availability.len() as f64
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mu = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - mu).powi(2)).sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

pub fn building_name(building_id: Option<i64>) -> String {
    let Some(id) = building_id else {
        return "Unknown".to_string();
    };
    let known = match id {
        1 => "Ammerbau",
        2 => "Waschhalle",
        3 => "PCB",
        4 => "Bonatzbau",
        5 => "Bereichsbibliothek",
        6 => "Lernzentrum Tal",
        7 => "Lernzentrum Morgenstelle",
        _ => return format!("Building {id}"),
    };
    known.to_string()
}
