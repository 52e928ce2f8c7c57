//! Ranks study locations by how likely a seat is free and how pleasant the
//! place is.
//!
//! Historical occupancy telemetry is filtered to the user's constraints
//! (campus, weekday, time of day, exam period, accessibility) and aggregated
//! per location into a seat availability score. That score is blended with a
//! static prior built from reach, air, light and power-outlet ratings.
//!
//! ```no_run
//! use std::path::Path;
//! use seat_advisor::{recommend, load_priors, AdvisorQuery, TelemetryTable};
//!
//! let table = TelemetryTable::load(Path::new("input/final_data.csv.gz"))?;
//! let priors = load_priors(Path::new("input/priors.csv"))?;
//! let query = AdvisorQuery { top_n: Some(5), ..AdvisorQuery::default() };
//! let rows = recommend(&table, &query, Some(&priors.profiles), Some(&priors.accessibility))?;
//! # Ok::<(), seat_advisor::AdvisorError>(())
//! ```

pub mod advisor;
mod error;
pub mod models;
mod parse;
pub mod priors;
pub mod report;
pub mod scorer;
pub mod telemetry;
pub mod weights;

pub use advisor::{recommend, recommend_cancellable, AdvisorQuery};
pub use error::AdvisorError;
pub use models::{Campus, OccupancyRecord, PriorRatings, RecommendationRow, TimeOfDay};
pub use priors::{load_priors, read_priors, AccessibilityIndex, PriorTables, RatingProfiles};
pub use scorer::{score_locations, ScoreOptions, SAS_WEIGHTS};
pub use telemetry::{TelemetryFilter, TelemetryTable};
pub use weights::WeightVector;
