//! Errors raised while loading inputs or scoring study locations.

use std::path::PathBuf;

use thiserror::Error;

/// Structural failures surfaced to the caller.
///
/// Malformed individual values never end up here: they are dropped or
/// substituted so a bulk run is not aborted by one bad record.
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// A required priors column is missing, or accessibility filtering was
    /// requested without an accessibility lookup.
    #[error("configuration error: {reason}")]
    Configuration {
        /// Human readable explanation.
        reason: String,
    },
    /// The telemetry table lacks one or more required columns.
    #[error("missing required columns: {}", missing.join(", "))]
    Schema {
        /// Sorted names of the absent columns.
        missing: Vec<String>,
    },
    /// An input file could not be opened.
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The CSV payload itself is malformed.
    #[error("failed to parse CSV input")]
    Csv(#[from] csv::Error),
    /// The caller abandoned the scoring pass.
    #[error("scoring was cancelled")]
    Cancelled,
}

impl AdvisorError {
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}
