use thiserror::Error;

use crate::models::PredictionRecord;

/// Failures raised by the feature builder and the recursive forecaster.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("insufficient history: need at least 2 active weeks before week {target_week}, got {available}")]
    InsufficientHistory { target_week: u32, available: usize },

    #[error("invalid input: {field} {reason}")]
    InvalidInput {
        field: &'static str,
        reason: String,
    },

    /// The external model failed mid-forecast. Steps finished before the
    /// failure are preserved so the caller can still show them.
    #[error("scoring failed at step {step}: {reason}")]
    Scoring {
        step: usize,
        reason: String,
        completed: Vec<PredictionRecord>,
    },
}

/// Failures raised while (re)building the tier statistics table.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("historical corpus is empty, cannot compute tier boundaries")]
    EmptyCorpus,

    #[error("corpus record has non-finite opening_strength: {0}")]
    NonFiniteStrength(f64),

    #[error("malformed tier table document: {0}")]
    MalformedDocument(String),
}
