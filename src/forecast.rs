use crate::error::ForecastError;
use crate::features::build_features;
use crate::models::{FeatureVector, MovieInfo, PredictionRecord, Provenance, Round};

/// The trained model. Opaque to this crate: it takes one feature vector
/// and returns a revenue estimate. Any error or non-finite value becomes
/// a [`ForecastError::Scoring`].
pub trait Scorer {
    fn score(&self, features: &FeatureVector) -> anyhow::Result<f64>;
}

/// Derives audience and screen counts from a predicted revenue figure.
/// These are policy ratios, not model output, so they are injectable
/// rather than baked into the forecaster.
pub trait DerivationPolicy {
    fn audience(&self, predicted_boxoffice: f64) -> u64;
    fn screens(&self, previous_screens: f64) -> u32;
}

/// Default derivation ratios: a flat average ticket price, and screens
/// shrinking 10% per week down to a floor.
#[derive(Debug, Clone, Copy)]
pub struct FixedRatioPolicy {
    pub avg_ticket_price: f64,
    pub screens_decay: f64,
    pub min_screens: u32,
}

impl Default for FixedRatioPolicy {
    fn default() -> Self {
        Self {
            avg_ticket_price: 300.0,
            screens_decay: 0.9,
            min_screens: 20,
        }
    }
}

impl DerivationPolicy for FixedRatioPolicy {
    fn audience(&self, predicted_boxoffice: f64) -> u64 {
        (predicted_boxoffice / self.avg_ticket_price).max(0.0) as u64
    }

    fn screens(&self, previous_screens: f64) -> u32 {
        let shrunk = (previous_screens * self.screens_decay).floor() as u32;
        shrunk.max(self.min_screens)
    }
}

/// Stand-in scoring function for when no trained model is wired in:
/// next week keeps a fixed share of the previous week's revenue.
#[derive(Debug, Clone, Copy)]
pub struct BaselineScorer {
    pub weekly_retention: f64,
}

impl Default for BaselineScorer {
    fn default() -> Self {
        Self {
            weekly_retention: 0.7,
        }
    }
}

impl Scorer for BaselineScorer {
    fn score(&self, features: &FeatureVector) -> anyhow::Result<f64> {
        Ok(features.boxoffice_week_1 * self.weekly_retention)
    }
}

/// Provenance state of the step about to run. The machine starts on real
/// lag inputs and moves to `Predicted` permanently after the first emitted
/// step, because from then on lag-1 is always a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ForecastState {
    Real,
    Predicted,
}

impl ForecastState {
    fn provenance(self) -> Provenance {
        match self {
            ForecastState::Real => Provenance::Real,
            ForecastState::Predicted => Provenance::Predicted,
        }
    }

    fn advance(self) -> Self {
        ForecastState::Predicted
    }
}

/// Predicts `horizon` weeks past the round's last known active week,
/// feeding each step's output back in as pseudo-history for the next.
///
/// Validation failures abort with no partial results. A scoring failure
/// aborts the remaining steps but hands the already-finished records back
/// inside [`ForecastError::Scoring`].
pub fn forecast<S, D>(
    round: &Round,
    info: &MovieInfo,
    horizon: u32,
    scorer: &S,
    policy: &D,
) -> Result<Vec<PredictionRecord>, ForecastError>
where
    S: Scorer + ?Sized,
    D: DerivationPolicy + ?Sized,
{
    let available = round.active_len();
    let last_known = round.last_active_index();
    if available < 2 {
        return Err(ForecastError::InsufficientHistory {
            target_week: last_known + 1,
            available,
        });
    }

    let mut state = ForecastState::Real;
    let mut completed: Vec<PredictionRecord> = Vec::with_capacity(horizon as usize);

    for step in 0..horizon {
        let target_week = last_known + step + 1;
        let features = build_features(round, info, target_week, &completed)?;

        let raw_score = match scorer.score(&features) {
            Ok(value) if value.is_finite() => value,
            Ok(value) => {
                return Err(ForecastError::Scoring {
                    step: step as usize,
                    reason: format!("model returned non-finite value: {value}"),
                    completed,
                })
            }
            Err(err) => {
                return Err(ForecastError::Scoring {
                    step: step as usize,
                    reason: err.to_string(),
                    completed,
                })
            }
        };

        let predicted_boxoffice = raw_score.max(0.0);
        let lag_1_boxoffice = features.boxoffice_week_1;
        let decline_rate = if lag_1_boxoffice == 0.0 {
            0.0
        } else {
            (predicted_boxoffice - lag_1_boxoffice) / lag_1_boxoffice
        };

        completed.push(PredictionRecord {
            target_week,
            predicted_boxoffice,
            predicted_audience: policy.audience(predicted_boxoffice),
            predicted_screens: policy.screens(features.screens_week_1),
            decline_rate,
            provenance: state.provenance(),
        });
        state = state.advance();
    }

    Ok(completed)
}
